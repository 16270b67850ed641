//! EFF++ alignment and annotation binary.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use effpp_worker::{run_pipeline, AnnotatorConfig};

fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("effpp=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    info!("Starting effpp-worker");

    let config = AnnotatorConfig::from_env()?;
    info!("Annotator config: {:?}", config);

    let outcome = match run_pipeline(&config) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(e.into());
        }
    };

    if let Some(report) = &outcome.annotation {
        info!(
            annotated = report.annotated,
            failed = report.failed(),
            skipped = report.skipped,
            "Annotation summary"
        );
    }

    let metrics_path = config.metrics_path();
    if let Some(parent) = metrics_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&metrics_path, metrics.render())
        .with_context(|| format!("writing {}", metrics_path.display()))?;

    info!("Worker shutdown complete");
    Ok(())
}
