use std::path::Path;

use effpp_worker::{build_factory, AnnotatorConfig, Stage};

fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    dotenvy::dotenv().ok();
    let config = AnnotatorConfig::from_env()?;

    println!(
        "effpp-selfcheck: starting with data_root={}",
        config.data_root.display()
    );

    if config.runs(Stage::Align) {
        ensure_file(&config.split_metadata)?;
        ensure_dir(&config.frame_counts_dir)?;
    }
    if config.runs(Stage::Manifest) || config.runs(Stage::Annotate) {
        ensure_dir(&config.frames_dir)?;
    }
    if let Some(path) = &config.tag_table {
        ensure_file(path)?;
    }
    if let Some(path) = &config.technique_summaries {
        ensure_file(path)?;
    }
    if config.runs(Stage::Annotate) {
        let factory = build_factory(&config)?;
        println!(
            "effpp-selfcheck: describer {} (parallel: {})",
            factory.kind(),
            factory.supports_parallel()
        );
    }
    ensure_writable(&config.annotations_dir)?;

    println!("effpp-selfcheck: ok");
    Ok(())
}

fn ensure_file(path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        return Err(anyhow::anyhow!("missing input file {}", path.display()));
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.is_dir() {
        return Err(anyhow::anyhow!("missing input directory {}", path.display()));
    }
    Ok(())
}

fn ensure_writable(path: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|e| anyhow::anyhow!("cannot create {}: {}", path.display(), e))?;
    Ok(())
}
