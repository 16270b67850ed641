//! Request and response bodies of the two endpoint shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ApiFlavor, GenerationParams};
use crate::error::{LlmError, LlmResult};
use crate::prompt::Prompt;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// JSON body for `flavor`.
pub fn request_body(
    flavor: ApiFlavor,
    model: &str,
    prompt: &Prompt,
    params: &GenerationParams,
) -> LlmResult<Value> {
    let body = match flavor {
        ApiFlavor::ChatCompletions => serde_json::to_value(ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        })?,
        // Single user turn: system guidance first, then the frame details.
        ApiFlavor::GenerateContent => serde_json::to_value(GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part {
                        text: prompt.system.clone(),
                    },
                    Part {
                        text: prompt.user.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_tokens,
                temperature: params.temperature,
            },
        })?,
    };
    Ok(body)
}

/// Text of the first choice or candidate of a 200 body.
///
/// A body without any choice/candidate is an invalid response.
pub fn extract_text(flavor: ApiFlavor, body: &str) -> LlmResult<String> {
    match flavor {
        ApiFlavor::ChatCompletions => {
            let response: ChatResponse = serde_json::from_str(body)
                .map_err(|e| LlmError::invalid_response(format!("chat body: {}", e)))?;
            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::invalid_response("response returned no choices"))?;
            Ok(choice.message.content.unwrap_or_default().trim().to_string())
        }
        ApiFlavor::GenerateContent => {
            let response: GenerateContentResponse = serde_json::from_str(body)
                .map_err(|e| LlmError::invalid_response(format!("generateContent body: {}", e)))?;
            let candidate = response
                .candidates
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::invalid_response("response returned no candidates"))?;
            let text: String = candidate
                .content
                .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
                .unwrap_or_default();
            Ok(text.trim().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        }
    }

    #[test]
    fn test_chat_body_shape() {
        let body = request_body(
            ApiFlavor::ChatCompletions,
            "gpt-4.1-mini",
            &prompt(),
            &GenerationParams::default(),
        )
        .unwrap();
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["max_tokens"], 160);
    }

    #[test]
    fn test_generate_content_body_shape() {
        let body = request_body(
            ApiFlavor::GenerateContent,
            "gemini",
            &prompt(),
            &GenerationParams::default(),
        )
        .unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "usr");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 160);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_extract_chat_text() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Yes, seams. "}}]}"#;
        assert_eq!(extract_text(ApiFlavor::ChatCompletions, body).unwrap(), "Yes, seams.");
    }

    #[test]
    fn test_extract_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Soft "},{"text":"edges."}]}}]}"#;
        assert_eq!(extract_text(ApiFlavor::GenerateContent, body).unwrap(), "Soft edges.");
    }

    #[test]
    fn test_empty_or_malformed_bodies_are_invalid() {
        assert!(matches!(
            extract_text(ApiFlavor::ChatCompletions, r#"{"choices":[]}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_text(ApiFlavor::GenerateContent, r#"{"promptFeedback":{}}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_text(ApiFlavor::ChatCompletions, "<html>"),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
