//! services/api/src/adapters/summarizer_llm.rs
//!
//! This module contains the adapter for the summarizing LLM.
//! It implements the `SummaryService` port from the `core` crate by calling an
//! Anthropic model hosted on AWS Bedrock through its `invoke` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;
use web_summarizer_core::ports::{SummarizationError, SummaryService};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_TOKENS: u32 = 2000;

/// Builds the single-turn prompt sent to the model.
pub fn summary_prompt(text: &str) -> String {
    format!(
        "Please provide a concise summary of the following text. Focus on the main points and key information. Structure the summary with bullet points for key takeaways and a brief paragraph for overall context:\n\n{}",
        text
    )
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct InvokeRequest<'a> {
    anthropic_version: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Pulls the summary out of a Messages API response body.
pub fn parse_summary(body: &str) -> Result<String, SummarizationError> {
    let response: InvokeResponse = serde_json::from_str(body)
        .map_err(|e| SummarizationError::MalformedResponse(e.to_string()))?;

    let text = response
        .content
        .into_iter()
        .next()
        .ok_or_else(|| SummarizationError::MalformedResponse("response has no content blocks".to_string()))?
        .text
        .ok_or_else(|| SummarizationError::MalformedResponse("first content block has no text".to_string()))?;

    let summary = text.trim();
    if summary.is_empty() {
        return Err(SummarizationError::Empty);
    }
    Ok(summary.to_string())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummaryService` against a Bedrock `invoke` URL.
#[derive(Clone)]
pub struct BedrockSummaryAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl BedrockSummaryAdapter {
    /// Creates a new `BedrockSummaryAdapter`.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> SummarizationError {
        if e.is_timeout() {
            SummarizationError::Timeout(self.timeout)
        } else {
            SummarizationError::Transport(e.to_string())
        }
    }
}

//=========================================================================================
// `SummaryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummaryService for BedrockSummaryAdapter {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationError> {
        let request = InvokeRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: summary_prompt(text),
            }],
            temperature: 0.5,
            top_k: 250,
            top_p: 1.0,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            error!("Summarizer endpoint returned {}: {}", status, body);
            return Err(SummarizationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_summary(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_the_first_content_block_trimmed() {
        let body = r#"{"id":"msg_1","content":[{"type":"text","text":"\n- Point one\n- Point two  "},{"type":"text","text":"ignored"}]}"#;
        assert_eq!(parse_summary(body).unwrap(), "- Point one\n- Point two");
    }

    #[test]
    fn blank_text_is_empty() {
        let body = r#"{"content":[{"type":"text","text":"   \n"}]}"#;
        assert!(matches!(parse_summary(body), Err(SummarizationError::Empty)));
    }

    #[test]
    fn missing_fields_are_malformed() {
        for body in [r#"{"content":[]}"#, r#"{"content":[{"type":"image"}]}"#, r#"{}"#, "not json"] {
            assert!(
                matches!(parse_summary(body), Err(SummarizationError::MalformedResponse(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn prompt_embeds_the_text_after_the_instructions() {
        let prompt = summary_prompt("Hello World");
        assert!(prompt.starts_with("Please provide a concise summary"));
        assert!(prompt.ends_with("context:\n\nHello World"));
    }

    #[test]
    fn request_body_uses_messages_format() {
        let request = InvokeRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: "hi".to_string(),
            }],
            temperature: 0.5,
            top_k: 250,
            top_p: 1.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["top_k"], 250);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let adapter = BedrockSummaryAdapter::new("http://127.0.0.1:1/invoke", None, Duration::from_secs(5)).unwrap();
        let err = adapter.summarize("text").await.unwrap_err();
        assert!(matches!(err, SummarizationError::Transport(_)), "{err:?}");
    }
}
