//! OpenRouter chat-completions client used as the vision oracle.

use async_trait::async_trait;
use base64::Engine;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use super::VisionOracle;
use crate::config::OracleConfig;
use crate::error::OracleError;

const PROVIDER: &str = "openrouter";

/// Vision oracle backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenRouterOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

impl OpenRouterOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::RequestFailed {
                provider: PROVIDER.into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl VisionOracle for OpenRouterOracle {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn read_image(&self, png: &[u8], instruction: &str) -> Result<String, OracleError> {
        let payload = build_payload(&self.config, png, instruction);

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.config.timeout)
                } else {
                    OracleError::RequestFailed {
                        provider: PROVIDER.into(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| OracleError::RequestFailed {
            provider: PROVIDER.into(),
            reason: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(OracleError::Http {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                body,
            });
        }

        let text = parse_response(&body)?;
        debug!(model = %self.config.model, chars = text.chars().count(), "Oracle reply received");
        Ok(text)
    }
}

/// Chat request with the instruction and the image as a base64 data URL.
fn build_payload(config: &OracleConfig, png: &[u8], instruction: &str) -> serde_json::Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    serde_json::json!({
        "model": config.model,
        "messages": [
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": instruction },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{encoded}") }
                    }
                ]
            }
        ],
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    })
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

/// Pull `choices[0].message.content` out of a chat response.
fn parse_response(body: &str) -> Result<String, OracleError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| OracleError::InvalidResponse {
            provider: PROVIDER.into(),
            reason: format!("JSON parse error: {e}"),
        })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::InvalidResponse {
            provider: PROVIDER.into(),
            reason: "response has no choices".into(),
        })?;

    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}
