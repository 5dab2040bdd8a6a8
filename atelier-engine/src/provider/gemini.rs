//! Gemini API client
//!
//! HTTP client for the generateContent and embedContent endpoints.
//! Prompt content is owned by the pipeline stages; this client only
//! moves text and vectors across the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationProvider, ProviderError};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_EMBED_MODEL: &str = "text-embedding-004";
const USER_AGENT: &str = "atelier/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

/// Gemini generation and embedding client
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    embed_model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            GEMINI_BASE_URL, model, method, self.api_key
        )
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint(&self.model, "generateContent"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(text)
    }

    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        if text.is_empty() {
            return Ok(None);
        }

        let request = EmbedRequest {
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .http
            .post(self.endpoint(&self.embed_model, "embedContent"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        match parsed.embedding {
            Some(embedding) if !embedding.values.is_empty() => Ok(Some(embedding.values)),
            _ => Ok(None),
        }
    }
}
