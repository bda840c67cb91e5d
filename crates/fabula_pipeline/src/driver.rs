//! OpenAI-compatible HTTP model driver.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use fabula_core::ModelTier;
use fabula_error::{FabulaResult, ProviderError, ProviderErrorKind};
use fabula_interface::{Completion, ModelDriver};
use serde::Deserialize;
use serde_json::json;

/// [`ModelDriver`] speaking the OpenAI-compatible chat and image APIs.
#[derive(Debug, Clone)]
pub struct HttpModelDriver {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    standard_model: String,
    premium_model: String,
    image_model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

impl HttpModelDriver {
    /// Create a driver against an OpenAI-compatible endpoint.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        standard_model: impl Into<String>,
        premium_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            standard_model: standard_model.into(),
            premium_model: premium_model.into(),
            image_model: image_model.into(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> FabulaResult<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Request(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(ProviderErrorKind::Api {
                status: status.as_u16(),
                message,
            })
            .into());
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelDriver for HttpModelDriver {
    #[tracing::instrument(skip(self, prompt), fields(model = self.model_id(tier)))]
    async fn complete(&self, prompt: &str, tier: ModelTier) -> FabulaResult<Completion> {
        let body = json!({
            "model": self.model_id(tier),
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self.post("/chat/completions", body).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Request(e.to_string())))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::EmptyResponse))?;
        Ok(Completion::new(text))
    }

    #[tracing::instrument(skip(self, prompt), fields(model = %self.image_model))]
    async fn generate_image(&self, prompt: &str) -> FabulaResult<Vec<u8>> {
        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "size": "1024x1024",
            "response_format": "b64_json",
        });
        let response = self.post("/images/generations", body).await?;
        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Request(e.to_string())))?;
        let encoded = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::EmptyResponse))?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| ProviderError::new(ProviderErrorKind::ImageDecode(e.to_string())).into())
    }

    fn model_id(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.standard_model,
            ModelTier::Premium => &self.premium_model,
        }
    }

    fn image_model_id(&self) -> &str {
        &self.image_model
    }
}
