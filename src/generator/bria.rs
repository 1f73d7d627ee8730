//! HTTP client for the hosted text-to-image API.
//!
//! One sheet costs two requests: a synchronous generate call that answers with an image
//! URL, then a download of that URL.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::prompt::{layout_hint, structured_prompt, text_prompt};
use super::{SheetGenerator, SheetRequest};
use crate::config::GeneratorConfig;
use crate::error::{SpriteError, SpriteResult};

const PROVIDER: &str = "bria";

pub struct BriaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    download_timeout: Duration,
    structured: bool,
}

impl BriaClient {
    pub fn new(config: &GeneratorConfig) -> SpriteResult<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            SpriteError::config("generator.api_key", "", "an API key is required")
                .with_recovery_suggestion("Set BRIA_API_KEY or run with --mock")
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SpriteError::external("reqwest", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            structured: config.structured_prompt,
        })
    }

    pub fn generate_url(&self) -> String {
        format!("{}/v2/image/generate", self.base_url)
    }

    /// JSON body of the generate call.
    pub fn payload(&self, request: &SheetRequest) -> Value {
        let hint = layout_hint(request.frame_count);
        let mut body = json!({
            "aspect_ratio": hint.aspect_ratio,
            "sync": true,
            "seed": request.seed,
            "num_results": 1,
        });
        if self.structured {
            body["structured_prompt"] = Value::String(structured_prompt(request).to_string());
        } else {
            body["prompt"] = Value::String(text_prompt(request));
        }
        body
    }

    async fn request_image_url(&self, request: &SheetRequest) -> SpriteResult<String> {
        let response = self
            .http
            .post(self.generate_url())
            .header("api_token", &self.api_key)
            .timeout(self.timeout)
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| {
                SpriteError::generator(PROVIDER, None, format!("generate request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpriteError::generator(PROVIDER, Some(status.as_u16()), body)
                .with_operation("generate"));
        }

        let body: Value = response.json().await.map_err(|e| {
            SpriteError::generator(PROVIDER, Some(status.as_u16()), format!("invalid response: {}", e))
        })?;
        body.pointer("/result/image_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                SpriteError::generator(PROVIDER, Some(status.as_u16()), "response has no result.image_url")
            })
    }

    async fn download(&self, url: &str) -> SpriteResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| SpriteError::generator(PROVIDER, None, format!("download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpriteError::generator(
                PROVIDER,
                Some(status.as_u16()),
                format!("failed to download {}", url),
            )
            .with_operation("download"));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpriteError::generator(PROVIDER, None, format!("download failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SheetGenerator for BriaClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate_sheet(&self, request: &SheetRequest) -> SpriteResult<Vec<u8>> {
        let hint = layout_hint(request.frame_count);
        tracing::info!(
            animation = %request.animation,
            frames = request.frame_count,
            grid = %format!("{}x{}", hint.columns, hint.rows),
            aspect_ratio = hint.aspect_ratio,
            seed = request.seed,
            "requesting sheet"
        );

        let image_url = self
            .request_image_url(request)
            .await
            .map_err(|e| e.with_context(format!("generating {} sheet", request.animation)))?;
        tracing::debug!(url = %image_url, "downloading sheet");
        self.download(&image_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(structured: bool) -> GeneratorConfig {
        GeneratorConfig {
            api_key: Some("token".to_string()),
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            download_timeout_secs: 2,
            structured_prompt: structured,
            ..GeneratorConfig::default()
        }
    }

    fn request() -> SheetRequest {
        SheetRequest {
            prompt: "a fox".to_string(),
            animation: "run".to_string(),
            frame_count: 6,
            style: "cartoon".to_string(),
            canvas: (256, 256),
            seed: 7,
            refinement: None,
        }
    }

    #[test]
    fn test_requires_api_key() {
        let err = BriaClient::new(&GeneratorConfig::default()).err().unwrap();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_text_payload() {
        let client = BriaClient::new(&config(false)).unwrap();
        assert_eq!(client.generate_url(), "http://127.0.0.1:9/v2/image/generate");

        let body = client.payload(&request());
        assert_eq!(body["aspect_ratio"], "3:2");
        assert_eq!(body["sync"], true);
        assert_eq!(body["seed"], 7);
        assert_eq!(body["num_results"], 1);
        assert!(body["prompt"].as_str().unwrap().contains("a fox"));
        assert!(body.get("structured_prompt").is_none());
    }

    #[test]
    fn test_structured_payload_is_a_json_string() {
        let client = BriaClient::new(&config(true)).unwrap();
        let body = client.payload(&request());
        assert!(body.get("prompt").is_none());
        let inner: Value =
            serde_json::from_str(body["structured_prompt"].as_str().unwrap()).unwrap();
        assert_eq!(inner["artistic_style"], "cartoon");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_generator_error() {
        let client = BriaClient::new(&config(false)).unwrap();
        let err = client.generate_sheet(&request()).await.unwrap_err();
        assert_eq!(err.category(), "generator");
    }
}
