//! `generateImage`: synthesize one image and upload it to object storage.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pcommon::{BoxFuture, MessageId};
use pprovider::SecretString;
use ptooling::{
    ParameterSchema, ParameterSpec, Tool, ToolExecutionContext, ToolFuture, ToolKind, ToolOutcome,
    required_string,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{ChatError, ObjectStorage};

pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
pub const IMAGE_FAILURE_MESSAGE: &str = "Failed to generate or upload image.";

pub trait ImageSynthesizer: Send + Sync {
    /// Base64 payload of a single image, or `None` when the service returned
    /// no image data.
    fn synthesize<'a>(&'a self, prompt: &'a str)
    -> BoxFuture<'a, Result<Option<String>, ChatError>>;
}

#[derive(Debug, Clone, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    width: u32,
    height: u32,
    steps: u32,
    n: u32,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

/// Together AI image generation (FLUX.1 schnell).
#[derive(Debug, Clone)]
pub struct TogetherImageSynthesizer {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl TogetherImageSynthesizer {
    pub const MODEL: &'static str = "black-forest-labs/FLUX.1-schnell-Free";

    pub fn new(client: Client, api_key: SecretString) -> Self {
        Self {
            client,
            api_key,
            base_url: TOGETHER_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl ImageSynthesizer for TogetherImageSynthesizer {
    fn synthesize<'a>(
        &'a self,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ChatError>> {
        Box::pin(async move {
            let body = ImageGenerationRequest {
                model: Self::MODEL,
                prompt,
                width: 1440,
                height: 1024,
                steps: 4,
                n: 1,
                response_format: "base64",
            };

            let response = self
                .client
                .post(format!(
                    "{}/images/generations",
                    self.base_url.trim_end_matches('/')
                ))
                .bearer_auth(self.api_key.expose())
                .json(&body)
                .send()
                .await
                .map_err(|err| ChatError::tooling(format!("image request failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ChatError::tooling(format!(
                    "image service returned {status}"
                )));
            }

            let parsed: ImageGenerationResponse = response
                .json()
                .await
                .map_err(|err| ChatError::tooling(format!("image response is malformed: {err}")))?;

            Ok(parsed.data.into_iter().find_map(|datum| datum.b64_json))
        })
    }
}

pub struct ImageTool {
    synthesizer: Arc<dyn ImageSynthesizer>,
    storage: Arc<dyn ObjectStorage>,
    schema: ParameterSchema,
}

impl ImageTool {
    pub fn new(synthesizer: Arc<dyn ImageSynthesizer>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            synthesizer,
            storage,
            schema: ParameterSchema::new().with(ParameterSpec::string(
                "prompt",
                "Description of the image to generate",
            )),
        }
    }

    async fn generate_and_upload(&self, prompt: &str) -> Result<Value, ChatError> {
        let encoded = self
            .synthesizer
            .synthesize(prompt)
            .await?
            .ok_or_else(|| ChatError::tooling("image service returned no image data"))?;

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|err| ChatError::tooling(format!("image payload is not base64: {err}")))?;

        let key = format!("uploads/{}.png", MessageId::generate());
        let stored = self.storage.put(&key, bytes, "image/png").await?;

        Ok(json!({
            "url": stored.url,
            "prompt": prompt,
            "message": "Image generated and displayed successfully.",
        }))
    }
}

impl Tool for ImageTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GenerateImage
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt"
    }

    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn execute<'a>(
        &'a self,
        args: Map<String, Value>,
        _context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, ToolOutcome> {
        Box::pin(async move {
            let prompt = match required_string(&args, "prompt") {
                Ok(prompt) => prompt,
                Err(err) => return ToolOutcome::failure(err.message),
            };

            match self.generate_and_upload(&prompt).await {
                Ok(payload) => ToolOutcome::success(payload),
                Err(err) => {
                    tracing::error!(error = %err, "image generation failed");
                    ToolOutcome::failure(IMAGE_FAILURE_MESSAGE)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryObjectStorage;

    struct FixedSynthesizer(Option<String>);

    impl ImageSynthesizer for FixedSynthesizer {
        fn synthesize<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> BoxFuture<'a, Result<Option<String>, ChatError>> {
            Box::pin(async move { Ok(self.0.clone()) })
        }
    }

    fn context() -> ToolExecutionContext {
        ToolExecutionContext::new("c1")
    }

    fn args(prompt: &str) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("prompt".to_string(), json!(prompt));
        args
    }

    #[tokio::test]
    async fn uploads_decoded_png_and_reports_url() {
        let storage = Arc::new(InMemoryObjectStorage::new("http://files"));
        let tool = ImageTool::new(
            Arc::new(FixedSynthesizer(Some(STANDARD.encode([137u8, 80, 78, 71])))),
            storage.clone(),
        );

        let outcome = tool.execute(args("a red fox"), &context()).await;
        let payload = outcome.payload();
        assert_eq!(payload["prompt"], "a red fox");
        assert_eq!(
            payload["message"],
            "Image generated and displayed successfully."
        );

        let url = payload["url"].as_str().expect("url");
        let key = url.trim_start_matches("http://files/");
        assert!(key.starts_with("uploads/") && key.ends_with(".png"));
        assert_eq!(
            storage.get(key),
            Some((vec![137, 80, 78, 71], "image/png".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_payload_is_failure_outcome() {
        let storage = Arc::new(InMemoryObjectStorage::default());
        let tool = ImageTool::new(Arc::new(FixedSynthesizer(None)), storage.clone());

        let outcome = tool.execute(args("anything"), &context()).await;
        assert_eq!(outcome, ToolOutcome::failure(IMAGE_FAILURE_MESSAGE));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn undecodable_payload_is_failure_outcome() {
        let tool = ImageTool::new(
            Arc::new(FixedSynthesizer(Some("@@not base64@@".to_string()))),
            Arc::new(InMemoryObjectStorage::default()),
        );
        let outcome = tool.execute(args("anything"), &context()).await;
        assert!(!outcome.is_success());
    }
}
