// src/gateway/http.rs

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Response, multipart};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{GatewayError, OcrGateway, Upload, reject_reported_error};
use crate::config::{GatewayBackend, GatewayConfig};

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OCR gateway talking to a remote HTTP service in one of three payload shapes.
///
/// The inner `reqwest::Client` is shared by all requests; cloning the gateway
/// is cheap.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn send_raw_upload(&self, api_key: &str, upload: &Upload) -> Result<Value, GatewayError> {
        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone().unwrap_or_else(|| "upload".to_string()))
            .mime_str(&upload.content_type)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        read_json(response).await
    }

    async fn send_base64_json(&self, api_key: &str, upload: &Upload) -> Result<Value, GatewayError> {
        let body = json!({
            "image": STANDARD.encode(&upload.bytes),
            "content_type": upload.content_type,
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }

    async fn send_chat_completion(
        &self,
        api_key: &str,
        upload: &Upload,
    ) -> Result<Value, GatewayError> {
        let data_url = format!(
            "data:{};base64,{}",
            upload.content_type,
            STANDARD.encode(&upload.bytes)
        );
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: self.config.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            temperature: 0.0,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let payload = read_json(response).await?;
        let chat: ChatResponse = serde_json::from_value(payload)
            .map_err(|e| GatewayError::Decode(format!("not a chat completion: {e}")))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Decode("empty choices in chat completion".to_string()))?
            .message
            .content
            .unwrap_or_default();

        Ok(Value::String(strip_code_fences(&content).to_string()))
    }
}

#[async_trait]
impl OcrGateway for HttpGateway {
    async fn recognize(&self, upload: &Upload) -> Result<Value, GatewayError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            warn!("No API key configured, skipping OCR call");
            return Err(GatewayError::MissingCredential);
        };

        info!(
            backend = self.config.backend.as_str(),
            endpoint = %self.config.endpoint,
            content_type = %upload.content_type,
            bytes = upload.bytes.len(),
            "Sending document to OCR service"
        );

        match self.config.backend {
            GatewayBackend::RawUpload => self.send_raw_upload(api_key, upload).await,
            GatewayBackend::Base64Json => self.send_base64_json(api_key, upload).await,
            GatewayBackend::ChatCompletion => self.send_chat_completion(api_key, upload).await,
        }
    }

    fn backend(&self) -> &str {
        self.config.backend.as_str()
    }
}

/// Check the status, then decode the body as JSON and surface service-reported errors.
async fn read_json(response: Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let payload: Value = serde_json::from_str(&body)
        .map_err(|e| GatewayError::Decode(format!("invalid JSON body: {e}")))?;
    reject_reported_error(payload)
}

/// Models sometimes wrap the transcription in markdown fences despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let inner = match inner.find('\n') {
        Some(pos) if !inner[..pos].contains(' ') => &inner[pos + 1..],
        _ => inner,
    };
    inner.trim_end().trim_end_matches("```").trim()
}
