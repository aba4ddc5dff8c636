use serde::Deserialize;
use std::{fs, io, path::Path, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub upload: UploadSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// How the uploaded file is packaged for the remote OCR service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayBackend {
    /// Multipart upload of the raw file bytes.
    RawUpload,
    /// JSON body carrying the base64-encoded file.
    Base64Json,
    /// OpenAI-style chat completion with an inline data-URL image.
    #[default]
    ChatCompletion,
}

impl GatewayBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayBackend::RawUpload => "raw_upload",
            GatewayBackend::Base64Json => "base64_json",
            GatewayBackend::ChatCompletion => "chat_completion",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    #[serde(default)]
    pub backend: GatewayBackend,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            backend: GatewayBackend::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            prompt: default_prompt(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_key_env() -> String {
    "OCR_API_KEY".to_string()
}

fn default_prompt() -> String {
    "Pročitaj sav tekst sa ove fakture i vrati ga kao običan tekst, red po red, \
     bez dodatnih komentara."
        .to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSection {
    /// Maximum number of characters kept in the `raw_text` preview.
    #[serde(default = "default_preview_len")]
    pub preview_len: usize,
    /// How many leading lines are scanned for the vendor name.
    #[serde(default = "default_vendor_scan_lines")]
    pub vendor_scan_lines: usize,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            preview_len: default_preview_len(),
            vendor_scan_lines: default_vendor_scan_lines(),
        }
    }
}

fn default_preview_len() -> usize {
    500
}

fn default_vendor_scan_lines() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSection {
    #[serde(default)]
    pub accept_pdf: bool,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            accept_pdf: false,
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

/// Gateway settings resolved at startup, credential included.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub backend: GatewayBackend,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub prompt: String,
    pub max_tokens: u32,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            other => other,
        }
    }

    /// Resolve the gateway section, reading the credential from the environment.
    pub fn gateway_config(&self) -> GatewayConfig {
        let api_key = std::env::var(&self.gateway.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.gateway_config_with_key(api_key)
    }

    pub fn gateway_config_with_key(&self, api_key: Option<String>) -> GatewayConfig {
        GatewayConfig {
            backend: self.gateway.backend,
            endpoint: self.gateway.endpoint.trim_end_matches('/').to_string(),
            model: self.gateway.model.clone(),
            api_key,
            timeout: Duration::from_secs(self.gateway.timeout_secs),
            prompt: self.gateway.prompt.clone(),
            max_tokens: self.gateway.max_tokens,
        }
    }
}
