//! Configuration loader and validator for the certificate mailer.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub mailer: Mailer,
    pub message: Message,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub key_length: usize,
}

/// Mail API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mailer {
    pub api_base: String,
    pub api_token: String,
    pub from_address: String,
}

/// Message content sent to each participant. `{name}`, `{key}` and
/// `{link}` placeholders are substituted per recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
    pub base_link: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.key_length == 0 {
        return Err(ConfigError::Invalid("app.key_length must be > 0"));
    }

    if cfg.mailer.api_base.trim().is_empty() {
        return Err(ConfigError::Invalid("mailer.api_base must be non-empty"));
    }
    if cfg.mailer.api_token.trim().is_empty() {
        return Err(ConfigError::Invalid("mailer.api_token must be non-empty"));
    }
    if cfg.mailer.from_address.trim().is_empty() {
        return Err(ConfigError::Invalid("mailer.from_address must be non-empty"));
    }

    if cfg.message.subject.trim().is_empty() {
        return Err(ConfigError::Invalid("message.subject must be non-empty"));
    }
    if cfg.message.body.trim().is_empty() {
        return Err(ConfigError::Invalid("message.body must be non-empty"));
    }
    if cfg.message.base_link.trim().is_empty() {
        return Err(ConfigError::Invalid("message.base_link must be non-empty"));
    }

    Ok(())
}

/// Example YAML configuration, also used as a fixture in tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  key_length: 8

mailer:
  api_base: "https://mail.example.com/"
  api_token: "YOUR_MAIL_API_TOKEN"
  from_address: "certificates@example.com"

message:
  subject: "Your certificate, {name}"
  body: |
    Hello {name},

    Your certificate is ready. Download it here: {link}
    Your one-time access key is: {key}
  base_link: "https://certificates.example.com/download"
"#
}
