//! Runtime configuration.
//!
//! Read from an optional TOML file, overridden by `TRIPBOX_`-prefixed
//! environment variables (`TRIPBOX_PORT=9000`, `TRIPBOX_ORACLE__MODEL=...`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Production,
  Development,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
  /// An OpenAI-compatible chat-completions endpoint.
  pub endpoint:     String,
  pub model:        String,
  pub api_key:      Option<String>,
  pub timeout_secs: u64,
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      endpoint:     "https://api.openai.com/v1/chat/completions".into(),
      model:        "gpt-4o-mini".into(),
      api_key:      None,
      timeout_secs: 90,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  pub blob_dir:               PathBuf,
  /// URL prefix under which `blob_dir` is publicly served.
  pub public_blob_url:        String,
  pub environment:            Environment,
  /// Pre-shared key of the inbound email provider. Required in production.
  pub webhook_signing_key:    Option<String>,
  pub signature_max_age_secs: u64,
  pub oracle:                 OracleConfig,
  /// Push gateway; notifications are only logged when unset.
  pub push_endpoint:          Option<String>,
  pub default_free_credits:   i64,
  pub forwarding_domain:      String,
  /// Email bodies shorter than this (after cleaning) are ignored.
  pub min_email_body_chars:   usize,
  pub queue_capacity:         usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                   "127.0.0.1".into(),
      port:                   8080,
      store_path:             PathBuf::from("tripbox.db"),
      blob_dir:               PathBuf::from("blobs"),
      public_blob_url:        "http://127.0.0.1:8080/blobs".into(),
      environment:            Environment::Production,
      webhook_signing_key:    None,
      signature_max_age_secs: 900,
      oracle:                 OracleConfig::default(),
      push_endpoint:          None,
      default_free_credits:   5,
      forwarding_domain:      "in.tripbox.app".into(),
      min_email_body_chars:   50,
      queue_capacity:         256,
    }
  }
}

impl ServerConfig {
  /// Layer `path` (if it exists) under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("TRIPBOX")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn is_production(&self) -> bool { self.environment == Environment::Production }
}
