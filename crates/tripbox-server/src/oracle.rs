//! HTTP client for an OpenAI-compatible chat-completions endpoint acting as
//! the extraction oracle.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tripbox_core::oracle::{ExtractionOracle, OracleContent, OracleRequest};

use crate::config::OracleConfig;

#[derive(Debug, Error)]
pub enum OracleError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
  #[error("oracle answered {status}: {body}")]
  Status { status: u16, body: String },
  #[error("oracle reply had no content")]
  EmptyReply,
}

pub struct HttpOracle {
  client:   reqwest::Client,
  endpoint: String,
  model:    String,
  api_key:  Option<String>,
}

impl HttpOracle {
  pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      endpoint: config.endpoint.clone(),
      model: config.model.clone(),
      api_key: config.api_key.clone(),
    })
  }
}

/// The chat-completions request body for `request`.
pub fn chat_body(model: &str, request: &OracleRequest) -> Value {
  let part = match &request.content {
    OracleContent::Image { url } => json!({ "type": "image_url", "image_url": { "url": url } }),
    OracleContent::Pdf { url, file_name } => json!({
      "type": "file",
      "file": {
        "filename":  file_name.as_deref().unwrap_or("document.pdf"),
        "file_data": url,
      },
    }),
    OracleContent::Text(text) => json!({ "type": "text", "text": text }),
  };

  json!({
    "model": model,
    "temperature": 0,
    "response_format": { "type": "json_object" },
    "messages": [
      { "role": "system", "content": request.instructions },
      { "role": "user", "content": [part] },
    ],
  })
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: Message,
}

#[derive(Deserialize)]
struct Message {
  content: Option<String>,
}

impl ExtractionOracle for HttpOracle {
  type Error = OracleError;

  async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
    let mut builder = self.client.post(&self.endpoint).json(&chat_body(&self.model, request));
    if let Some(key) = &self.api_key {
      builder = builder.bearer_auth(key);
    }

    let resp = builder.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(OracleError::Status { status: status.as_u16(), body });
    }

    let reply: ChatResponse = resp.json().await?;
    reply
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|c| !c.trim().is_empty())
      .ok_or(OracleError::EmptyReply)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request(content: OracleContent) -> OracleRequest {
    OracleRequest { instructions: "find bookings".into(), content }
  }

  #[test]
  fn text_goes_in_a_text_part() {
    let body = chat_body("m", &request(OracleContent::Text("hello".into())));
    assert_eq!(body["model"], "m");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["content"], "find bookings");
    assert_eq!(body["messages"][1]["content"][0], json!({ "type": "text", "text": "hello" }));
  }

  #[test]
  fn images_and_pdfs_use_their_part_types() {
    let body = chat_body("m", &request(OracleContent::Image { url: "data:image/png;base64,AA==".into() }));
    let part = &body["messages"][1]["content"][0];
    assert_eq!(part["type"], "image_url");
    assert_eq!(part["image_url"]["url"], "data:image/png;base64,AA==");

    let body = chat_body(
      "m",
      &request(OracleContent::Pdf { url: "data:application/pdf;base64,JVBERg==".into(), file_name: None }),
    );
    let part = &body["messages"][1]["content"][0];
    assert_eq!(part["type"], "file");
    assert_eq!(part["file"]["filename"], "document.pdf");
    assert_eq!(part["file"]["file_data"], "data:application/pdf;base64,JVBERg==");
  }

  #[test]
  fn reply_content_is_extracted() {
    let reply: ChatResponse = serde_json::from_value(json!({
      "choices": [{ "message": { "role": "assistant", "content": "{\"documents\":[]}" } }]
    }))
    .unwrap();
    assert_eq!(reply.choices[0].message.content.as_deref(), Some("{\"documents\":[]}"));
  }
}
