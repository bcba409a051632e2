//! Minimal OpenAI-compatible client for question generation.
//!
//! We only call chat.completions with a strict JSON-object response format.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::Difficulty;
use crate::util::{fill_template, squash_whitespace, trunc_for_log};

#[derive(Debug, Error)]
pub enum AiError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("OpenAI HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("JSON parse error: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("model returned no usable questions")]
  Empty,
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

/// One generated statement, already trimmed. Not yet persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
  pub statement: String,
  pub is_fact: bool,
  #[serde(default)]
  pub explanation: String,
}

#[derive(Deserialize)]
struct GenBatch {
  #[serde(default)]
  questions: Vec<GeneratedQuestion>,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    Self::new(api_key, base_url, model)
  }

  pub fn new(api_key: String, base_url: String, model: String) -> Option<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;
    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, AiError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "trivia-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(AiError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    Ok(serde_json::from_str::<T>(&text)?)
  }

  /// Generate up to `count` fact-or-fake statements for a category.
  #[instrument(level = "info", skip(self, prompts), fields(%category, difficulty = difficulty.as_str(), count))]
  pub async fn generate_questions(
    &self,
    prompts: &Prompts,
    category: &str,
    difficulty: Difficulty,
    count: usize,
  ) -> Result<Vec<GeneratedQuestion>, AiError> {
    let count_s = count.to_string();
    let user = fill_template(
      &prompts.question_user_template,
      &[("count", &count_s), ("category", category), ("difficulty", difficulty.as_str())],
    );
    let start = Instant::now();
    let result = self.chat_json::<GenBatch>(&prompts.question_system, &user, 0.9).await;
    let elapsed = start.elapsed();

    let batch = match result {
      Ok(b) => {
        info!(?elapsed, returned = b.questions.len(), "Model response received successfully");
        b
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during question generation");
        return Err(e);
      }
    };

    let cleaned = clean_generated(batch.questions, count);
    if cleaned.is_empty() {
      warn!("Model returned only unusable statements");
      return Err(AiError::Empty);
    }
    Ok(cleaned)
  }
}

/// Drop statements outside 10..=500 chars and exact duplicates; cap at `count`.
fn clean_generated(items: Vec<GeneratedQuestion>, count: usize) -> Vec<GeneratedQuestion> {
  let mut out: Vec<GeneratedQuestion> = Vec::with_capacity(count);
  for mut q in items {
    q.statement = squash_whitespace(&q.statement);
    q.explanation = q.explanation.trim().to_string();
    let n = q.statement.chars().count();
    if !(10..=500).contains(&n) || out.iter().any(|o| o.statement == q.statement) {
      continue;
    }
    out.push(q);
    if out.len() == count {
      break;
    }
  }
  out
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn q(statement: &str) -> GeneratedQuestion {
    GeneratedQuestion { statement: statement.into(), is_fact: true, explanation: " why ".into() }
  }

  #[test]
  fn batch_parses_camel_case() {
    let b: GenBatch = serde_json::from_str(
      r#"{"questions":[{"statement":"Octopuses have three hearts.","isFact":true,"explanation":"Two gill hearts and one systemic."}]}"#,
    )
    .unwrap();
    assert_eq!(b.questions.len(), 1);
    assert!(b.questions[0].is_fact);
  }

  #[test]
  fn cleaning_drops_short_duplicates_and_caps() {
    let items = vec![
      q("too short"),
      q("Honey never   spoils if sealed."),
      q("Honey never spoils if sealed."),
      q("Bananas are berries botanically."),
      q("Lightning never strikes twice."),
    ];
    let out = clean_generated(items, 2);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].statement, "Honey never spoils if sealed.");
    assert_eq!(out[0].explanation, "why");
    assert_eq!(out[1].statement, "Bananas are berries botanically.");
  }

  #[test]
  fn openai_error_body_is_extracted() {
    let msg = extract_openai_error(r#"{"error":{"message":"bad key","type":"auth"}}"#);
    assert_eq!(msg.as_deref(), Some("bad key"));
    assert_eq!(extract_openai_error("<html>"), None);
  }
}
