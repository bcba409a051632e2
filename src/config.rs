//! Runtime settings (environment) and the optional TOML file with prompts + question bank.
//!
//! See `Settings::from_env` for the variables and `TriviaConfig` for the TOML schema.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::Difficulty;

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub database_url: String,
  pub db_pool_size: u32,
  pub admin_username: String,
  /// Admin login is disabled while this is `None`.
  pub admin_password: Option<String>,
  pub jwt_secret: String,
  pub jwt_ttl_hours: i64,
}

impl Settings {
  /// Read settings from the process environment (after `.env` has been loaded).
  pub fn from_env() -> Self {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Same as `from_env` with an injectable lookup.
  pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Self {
    let parse_or = |key: &str, default: u64| -> u64 {
      match get(key) {
        Some(v) => v.parse().unwrap_or_else(|_| {
          warn!(target: "trivia_backend", %key, value = %v, fallback = default, "Invalid numeric setting; using default");
          default
        }),
        None => default,
      }
    };

    let jwt_secret = get("JWT_SECRET").filter(|s| !s.is_empty()).unwrap_or_else(|| {
      warn!(target: "trivia_backend", "JWT_SECRET not set; using a random per-process secret (admin tokens die on restart)");
      format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
    });

    Self {
      port: parse_or("PORT", 3000).min(u16::MAX as u64) as u16,
      database_url: get("DATABASE_URL").unwrap_or_else(|| "trivia.db".into()),
      db_pool_size: parse_or("DB_POOL_SIZE", 8).clamp(1, 64) as u32,
      admin_username: get("ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
      admin_password: get("ADMIN_PASSWORD").filter(|s| !s.is_empty()),
      jwt_secret,
      jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 12).clamp(1, 24 * 30) as i64,
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TriviaConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub questions: Vec<BankQuestion>,
}

/// Question entry accepted in the TOML bank. Loaded as approved on startup.
#[derive(Clone, Debug, Deserialize)]
pub struct BankQuestion {
  /// Category slug; created on the fly if unknown.
  pub category: String,
  pub statement: String,
  pub is_fact: bool,
  #[serde(default)]
  pub explanation: String,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
}

/// Prompts used by the AI client. Override in TOML to tune tone or format.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You write trivia for a 'fact or fake' quiz game. Respond ONLY with strict JSON.".into(),
      question_user_template: "Write {count} short trivia statements about the category '{category}' at {difficulty} difficulty. \
Roughly half must be true facts and half must be plausible fakes. \
Return JSON: {\"questions\": [{\"statement\": string, \"isFact\": boolean, \"explanation\": string}]}. \
Statements must be 10-300 characters; explanations one or two sentences that reveal the truth.".into(),
    }
  }
}

/// Attempt to load `TriviaConfig` from TRIVIA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_trivia_config_from_env() -> Option<TriviaConfig> {
  let path = std::env::var("TRIVIA_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<TriviaConfig>(&s) {
      Ok(cfg) => {
        info!(target: "trivia_backend", %path, bank = cfg.questions.len(), "Loaded trivia config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "trivia_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "trivia_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
