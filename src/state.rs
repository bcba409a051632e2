//! Application state: database pool, settings, prompts and the optional OpenAI client.
//!
//! Built once at startup and shared behind an `Arc` by every handler.

use tracing::{info, instrument};

use crate::config::{load_trivia_config_from_env, Prompts, Settings};
use crate::db::Db;
use crate::error::ApiError;
use crate::openai::OpenAI;
use crate::seeds;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub settings: Settings,
    pub prompts: Prompts,
    pub openai: Option<OpenAI>,
}

impl AppState {
    /// Connect, migrate, seed an empty database, import the TOML bank, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub async fn bootstrap(settings: Settings) -> Result<Self, ApiError> {
        let db = Db::connect(&settings.database_url, settings.db_pool_size)?;
        db.run_migrations()?;

        let cfg = load_trivia_config_from_env().unwrap_or_default();
        let bank = cfg.questions;
        let (seeded, imported) = db
            .run(move |conn| {
                let seeded = seeds::seed_if_empty(conn)?;
                let imported = seeds::import_bank(conn, &bank)?;
                Ok((seeded, imported))
            })
            .await?;
        info!(target: "trivia_backend", seeded, imported, "Startup content ready");

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "trivia_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "trivia_backend", "OpenAI disabled (no OPENAI_API_KEY). Question generation returns 503.");
        }

        Ok(Self { db, settings, prompts: cfg.prompts, openai })
    }

    /// Fresh in-memory database, fixed admin credentials, no OpenAI.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let settings = Settings::from_lookup(|k| match k {
            "ADMIN_PASSWORD" => Some("letmein".into()),
            "JWT_SECRET" => Some("test-secret".into()),
            _ => None,
        });
        Self {
            db: Db::in_memory(),
            settings,
            prompts: Prompts::default(),
            openai: None,
        }
    }
}
