//! SQLite persistence: connection pool, embedded migrations and the query modules.
//!
//! Query functions are synchronous and take `&mut SqliteConnection`; async callers go
//! through [`Db::run`], which checks a connection out of the pool on the blocking
//! thread pool so handlers never block the runtime.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{info, instrument};

use crate::error::ApiError;

pub mod catalog;
pub mod daily_sets;
pub mod leaderboard;
pub mod models;
pub mod questions;
pub mod schema;
pub mod users;

#[cfg(test)]
pub mod fixtures;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Per-connection pragmas. SQLite only enforces foreign keys when asked to.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    conn
      .batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
      .map_err(diesel::r2d2::Error::QueryError)
  }
}

#[derive(Clone)]
pub struct Db {
  pool: DbPool,
}

impl Db {
  /// Build the pool. `":memory:"` with `max_size = 1` gives a private database that
  /// lives as long as the pool.
  #[instrument(level = "info", skip_all, fields(%database_url, max_size = max_size))]
  pub fn connect(database_url: &str, max_size: u32) -> Result<Self, ApiError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
      .max_size(max_size.max(1))
      .connection_customizer(Box::new(SqlitePragmas))
      .build(manager)?;
    Ok(Self { pool })
  }

  #[instrument(level = "info", skip(self))]
  pub fn run_migrations(&self) -> Result<(), ApiError> {
    let mut conn = self.pool.get()?;
    let applied = conn
      .run_pending_migrations(MIGRATIONS)
      .map_err(|e| ApiError::Internal(format!("Migrations failed: {e}")))?;
    info!(target: "trivia_backend", applied = applied.len(), "Database migrations applied");
    Ok(())
  }

  /// Run a blocking database closure on the blocking pool.
  pub async fn run<F, T>(&self, f: F) -> Result<T, ApiError>
  where
    F: FnOnce(&mut SqliteConnection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
  {
    let pool = self.pool.clone();
    tokio::task::spawn_blocking(move || {
      let mut conn = pool.get()?;
      f(&mut *conn)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Database task failed: {e}")))?
  }

  /// Test/bootstrap helper: a fresh in-memory database with migrations applied.
  #[cfg(test)]
  pub fn in_memory() -> Self {
    let db = Self::connect(":memory:", 1).expect("in-memory pool");
    db.run_migrations().expect("migrations");
    db
  }
}

/// New random id for a row.
pub fn new_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

pub fn now() -> chrono::NaiveDateTime {
  chrono::Utc::now().naive_utc()
}

/// Escape character used with [`contains_pattern`].
pub const LIKE_ESCAPE: char = '\\';

/// `%needle%` for a `LIKE .. ESCAPE '\'` substring match. Wildcards in `needle` match literally.
pub fn contains_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
      out.push(LIKE_ESCAPE);
    }
    out.push(c);
  }
  out.push('%');
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use diesel::prelude::*;

  #[derive(QueryableByName)]
  struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
  }

  #[tokio::test]
  async fn migrations_create_all_tables() {
    let db = Db::in_memory();
    let names: Vec<String> = db
      .run(|conn| {
        let rows = diesel::sql_query(
          "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name",
        )
        .load::<TableName>(conn)?;
        Ok(rows.into_iter().map(|t| t.name).collect())
      })
      .await
      .unwrap();

    for t in ["answers", "categories", "daily_set_questions", "daily_sets", "feature_flags",
              "leaderboard_entries", "notifications", "question_views", "questions", "users"] {
      assert!(names.contains(&t.to_string()), "missing table {t}");
    }
  }

  #[tokio::test]
  async fn migrations_are_idempotent() {
    let db = Db::in_memory();
    db.run_migrations().unwrap();
  }

  #[test]
  fn like_wildcards_are_escaped() {
    assert_eq!(contains_pattern("fox"), "%fox%");
    assert_eq!(contains_pattern("100%"), "%100\\%%");
    assert_eq!(contains_pattern("a_b"), "%a\\_b%");
    assert_eq!(contains_pattern("c:\\x"), "%c:\\\\x%");
  }

  #[tokio::test]
  async fn search_treats_wildcards_literally() {
    let db = Db::in_memory();
    let (all, percent, underscore) = db
      .run(|conn| {
        fixtures::user(conn, "device-like-0001", "Plain");
        fixtures::user(conn, "device-like-0002", "Odd_Fox");
        let (_, all) = users::list(conn, Some(""), 0, 10)?;
        let (hits, percent) = users::list(conn, Some("%"), 0, 10)?;
        assert!(hits.is_empty());
        let (hits, underscore) = users::list(conn, Some("_"), 0, 10)?;
        assert_eq!(hits[0].nickname, "Odd_Fox");
        Ok((all, percent, underscore))
      })
      .await
      .unwrap();
    assert_eq!((all, percent, underscore), (2, 0, 1));
  }

  #[tokio::test]
  async fn nickname_uniqueness_ignores_case() {
    let db = Db::in_memory();
    let res = db
      .run(|conn| {
        fixtures::user(conn, "device-case-0001", "Foo_Bar");
        let at = now();
        users::insert(conn, &models::User {
          id: new_id(),
          device_id: "device-case-0002".into(),
          nickname: "foo_bar".into(),
          avatar_emoji: "🦊".into(),
          avatar_color: "#FF8A65".into(),
          created_at: at,
          updated_at: at,
          last_seen_at: at,
        })
      })
      .await;
    assert!(matches!(res, Err(ApiError::Conflict(_))), "{res:?}");
  }

  #[tokio::test]
  async fn foreign_keys_are_enforced() {
    let db = Db::in_memory();
    let res = db
      .run(|conn| {
        diesel::sql_query(
          "INSERT INTO questions (id, category_id, statement, is_fact, explanation, difficulty, status, source, created_at, updated_at) \
           VALUES ('q', 'missing', 'x', 1, '', 'easy', 'draft', 'manual', '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
        )
        .execute(conn)?;
        Ok(())
      })
      .await;
    assert!(res.is_err());
  }
}
