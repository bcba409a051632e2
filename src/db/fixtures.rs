//! Row builders shared by the service and route tests.

use diesel::SqliteConnection;

use crate::db::models::{Category, Question, User};
use crate::db::{catalog, new_id, now, questions, users};
use crate::domain::{Difficulty, QuestionSource, QuestionStatus};

pub fn category(conn: &mut SqliteConnection, slug: &str) -> Category {
  let c = Category {
    id: new_id(),
    slug: slug.into(),
    name: slug.to_uppercase(),
    emoji: "🧪".into(),
    sort_order: 0,
    is_active: true,
    created_at: now(),
  };
  catalog::insert_category(conn, &c).unwrap();
  c
}

pub fn question(conn: &mut SqliteConnection, category_id: &str, status: QuestionStatus, is_fact: bool) -> Question {
  let q = Question {
    id: new_id(),
    category_id: category_id.into(),
    statement: format!("Statement {}", new_id()),
    is_fact,
    explanation: "Because.".into(),
    difficulty: Difficulty::Medium.as_str().into(),
    status: status.as_str().into(),
    source: QuestionSource::Manual.as_str().into(),
    image_url: None,
    created_at: now(),
    updated_at: now(),
  };
  questions::insert(conn, &q).unwrap();
  q
}

pub fn user(conn: &mut SqliteConnection, device_id: &str, nickname: &str) -> User {
  let at = now();
  let u = User {
    id: new_id(),
    device_id: device_id.into(),
    nickname: nickname.into(),
    avatar_emoji: "🦊".into(),
    avatar_color: "#FF8A65".into(),
    created_at: at,
    updated_at: at,
    last_seen_at: at,
  };
  users::insert(conn, &u).unwrap();
  u
}
