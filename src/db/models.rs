//! Row types. Enum-like columns are kept as text here and parsed at the edges.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::db::schema;
use crate::domain::{Difficulty, QuestionSource, QuestionStatus};

#[derive(Clone, Debug, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::users)]
pub struct User {
  pub id: String,
  pub device_id: String,
  pub nickname: String,
  pub avatar_emoji: String,
  pub avatar_color: String,
  pub created_at: NaiveDateTime,
  pub updated_at: NaiveDateTime,
  pub last_seen_at: NaiveDateTime,
}

#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name = schema::users)]
pub struct UserChanges {
  pub nickname: Option<String>,
  pub avatar_emoji: Option<String>,
  pub avatar_color: Option<String>,
  pub updated_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::categories)]
pub struct Category {
  pub id: String,
  pub slug: String,
  pub name: String,
  pub emoji: String,
  pub sort_order: i32,
  pub is_active: bool,
  pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name = schema::categories)]
pub struct CategoryChanges {
  pub slug: Option<String>,
  pub name: Option<String>,
  pub emoji: Option<String>,
  pub sort_order: Option<i32>,
  pub is_active: Option<bool>,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::questions)]
pub struct Question {
  pub id: String,
  pub category_id: String,
  pub statement: String,
  pub is_fact: bool,
  pub explanation: String,
  pub difficulty: String,
  pub status: String,
  pub source: String,
  pub image_url: Option<String>,
  pub created_at: NaiveDateTime,
  pub updated_at: NaiveDateTime,
}

impl Question {
  // Unknown text (hand-edited rows) degrades to the most conservative variant.
  pub fn status(&self) -> QuestionStatus {
    QuestionStatus::parse(&self.status).unwrap_or(QuestionStatus::Draft)
  }

  pub fn difficulty(&self) -> Difficulty {
    Difficulty::parse(&self.difficulty).unwrap_or_default()
  }

  pub fn source(&self) -> QuestionSource {
    QuestionSource::parse(&self.source).unwrap_or(QuestionSource::Manual)
  }
}

#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name = schema::questions)]
pub struct QuestionChanges {
  pub category_id: Option<String>,
  pub statement: Option<String>,
  pub is_fact: Option<bool>,
  pub explanation: Option<String>,
  pub difficulty: Option<String>,
  pub status: Option<String>,
  pub image_url: Option<Option<String>>,
  pub updated_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::daily_sets)]
pub struct DailySet {
  pub id: String,
  pub set_date: NaiveDate,
  pub title: Option<String>,
  pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::daily_set_questions)]
pub struct DailySetQuestion {
  pub daily_set_id: String,
  pub question_id: String,
  pub position: i32,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::answers)]
pub struct Answer {
  pub id: String,
  pub user_id: String,
  pub question_id: String,
  pub daily_set_id: Option<String>,
  pub answer: bool,
  pub is_correct: bool,
  pub time_seconds: f64,
  pub score: i32,
  pub answered_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = schema::question_views)]
pub struct NewQuestionView {
  pub id: String,
  pub user_id: String,
  pub question_id: String,
  pub served_at: NaiveDateTime,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::leaderboard_entries)]
pub struct LeaderboardEntry {
  pub id: String,
  pub user_id: String,
  pub daily_set_id: String,
  pub score: i32,
  pub correct_answers: i32,
  pub total_time_seconds: f64,
  pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::feature_flags)]
pub struct FeatureFlag {
  pub key: String,
  pub enabled: bool,
  pub description: String,
  pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::notifications)]
pub struct Notification {
  pub id: String,
  pub title: String,
  pub body: String,
  pub created_at: NaiveDateTime,
}
