//! Question rows, answer/view history and the random-draw pool queries.

use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::db::models::{Answer, NewQuestionView, Question, QuestionChanges};
use crate::db::{contains_pattern, LIKE_ESCAPE};
use crate::db::schema::{answers, daily_set_questions, question_views, questions};
use crate::domain::{Difficulty, QuestionStatus};
use crate::error::ApiError;

pub fn insert(conn: &mut SqliteConnection, q: &Question) -> Result<(), ApiError> {
  diesel::insert_into(questions::table).values(q).execute(conn)?;
  Ok(())
}

pub fn get(conn: &mut SqliteConnection, id: &str) -> Result<Question, ApiError> {
  questions::table
    .find(id)
    .select(Question::as_select())
    .first(conn)
    .optional()?
    .ok_or_else(|| ApiError::not_found(format!("Question {id} not found")))
}

pub fn find_many(conn: &mut SqliteConnection, ids: &[String]) -> Result<Vec<Question>, ApiError> {
  if ids.is_empty() {
    return Ok(vec![]);
  }
  Ok(
    questions::table
      .filter(questions::id.eq_any(ids))
      .select(Question::as_select())
      .load(conn)?,
  )
}

pub fn update(conn: &mut SqliteConnection, id: &str, changes: &QuestionChanges) -> Result<Question, ApiError> {
  let n = diesel::update(questions::table.find(id)).set(changes).execute(conn)?;
  if n == 0 {
    return Err(ApiError::not_found(format!("Question {id} not found")));
  }
  get(conn, id)
}

pub fn delete(conn: &mut SqliteConnection, id: &str) -> Result<(), ApiError> {
  let n = diesel::delete(questions::table.find(id)).execute(conn)?;
  if n == 0 {
    return Err(ApiError::not_found(format!("Question {id} not found")));
  }
  Ok(())
}

pub fn in_any_daily_set(conn: &mut SqliteConnection, id: &str) -> Result<bool, ApiError> {
  let n: i64 = daily_set_questions::table
    .filter(daily_set_questions::question_id.eq(id))
    .select(count_star())
    .first(conn)?;
  Ok(n > 0)
}

pub fn statement_exists(conn: &mut SqliteConnection, statement: &str) -> Result<bool, ApiError> {
  let n: i64 = questions::table
    .filter(questions::statement.eq(statement))
    .select(count_star())
    .first(conn)?;
  Ok(n > 0)
}

/// Admin listing filters. All optional.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
  pub status: Option<QuestionStatus>,
  pub category_id: Option<String>,
  pub difficulty: Option<Difficulty>,
  pub search: Option<String>,
}

fn filtered(f: &QuestionFilter) -> questions::BoxedQuery<'static, Sqlite> {
  let mut q = questions::table.into_boxed();
  if let Some(s) = f.status {
    q = q.filter(questions::status.eq(s.as_str()));
  }
  if let Some(c) = &f.category_id {
    q = q.filter(questions::category_id.eq(c.clone()));
  }
  if let Some(d) = f.difficulty {
    q = q.filter(questions::difficulty.eq(d.as_str()));
  }
  if let Some(s) = &f.search {
    q = q.filter(questions::statement.like(contains_pattern(s)).escape(LIKE_ESCAPE));
  }
  q
}

pub fn list(
  conn: &mut SqliteConnection,
  f: &QuestionFilter,
  offset: i64,
  limit: i64,
) -> Result<(Vec<Question>, i64), ApiError> {
  let total: i64 = filtered(f).count().get_result(conn)?;
  let items = filtered(f)
    .order(questions::created_at.desc())
    .offset(offset)
    .limit(limit)
    .select(Question::as_select())
    .load(conn)?;
  Ok((items, total))
}

pub fn count_by_status(conn: &mut SqliteConnection) -> Result<Vec<(String, i64)>, ApiError> {
  Ok(
    questions::table
      .group_by(questions::status)
      .select((questions::status, count_star()))
      .load(conn)?,
  )
}

/// Approved question counts keyed by category id.
pub fn approved_count_by_category(conn: &mut SqliteConnection) -> Result<Vec<(String, i64)>, ApiError> {
  Ok(
    questions::table
      .filter(questions::status.eq(QuestionStatus::Approved.as_str()))
      .group_by(questions::category_id)
      .select((questions::category_id, count_star()))
      .load(conn)?,
  )
}

pub fn count_in_category(conn: &mut SqliteConnection, category_id: &str) -> Result<i64, ApiError> {
  Ok(
    questions::table
      .filter(questions::category_id.eq(category_id))
      .select(count_star())
      .first(conn)?,
  )
}

// ---- Random draw ----

/// Filters a player may put on the random draw.
#[derive(Debug, Clone, Default)]
pub struct DrawFilter {
  pub category_id: Option<String>,
  pub difficulty: Option<Difficulty>,
}

fn pool(f: &DrawFilter, excluded: &[String]) -> questions::BoxedQuery<'static, Sqlite> {
  let mut q = questions::table
    .filter(questions::status.eq(QuestionStatus::Approved.as_str()))
    .into_boxed();
  if let Some(c) = &f.category_id {
    q = q.filter(questions::category_id.eq(c.clone()));
  }
  if let Some(d) = f.difficulty {
    q = q.filter(questions::difficulty.eq(d.as_str()));
  }
  if !excluded.is_empty() {
    q = q.filter(questions::id.ne_all(excluded.to_vec()));
  }
  q
}

pub fn count_pool(conn: &mut SqliteConnection, f: &DrawFilter, excluded: &[String]) -> Result<i64, ApiError> {
  Ok(pool(f, excluded).count().get_result(conn)?)
}

/// The `offset`-th pool row in id order.
pub fn nth_in_pool(
  conn: &mut SqliteConnection,
  f: &DrawFilter,
  excluded: &[String],
  offset: i64,
) -> Result<Option<Question>, ApiError> {
  Ok(
    pool(f, excluded)
      .order(questions::id.asc())
      .offset(offset)
      .limit(1)
      .select(Question::as_select())
      .first(conn)
      .optional()?,
  )
}

// ---- Per-user history ----

pub fn recent_answered_ids(conn: &mut SqliteConnection, user_id: &str, limit: i64) -> Result<Vec<String>, ApiError> {
  Ok(
    answers::table
      .filter(answers::user_id.eq(user_id))
      .order(answers::answered_at.desc())
      .limit(limit)
      .select(answers::question_id)
      .load(conn)?,
  )
}

pub fn recent_served_ids(conn: &mut SqliteConnection, user_id: &str, limit: i64) -> Result<Vec<String>, ApiError> {
  Ok(
    question_views::table
      .filter(question_views::user_id.eq(user_id))
      .order(question_views::served_at.desc())
      .limit(limit)
      .select(question_views::question_id)
      .load(conn)?,
  )
}

pub fn record_view(conn: &mut SqliteConnection, view: &NewQuestionView) -> Result<(), ApiError> {
  diesel::insert_into(question_views::table).values(view).execute(conn)?;
  Ok(())
}

pub fn insert_answers(conn: &mut SqliteConnection, rows: &[Answer]) -> Result<(), ApiError> {
  for row in rows {
    diesel::insert_into(answers::table).values(row).execute(conn)?;
  }
  Ok(())
}

pub fn count_answers_since(conn: &mut SqliteConnection, since: NaiveDateTime) -> Result<i64, ApiError> {
  Ok(
    answers::table
      .filter(answers::answered_at.ge(since))
      .select(count_star())
      .first(conn)?,
  )
}
