//! Daily sets and their ordered question lists.

use chrono::NaiveDate;
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::db::models::{DailySet, DailySetQuestion, Question};
use crate::db::schema::{daily_set_questions, daily_sets, leaderboard_entries, questions};
use crate::error::ApiError;

pub fn find_by_date(conn: &mut SqliteConnection, date: NaiveDate) -> Result<Option<DailySet>, ApiError> {
  Ok(
    daily_sets::table
      .filter(daily_sets::set_date.eq(date))
      .select(DailySet::as_select())
      .first(conn)
      .optional()?,
  )
}

pub fn get(conn: &mut SqliteConnection, id: &str) -> Result<DailySet, ApiError> {
  daily_sets::table
    .find(id)
    .select(DailySet::as_select())
    .first(conn)
    .optional()?
    .ok_or_else(|| ApiError::not_found(format!("Daily set {id} not found")))
}

/// Question ids in position order.
pub fn question_ids(conn: &mut SqliteConnection, set_id: &str) -> Result<Vec<String>, ApiError> {
  Ok(
    daily_set_questions::table
      .filter(daily_set_questions::daily_set_id.eq(set_id))
      .order(daily_set_questions::position.asc())
      .select(daily_set_questions::question_id)
      .load(conn)?,
  )
}

/// Full question rows in position order.
pub fn questions(conn: &mut SqliteConnection, set_id: &str) -> Result<Vec<Question>, ApiError> {
  Ok(
    daily_set_questions::table
      .inner_join(questions::table)
      .filter(daily_set_questions::daily_set_id.eq(set_id))
      .order(daily_set_questions::position.asc())
      .select(Question::as_select())
      .load(conn)?,
  )
}

/// Insert the set and its question links. Callers wrap this in a transaction.
pub fn insert(conn: &mut SqliteConnection, set: &DailySet, question_ids: &[String]) -> Result<(), ApiError> {
  diesel::insert_into(daily_sets::table).values(set).execute(conn)?;
  let links: Vec<DailySetQuestion> = question_ids
    .iter()
    .enumerate()
    .map(|(i, qid)| DailySetQuestion {
      daily_set_id: set.id.clone(),
      question_id: qid.clone(),
      position: i as i32,
    })
    .collect();
  for link in &links {
    diesel::insert_into(daily_set_questions::table).values(link).execute(conn)?;
  }
  Ok(())
}

/// Newest date first.
pub fn list(conn: &mut SqliteConnection, offset: i64, limit: i64) -> Result<(Vec<DailySet>, i64), ApiError> {
  let total = count(conn)?;
  let items = daily_sets::table
    .order(daily_sets::set_date.desc())
    .offset(offset)
    .limit(limit)
    .select(DailySet::as_select())
    .load(conn)?;
  Ok((items, total))
}

pub fn count(conn: &mut SqliteConnection) -> Result<i64, ApiError> {
  Ok(daily_sets::table.select(count_star()).first(conn)?)
}

pub fn entry_count(conn: &mut SqliteConnection, set_id: &str) -> Result<i64, ApiError> {
  Ok(
    leaderboard_entries::table
      .filter(leaderboard_entries::daily_set_id.eq(set_id))
      .select(count_star())
      .first(conn)?,
  )
}

/// Question links go with the set (ON DELETE CASCADE).
pub fn delete(conn: &mut SqliteConnection, id: &str) -> Result<(), ApiError> {
  let n = diesel::delete(daily_sets::table.find(id)).execute(conn)?;
  if n == 0 {
    return Err(ApiError::not_found(format!("Daily set {id} not found")));
  }
  Ok(())
}
