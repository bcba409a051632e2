//! User rows: device lookup, nickname uniqueness, profile updates and per-user stats.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::dsl::{count_star, max};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::db::models::{User, UserChanges};
use crate::db::{contains_pattern, LIKE_ESCAPE};
use crate::db::schema::{answers, daily_sets, leaderboard_entries, users};
use crate::error::ApiError;

pub fn find_by_device(conn: &mut SqliteConnection, device_id: &str) -> Result<Option<User>, ApiError> {
  let user = users::table
    .filter(users::device_id.eq(device_id))
    .select(User::as_select())
    .first(conn)
    .optional()?;
  Ok(user)
}

pub fn get(conn: &mut SqliteConnection, id: &str) -> Result<User, ApiError> {
  users::table
    .find(id)
    .select(User::as_select())
    .first(conn)
    .optional()?
    .ok_or_else(|| ApiError::not_found(format!("User {id} not found")))
}

diesel::define_sql_function! {
  fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// True if `nickname` belongs to someone other than `except_user` (case-insensitive).
pub fn nickname_taken(
  conn: &mut SqliteConnection,
  nickname: &str,
  except_user: Option<&str>,
) -> Result<bool, ApiError> {
  let mut query: users::BoxedQuery<'_, Sqlite> = users::table
    .filter(lower(users::nickname).eq(nickname.to_lowercase()))
    .into_boxed();
  if let Some(id) = except_user {
    query = query.filter(users::id.ne(id.to_string()));
  }
  let n: i64 = query.count().get_result(conn)?;
  Ok(n > 0)
}

pub fn insert(conn: &mut SqliteConnection, user: &User) -> Result<(), ApiError> {
  diesel::insert_into(users::table).values(user).execute(conn)?;
  Ok(())
}

pub fn update(conn: &mut SqliteConnection, id: &str, changes: &UserChanges) -> Result<User, ApiError> {
  diesel::update(users::table.find(id)).set(changes).execute(conn)?;
  get(conn, id)
}

pub fn touch_last_seen(conn: &mut SqliteConnection, id: &str, at: NaiveDateTime) -> Result<(), ApiError> {
  diesel::update(users::table.find(id))
    .set(users::last_seen_at.eq(at))
    .execute(conn)?;
  Ok(())
}

pub fn count(conn: &mut SqliteConnection) -> Result<i64, ApiError> {
  Ok(users::table.select(count_star()).first(conn)?)
}

/// Newest users first; `search` matches nickname or device id substrings.
pub fn list(
  conn: &mut SqliteConnection,
  search: Option<&str>,
  offset: i64,
  limit: i64,
) -> Result<(Vec<User>, i64), ApiError> {
  let total: i64 = search_query(search).count().get_result(conn)?;
  let items = search_query(search)
    .order(users::created_at.desc())
    .offset(offset)
    .limit(limit)
    .select(User::as_select())
    .load(conn)?;
  Ok((items, total))
}

fn search_query(search: Option<&str>) -> users::BoxedQuery<'static, Sqlite> {
  let mut q = users::table.into_boxed();
  if let Some(s) = search {
    let pattern = contains_pattern(s);
    q = q.filter(
      users::nickname
        .like(pattern.clone())
        .escape(LIKE_ESCAPE)
        .or(users::device_id.like(pattern).escape(LIKE_ESCAPE)),
    );
  }
  q
}

/// Raw aggregates behind the profile screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserTotals {
  pub total_answers: i64,
  pub correct_answers: i64,
  pub daily_sets_played: i64,
  pub best_daily_score: i32,
  /// Dates of every daily set the user submitted, newest first.
  pub played_dates: Vec<NaiveDate>,
}

pub fn totals(conn: &mut SqliteConnection, user_id: &str) -> Result<UserTotals, ApiError> {
  let total_answers: i64 = answers::table
    .filter(answers::user_id.eq(user_id))
    .select(count_star())
    .first(conn)?;
  let correct_answers: i64 = answers::table
    .filter(answers::user_id.eq(user_id))
    .filter(answers::is_correct.eq(true))
    .select(count_star())
    .first(conn)?;
  let best: Option<i32> = leaderboard_entries::table
    .filter(leaderboard_entries::user_id.eq(user_id))
    .select(max(leaderboard_entries::score))
    .first(conn)?;
  let played_dates: Vec<NaiveDate> = leaderboard_entries::table
    .inner_join(daily_sets::table)
    .filter(leaderboard_entries::user_id.eq(user_id))
    .order(daily_sets::set_date.desc())
    .select(daily_sets::set_date)
    .load(conn)?;

  Ok(UserTotals {
    total_answers,
    correct_answers,
    daily_sets_played: played_dates.len() as i64,
    best_daily_score: best.unwrap_or(0),
    played_dates,
  })
}
