//! Leaderboard entries and the SQL aggregates used for ranking.
//!
//! Ranking order is `score DESC, total_time_seconds ASC`; ties beyond that are broken
//! by user creation time only to keep pages stable.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Date, Double, Text};

use crate::db::models::LeaderboardEntry;
use crate::db::schema::leaderboard_entries;
use crate::error::ApiError;

pub fn insert(conn: &mut SqliteConnection, entry: &LeaderboardEntry) -> Result<(), ApiError> {
  diesel::insert_into(leaderboard_entries::table).values(entry).execute(conn)?;
  Ok(())
}

pub fn find(conn: &mut SqliteConnection, user_id: &str, set_id: &str) -> Result<Option<LeaderboardEntry>, ApiError> {
  Ok(
    leaderboard_entries::table
      .filter(leaderboard_entries::user_id.eq(user_id))
      .filter(leaderboard_entries::daily_set_id.eq(set_id))
      .select(LeaderboardEntry::as_select())
      .first(conn)
      .optional()?,
  )
}

/// One aggregated leaderboard line (per user, over a date range).
#[derive(Debug, Clone, PartialEq, QueryableByName)]
pub struct AggregateRow {
  #[diesel(sql_type = Text)]
  pub user_id: String,
  #[diesel(sql_type = Text)]
  pub nickname: String,
  #[diesel(sql_type = Text)]
  pub avatar_emoji: String,
  #[diesel(sql_type = Text)]
  pub avatar_color: String,
  #[diesel(sql_type = BigInt)]
  pub score: i64,
  #[diesel(sql_type = BigInt)]
  pub correct_answers: i64,
  #[diesel(sql_type = Double)]
  pub total_time_seconds: f64,
  #[diesel(sql_type = BigInt)]
  pub games_played: i64,
}

#[derive(QueryableByName)]
struct CountRow {
  #[diesel(sql_type = BigInt)]
  count: i64,
}

const AGGREGATE_SELECT: &str = "\
SELECT u.id AS user_id, u.nickname AS nickname, u.avatar_emoji AS avatar_emoji, u.avatar_color AS avatar_color, \
       SUM(e.score) AS score, SUM(e.correct_answers) AS correct_answers, \
       SUM(e.total_time_seconds) AS total_time_seconds, COUNT(*) AS games_played \
FROM leaderboard_entries e \
JOIN daily_sets d ON d.id = e.daily_set_id \
JOIN users u ON u.id = e.user_id \
WHERE d.set_date BETWEEN ? AND ?";

/// Top `limit` users for the date range, best first.
pub fn top(conn: &mut SqliteConnection, from: NaiveDate, to: NaiveDate, limit: i64) -> Result<Vec<AggregateRow>, ApiError> {
  let sql = format!(
    "{AGGREGATE_SELECT} GROUP BY u.id \
     ORDER BY SUM(e.score) DESC, SUM(e.total_time_seconds) ASC, MIN(u.created_at) ASC \
     LIMIT ?"
  );
  Ok(
    diesel::sql_query(sql)
      .bind::<Date, _>(from)
      .bind::<Date, _>(to)
      .bind::<BigInt, _>(limit)
      .load(conn)?,
  )
}

/// The user's own aggregate for the range, if they played in it.
pub fn for_user(conn: &mut SqliteConnection, from: NaiveDate, to: NaiveDate, user_id: &str) -> Result<Option<AggregateRow>, ApiError> {
  let sql = format!("{AGGREGATE_SELECT} AND e.user_id = ? GROUP BY u.id");
  let rows: Vec<AggregateRow> = diesel::sql_query(sql)
    .bind::<Date, _>(from)
    .bind::<Date, _>(to)
    .bind::<Text, _>(user_id)
    .load(conn)?;
  Ok(rows.into_iter().next())
}

/// Number of users strictly ahead of (`score`, `total_time_seconds`) in the range.
pub fn count_better(
  conn: &mut SqliteConnection,
  from: NaiveDate,
  to: NaiveDate,
  score: i64,
  total_time_seconds: f64,
) -> Result<i64, ApiError> {
  let rows: Vec<CountRow> = diesel::sql_query(
    "WITH agg AS ( \
       SELECT e.user_id AS user_id, SUM(e.score) AS score, SUM(e.total_time_seconds) AS total_time \
       FROM leaderboard_entries e JOIN daily_sets d ON d.id = e.daily_set_id \
       WHERE d.set_date BETWEEN ? AND ? \
       GROUP BY e.user_id) \
     SELECT COUNT(*) AS count FROM agg WHERE score > ? OR (score = ? AND total_time < ?)",
  )
  .bind::<Date, _>(from)
  .bind::<Date, _>(to)
  .bind::<BigInt, _>(score)
  .bind::<BigInt, _>(score)
  .bind::<Double, _>(total_time_seconds)
  .load(conn)?;
  Ok(rows.first().map(|r| r.count).unwrap_or(0))
}
