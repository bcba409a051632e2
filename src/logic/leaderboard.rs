//! Leaderboards over daily / weekly / all-time periods.
//!
//! Ranks are competition ranks: rank = 1 + number of strictly better aggregates, where
//! better means a higher score, or the same score in less total time.

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::db::leaderboard::{self, AggregateRow};
use crate::domain::LeaderboardPeriod;
use crate::error::ApiError;
use crate::logic::check_limit;
use crate::protocol::{LeaderboardOut, LeaderboardRowOut, LeaderboardQuery};
use crate::state::AppState;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 50;

pub fn parse_period(raw: Option<&str>) -> Result<LeaderboardPeriod, ApiError> {
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(LeaderboardPeriod::default()),
    Some("daily") => Ok(LeaderboardPeriod::Daily),
    Some("weekly") => Ok(LeaderboardPeriod::Weekly),
    Some("all_time") | Some("alltime") | Some("all-time") => Ok(LeaderboardPeriod::AllTime),
    Some(other) => Err(ApiError::bad_request(format!("Unknown period '{other}'"))),
  }
}

/// Rows must already be sorted best first. Tied rows share the rank of the first of them.
pub fn assign_ranks(rows: Vec<AggregateRow>) -> Vec<LeaderboardRowOut> {
  let mut out: Vec<LeaderboardRowOut> = Vec::with_capacity(rows.len());
  for (i, row) in rows.into_iter().enumerate() {
    let rank = match out.last() {
      Some(prev) if prev.score == row.score && prev.total_time_seconds == row.total_time_seconds => prev.rank,
      _ => i as i64 + 1,
    };
    out.push(LeaderboardRowOut::from_row(rank, row));
  }
  out
}

#[instrument(level = "info", skip(state, q), fields(period = ?q.period, limit = ?q.limit, user = ?user_id))]
pub async fn leaderboard(
  state: &AppState,
  q: LeaderboardQuery,
  user_id: Option<String>,
  today: NaiveDate,
) -> Result<LeaderboardOut, ApiError> {
  let period = parse_period(q.period.as_deref())?;
  let limit = q.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
  check_limit(limit)?;
  let (from, to) = period.date_range(today);

  let (rows, me) = state
    .db
    .run(move |conn| {
      let rows = leaderboard::top(conn, from, to, limit)?;
      let me = match user_id {
        Some(uid) => match leaderboard::for_user(conn, from, to, &uid)? {
          Some(row) => {
            let better = leaderboard::count_better(conn, from, to, row.score, row.total_time_seconds)?;
            Some(LeaderboardRowOut::from_row(better + 1, row))
          }
          None => None,
        },
        None => None,
      };
      Ok((rows, me))
    })
    .await?;

  let entries = assign_ranks(rows);
  debug!(target: "leaderboard", period = period.as_str(), %from, %to, entries = entries.len(), has_me = me.is_some(), "Leaderboard computed");
  Ok(LeaderboardOut { period, from, to, entries, me })
}
