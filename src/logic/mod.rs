//! Core behaviors behind the HTTP handlers.
//!
//! Handlers stay thin: they extract, call one function here, and wrap the result in the
//! success envelope. Everything that touches business rules lives in these modules.
//!
//!   - `players`: registration, profile, streaks
//!   - `play`: anti-repeat random draw and single answers
//!   - `daily`: daily sets for players and admins
//!   - `leaderboard`: period aggregates and competition ranks
//!   - `catalog`: categories, feature flags, notifications
//!   - `admin`: question moderation, AI generation, dashboard, user list

use chrono::{NaiveDate, Utc};

use crate::error::ApiError;

pub mod admin;
pub mod catalog;
pub mod daily;
pub mod leaderboard;
pub mod play;
pub mod players;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// The calendar day daily sets and leaderboards are keyed on (UTC).
pub fn today() -> NaiveDate {
  Utc::now().date_naive()
}

/// Resolved pagination: 1-based page, limit and the row offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
  pub page: i64,
  pub limit: i64,
  pub offset: i64,
}

impl Paging {
  pub fn resolve(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Result<Self, ApiError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(default_limit);
    if page < 1 {
      return Err(ApiError::bad_request("page must be >= 1"));
    }
    check_limit(limit)?;
    let offset = (page - 1)
      .checked_mul(limit)
      .ok_or_else(|| ApiError::bad_request("page out of range"))?;
    Ok(Self { page, limit, offset })
  }
}

pub fn check_limit(limit: i64) -> Result<(), ApiError> {
  if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
    return Err(ApiError::bad_request(format!("limit must be between 1 and {MAX_PAGE_LIMIT}")));
  }
  Ok(())
}

/// Char-count bounds on a text field.
pub fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
  let n = value.chars().count();
  if n < min || n > max {
    return Err(ApiError::bad_request(format!("{field} must be {min}-{max} characters")));
  }
  Ok(())
}

/// Empty or whitespace-only query values count as absent.
pub fn non_blank(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
