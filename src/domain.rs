//! Domain vocabulary: question status/difficulty/source, leaderboard periods and scoring.
//!
//! Enums are stored as lowercase text columns; `as_str`/`parse` are the only
//! conversions between the two representations.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Moderation state of a question. Only `Approved` questions are ever served to players.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
  Draft,
  Moderation,
  Approved,
  Rejected,
}

impl QuestionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Moderation => "moderation",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "draft" => Some(Self::Draft),
      "moderation" => Some(Self::Moderation),
      "approved" => Some(Self::Approved),
      "rejected" => Some(Self::Rejected),
      _ => None,
    }
  }

  /// Moderation workflow edges. Everything not listed here is rejected.
  pub fn can_transition_to(&self, next: QuestionStatus) -> bool {
    use QuestionStatus::*;
    matches!(
      (self, next),
      (Draft, Moderation)
        | (Moderation, Approved)
        | (Moderation, Rejected)
        | (Moderation, Draft)
        | (Rejected, Draft)
        | (Approved, Draft)
    )
  }

  pub const ALL: [QuestionStatus; 4] = [Self::Draft, Self::Moderation, Self::Approved, Self::Rejected];
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "easy" => Some(Self::Easy),
      "medium" => Some(Self::Medium),
      "hard" => Some(Self::Hard),
      _ => None,
    }
  }
}

impl Default for Difficulty {
  fn default() -> Self { Difficulty::Medium }
}

/// Where did the question come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
  Manual, // typed in the admin panel
  Ai,     // generated via the chat completions API
  Bank,   // loaded from the TOML question bank or built-in seeds
}

impl QuestionSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Manual => "manual",
      Self::Ai => "ai",
      Self::Bank => "bank",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "manual" => Some(Self::Manual),
      "ai" => Some(Self::Ai),
      "bank" => Some(Self::Bank),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
  Daily,
  Weekly,
  AllTime,
}

impl Default for LeaderboardPeriod {
  fn default() -> Self { LeaderboardPeriod::Daily }
}

impl LeaderboardPeriod {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Daily => "daily",
      Self::Weekly => "weekly",
      Self::AllTime => "all_time",
    }
  }

  /// Inclusive range of daily-set dates that count towards this period.
  /// Weekly is the ISO week (Monday..=Sunday) containing `today`.
  pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match self {
      Self::Daily => (today, today),
      Self::Weekly => {
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        (monday, monday + Duration::days(6))
      }
      // Dates are stored as ISO text, so the bounds must stay 4-digit years.
      Self::AllTime => (
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(today),
        NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(today),
      ),
    }
  }
}

pub const DAILY_SET_SIZE: usize = 5;

pub const MAX_ANSWER_SECONDS: f64 = 3600.0;
const BASE_POINTS: i32 = 100;
const MAX_SPEED_BONUS: f64 = 50.0;
const SPEED_WINDOW_SECONDS: f64 = 10.0;

/// Points for a single answer. Incorrect answers always score 0.
pub fn score_answer(is_correct: bool, time_seconds: f64) -> i32 {
  if !is_correct {
    return 0;
  }
  let bonus = (MAX_SPEED_BONUS * (SPEED_WINDOW_SECONDS - time_seconds) / SPEED_WINDOW_SECONDS)
    .round()
    .clamp(0.0, MAX_SPEED_BONUS);
  BASE_POINTS + bonus as i32
}

pub fn valid_answer_time(time_seconds: f64) -> bool {
  time_seconds.is_finite() && (0.0..=MAX_ANSWER_SECONDS).contains(&time_seconds)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn incorrect_answer_scores_zero() {
    assert_eq!(score_answer(false, 0.5), 0);
    assert_eq!(score_answer(false, 100.0), 0);
  }

  #[test]
  fn correct_answer_gets_speed_bonus() {
    assert_eq!(score_answer(true, 0.0), 150);
    assert_eq!(score_answer(true, 5.0), 125);
    assert_eq!(score_answer(true, 10.0), 100);
    assert_eq!(score_answer(true, 42.0), 100);
  }

  #[test]
  fn answer_time_bounds() {
    assert!(valid_answer_time(0.0));
    assert!(valid_answer_time(3600.0));
    assert!(!valid_answer_time(-0.1));
    assert!(!valid_answer_time(f64::NAN));
    assert!(!valid_answer_time(f64::INFINITY));
  }

  #[test]
  fn moderation_workflow() {
    use QuestionStatus::*;
    assert!(Draft.can_transition_to(Moderation));
    assert!(Moderation.can_transition_to(Approved));
    assert!(Moderation.can_transition_to(Rejected));
    assert!(Approved.can_transition_to(Draft));
    assert!(!Draft.can_transition_to(Approved));
    assert!(!Rejected.can_transition_to(Approved));
    assert!(!Approved.can_transition_to(Approved));
  }

  #[test]
  fn status_text_round_trips_for_every_variant() {
    for s in QuestionStatus::ALL {
      assert_eq!(QuestionStatus::parse(s.as_str()), Some(s));
    }
    assert_eq!(QuestionStatus::parse("published"), None);
  }

  #[test]
  fn weekly_range_is_iso_week() {
    // 2026-10-21 is a Wednesday.
    let wed = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
    let (from, to) = LeaderboardPeriod::Weekly.date_range(wed);
    assert_eq!(from, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    assert_eq!(to, NaiveDate::from_ymd_opt(2026, 10, 25).unwrap());

    let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    assert_eq!(LeaderboardPeriod::Weekly.date_range(monday).0, monday);
  }

  #[test]
  fn daily_range_is_single_day() {
    let d = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    assert_eq!(LeaderboardPeriod::Daily.date_range(d), (d, d));
  }
}
