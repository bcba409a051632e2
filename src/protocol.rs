//! Public protocol structs for the mobile and admin HTTP APIs (serde ready).
//! Keep this small and stable to evolve backend and clients independently.
//!
//! Every successful body is wrapped as `{ "success": true, "data": .. }`; errors use the
//! envelope in `error.rs`. Field names are camelCase on the wire.

use std::collections::BTreeMap;

use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::db::leaderboard::AggregateRow;
use crate::db::models::{Category, DailySet, FeatureFlag, LeaderboardEntry, Notification, Question, User};
use crate::domain::{Difficulty, LeaderboardPeriod, QuestionSource, QuestionStatus};

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data })
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedOut {
    pub id: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub version: &'static str,
}

//
// Players
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIn {
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOut {
    pub id: String,
    pub nickname: String,
    pub avatar_emoji: String,
    pub avatar_color: String,
    pub created_at: NaiveDateTime,
}

impl From<&User> for UserOut {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            nickname: u.nickname.clone(),
            avatar_emoji: u.avatar_emoji.clone(),
            avatar_color: u.avatar_color.clone(),
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOut {
    pub user: UserOut,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOut {
    pub total_answers: i64,
    pub correct_answers: i64,
    /// 0..=1; 0 when the player has not answered anything yet.
    pub accuracy: f64,
    pub daily_sets_played: i64,
    pub best_daily_score: i32,
    pub current_streak: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOut {
    pub user: UserOut,
    pub stats: StatsOut,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileIn {
    pub nickname: Option<String>,
    pub avatar_emoji: Option<String>,
    pub avatar_color: Option<String>,
}

//
// Play
//

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomQuery {
    pub category_id: Option<String>,
    pub difficulty: Option<String>,
}

/// A question as served to players. Never carries the truth value or explanation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayQuestionOut {
    pub id: String,
    pub category_id: String,
    pub statement: String,
    pub difficulty: Difficulty,
    pub image_url: Option<String>,
}

impl From<&Question> for PlayQuestionOut {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            category_id: q.category_id.clone(),
            statement: q.statement.clone(),
            difficulty: q.difficulty(),
            image_url: q.image_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    pub answer: bool,
    pub time_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOut {
    pub question_id: String,
    pub is_correct: bool,
    pub is_fact: bool,
    pub explanation: String,
    pub score: i32,
}

//
// Daily sets
//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryOut {
    pub score: i32,
    pub correct_answers: i32,
    pub total_time_seconds: f64,
    pub submitted_at: NaiveDateTime,
}

impl From<&LeaderboardEntry> for EntryOut {
    fn from(e: &LeaderboardEntry) -> Self {
        Self {
            score: e.score,
            correct_answers: e.correct_answers,
            total_time_seconds: e.total_time_seconds,
            submitted_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySetOut {
    pub id: String,
    pub date: NaiveDate,
    pub title: Option<String>,
    pub questions: Vec<PlayQuestionOut>,
    /// The caller's submission, if any.
    pub entry: Option<EntryOut>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAnswerIn {
    pub question_id: String,
    pub answer: bool,
    pub time_seconds: f64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitDailyIn {
    pub answers: Vec<DailyAnswerIn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDailyOut {
    pub daily_set_id: String,
    pub results: Vec<AnswerOut>,
    pub score: i32,
    pub correct_answers: i32,
    pub total_time_seconds: f64,
    pub rank: i64,
}

//
// Leaderboard
//

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub period: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRowOut {
    pub rank: i64,
    pub user_id: String,
    pub nickname: String,
    pub avatar_emoji: String,
    pub avatar_color: String,
    pub score: i64,
    pub correct_answers: i64,
    pub total_time_seconds: f64,
    pub games_played: i64,
}

impl LeaderboardRowOut {
    pub fn from_row(rank: i64, r: AggregateRow) -> Self {
        Self {
            rank,
            user_id: r.user_id,
            nickname: r.nickname,
            avatar_emoji: r.avatar_emoji,
            avatar_color: r.avatar_color,
            score: r.score,
            correct_answers: r.correct_answers,
            total_time_seconds: r.total_time_seconds,
            games_played: r.games_played,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardOut {
    pub period: LeaderboardPeriod,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub entries: Vec<LeaderboardRowOut>,
    /// The caller's own row; null when they have no entries in the period.
    pub me: Option<LeaderboardRowOut>,
}

//
// Catalog
//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOut {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub emoji: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub question_count: i64,
}

impl CategoryOut {
    pub fn new(c: &Category, question_count: i64) -> Self {
        Self {
            id: c.id.clone(),
            slug: c.slug.clone(),
            name: c.name.clone(),
            emoji: c.emoji.clone(),
            sort_order: c.sort_order,
            is_active: c.is_active,
            question_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryIn {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Public flag map: `{ key: enabled }`.
pub type FlagMap = BTreeMap<String, bool>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagOut {
    pub key: String,
    pub enabled: bool,
    pub description: String,
    pub updated_at: NaiveDateTime,
}

impl From<FeatureFlag> for FlagOut {
    fn from(f: FeatureFlag) -> Self {
        Self { key: f.key, enabled: f.enabled, description: f.description, updated_at: f.updated_at }
    }
}

#[derive(Debug, Deserialize)]
pub struct FlagIn {
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOut {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

impl From<Notification> for NotificationOut {
    fn from(n: Notification) -> Self {
        Self { id: n.id, title: n.title, body: n.body, created_at: n.created_at }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationIn {
    pub title: String,
    pub body: String,
}

//
// Admin
//

#[derive(Deserialize)]
pub struct LoginIn {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOut {
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOut {
    pub users: i64,
    pub questions_by_status: BTreeMap<QuestionStatus, i64>,
    pub categories: i64,
    pub daily_sets: i64,
    pub answers_today: i64,
    pub today_set_exists: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserOut {
    pub id: String,
    pub device_id: String,
    pub nickname: String,
    pub avatar_emoji: String,
    pub avatar_color: String,
    pub created_at: NaiveDateTime,
    pub last_seen_at: NaiveDateTime,
}

impl From<User> for AdminUserOut {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            device_id: u.device_id,
            nickname: u.nickname,
            avatar_emoji: u.avatar_emoji,
            avatar_color: u.avatar_color,
            created_at: u.created_at,
            last_seen_at: u.last_seen_at,
        }
    }
}

/// Full question as seen by moderators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub id: String,
    pub category_id: String,
    pub statement: String,
    pub is_fact: bool,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub status: QuestionStatus,
    pub source: QuestionSource,
    pub image_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Question> for QuestionOut {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            category_id: q.category_id.clone(),
            statement: q.statement.clone(),
            is_fact: q.is_fact,
            explanation: q.explanation.clone(),
            difficulty: q.difficulty(),
            status: q.status(),
            source: q.source(),
            image_url: q.image_url.clone(),
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListQuery {
    pub status: Option<String>,
    pub category_id: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionIn {
    pub category_id: String,
    pub statement: String,
    pub is_fact: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial content update. An empty `imageUrl` clears the image.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionIn {
    pub category_id: Option<String>,
    pub statement: Option<String>,
    pub is_fact: Option<bool>,
    pub explanation: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusIn {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    pub category_id: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateOut {
    pub created: Vec<QuestionOut>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDailySetIn {
    pub date: NaiveDate,
    #[serde(default)]
    pub title: Option<String>,
    pub question_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDailySetOut {
    pub id: String,
    pub date: NaiveDate,
    pub title: Option<String>,
    pub created_at: NaiveDateTime,
    pub questions: Vec<QuestionOut>,
    /// Leaderboard submissions so far.
    pub entries: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySetSummaryOut {
    pub id: String,
    pub date: NaiveDate,
    pub title: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<DailySet> for DailySetSummaryOut {
    fn from(s: DailySet) -> Self {
        Self { id: s.id, date: s.set_date, title: s.title, created_at: s.created_at }
    }
}
