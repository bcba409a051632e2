//! Mobile endpoints under `/api/v1`. Thin wrappers that forward to `logic`.
//! Each handler is instrumented; services log the outcome.

use std::sync::Arc;

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
  routing::{get, post},
  Router,
};
use tracing::{info, instrument};

use super::{api_not_found, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::auth::DeviceUser;
use crate::error::ApiError;
use crate::logic::{self, catalog, daily, leaderboard, play, players};
use crate::protocol::*;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
  Router::new()
    .route("/health", get(http_health))
    .route("/auth/register", post(http_register))
    .route("/users/me", get(http_get_me).patch(http_patch_me))
    .route("/categories", get(http_categories))
    .route("/feature-flags", get(http_feature_flags))
    .route("/notifications", get(http_notifications))
    .route("/questions/random", get(http_random_question))
    .route("/questions/:id/answer", post(http_answer_question))
    .route("/daily-sets/today", get(http_daily_today))
    .route("/daily-sets/:id/submit", post(http_submit_daily))
    .route("/leaderboard", get(http_leaderboard))
    .fallback(api_not_found)
}

#[instrument(level = "info")]
pub async fn http_health() -> ApiResult<HealthOut> {
  Ok(ok(HealthOut { ok: true, version: env!("CARGO_PKG_VERSION") }))
}

#[instrument(level = "info", skip(state, body), fields(device_len = body.device_id.len()))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<RegisterIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = players::register(&state, body.device_id).await?;
  let status = if out.created { StatusCode::CREATED } else { StatusCode::OK };
  info!(target: "trivia_backend", user_id = %out.user.id, created = out.created, "HTTP register served");
  Ok((status, ok(out)))
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id))]
pub async fn http_get_me(
  State(state): State<Arc<AppState>>,
  DeviceUser(user): DeviceUser,
) -> ApiResult<ProfileOut> {
  Ok(ok(players::profile(&state, user, logic::today()).await?))
}

#[instrument(level = "info", skip(state, user, body), fields(user_id = %user.id))]
pub async fn http_patch_me(
  State(state): State<Arc<AppState>>,
  DeviceUser(user): DeviceUser,
  ApiJson(body): ApiJson<UpdateProfileIn>,
) -> ApiResult<UserOut> {
  Ok(ok(players::update_profile(&state, user, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_categories(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CategoryOut>> {
  Ok(ok(catalog::list_categories(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_feature_flags(State(state): State<Arc<AppState>>) -> ApiResult<FlagMap> {
  Ok(ok(catalog::feature_flags(&state).await?))
}

#[instrument(level = "info", skip(state, _user), fields(limit = ?q.limit))]
pub async fn http_notifications(
  State(state): State<Arc<AppState>>,
  _user: DeviceUser,
  ApiQuery(q): ApiQuery<NotificationsQuery>,
) -> ApiResult<Vec<NotificationOut>> {
  Ok(ok(catalog::notifications(&state, q.limit).await?))
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id))]
pub async fn http_random_question(
  State(state): State<Arc<AppState>>,
  DeviceUser(user): DeviceUser,
  ApiQuery(q): ApiQuery<RandomQuery>,
) -> ApiResult<PlayQuestionOut> {
  let filter = play::draw_filter(q)?;
  Ok(ok(play::random_question(&state, &user, filter, logic::today()).await?))
}

#[instrument(level = "info", skip(state, user, body), fields(user_id = %user.id, %id, answer = body.answer))]
pub async fn http_answer_question(
  State(state): State<Arc<AppState>>,
  DeviceUser(user): DeviceUser,
  ApiPath(id): ApiPath<String>,
  ApiJson(body): ApiJson<AnswerIn>,
) -> ApiResult<AnswerOut> {
  Ok(ok(play::answer_question(&state, &user, id, body, logic::today()).await?))
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id))]
pub async fn http_daily_today(
  State(state): State<Arc<AppState>>,
  DeviceUser(user): DeviceUser,
) -> ApiResult<DailySetOut> {
  Ok(ok(daily::today_set(&state, &user, logic::today()).await?))
}

#[instrument(level = "info", skip(state, user, body), fields(user_id = %user.id, %id))]
pub async fn http_submit_daily(
  State(state): State<Arc<AppState>>,
  DeviceUser(user): DeviceUser,
  ApiPath(id): ApiPath<String>,
  ApiJson(body): ApiJson<SubmitDailyIn>,
) -> ApiResult<SubmitDailyOut> {
  Ok(ok(daily::submit_daily(&state, &user, id, body).await?))
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id))]
pub async fn http_leaderboard(
  State(state): State<Arc<AppState>>,
  DeviceUser(user): DeviceUser,
  ApiQuery(q): ApiQuery<LeaderboardQuery>,
) -> ApiResult<LeaderboardOut> {
  Ok(ok(leaderboard::leaderboard(&state, q, Some(user.id), logic::today()).await?))
}
