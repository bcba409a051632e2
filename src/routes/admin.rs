//! Admin endpoints under `/admin`. Everything except login sits behind the bearer-token layer.

use std::sync::Arc;

use axum::{
  extract::State,
  middleware,
  routing::{delete, get, patch, post, put},
  Router,
};
use tracing::{info, instrument};

use super::{api_not_found, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::auth::{self, AdminClaims};
use crate::logic::{admin, catalog, daily};
use crate::protocol::*;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
  let protected = Router::new()
    .route("/dashboard", get(http_dashboard))
    .route("/users", get(http_users))
    .route("/questions", get(http_list_questions).post(http_create_question))
    .route("/questions/generate", post(http_generate_questions))
    .route(
      "/questions/:id",
      get(http_get_question).patch(http_update_question).delete(http_delete_question),
    )
    .route("/questions/:id/status", post(http_set_status))
    .route("/categories", get(http_list_categories).post(http_create_category))
    .route("/categories/:id", patch(http_update_category).delete(http_delete_category))
    .route("/daily-sets", get(http_list_daily_sets).post(http_create_daily_set))
    .route("/daily-sets/:id", get(http_get_daily_set).delete(http_delete_daily_set))
    .route("/feature-flags", get(http_list_flags))
    .route("/feature-flags/:key", put(http_upsert_flag).delete(http_delete_flag))
    .route("/notifications", get(http_list_notifications).post(http_create_notification))
    .route("/notifications/:id", delete(http_delete_notification))
    .fallback(api_not_found)
    .route_layer(middleware::from_extractor_with_state::<AdminClaims, _>(state));

  Router::new()
    .route("/auth/login", post(http_login))
    .merge(protected)
}

#[instrument(level = "info", skip(state, body), fields(username = %body.username))]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<LoginIn>,
) -> ApiResult<LoginOut> {
  Ok(ok(auth::login(&state.settings, &body.username, &body.password)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_dashboard(State(state): State<Arc<AppState>>) -> ApiResult<DashboardOut> {
  Ok(ok(admin::dashboard(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_users(
  State(state): State<Arc<AppState>>,
  ApiQuery(q): ApiQuery<PageQuery>,
) -> ApiResult<Page<AdminUserOut>> {
  Ok(ok(admin::list_users(&state, q).await?))
}

//
// Questions
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_questions(
  State(state): State<Arc<AppState>>,
  ApiQuery(q): ApiQuery<QuestionListQuery>,
) -> ApiResult<Page<QuestionOut>> {
  Ok(ok(admin::list_questions(&state, q).await?))
}

#[instrument(level = "info", skip(state, body), fields(category_id = %body.category_id))]
pub async fn http_create_question(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<CreateQuestionIn>,
) -> ApiResult<QuestionOut> {
  Ok(ok(admin::create_question(&state, body).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_generate_questions(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<GenerateIn>,
) -> ApiResult<GenerateOut> {
  let out = admin::generate_questions(&state, body).await?;
  info!(target: "admin", created = out.created.len(), "HTTP generate served");
  Ok(ok(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_question(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
) -> ApiResult<QuestionOut> {
  Ok(ok(admin::get_question(&state, id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_question(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
  ApiJson(body): ApiJson<UpdateQuestionIn>,
) -> ApiResult<QuestionOut> {
  Ok(ok(admin::update_question(&state, id, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_question(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
) -> ApiResult<DeletedOut> {
  admin::delete_question(&state, id.clone()).await?;
  Ok(ok(DeletedOut { id }))
}

#[instrument(level = "info", skip(state, body), fields(status = %body.status))]
pub async fn http_set_status(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
  ApiJson(body): ApiJson<StatusIn>,
) -> ApiResult<QuestionOut> {
  Ok(ok(admin::set_status(&state, id, body.status).await?))
}

//
// Categories
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CategoryOut>> {
  Ok(ok(catalog::admin_list_categories(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_category(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<CategoryIn>,
) -> ApiResult<CategoryOut> {
  Ok(ok(catalog::create_category(&state, body).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_category(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
  ApiJson(body): ApiJson<CategoryPatch>,
) -> ApiResult<CategoryOut> {
  Ok(ok(catalog::update_category(&state, id, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_category(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
) -> ApiResult<DeletedOut> {
  catalog::delete_category(&state, id.clone()).await?;
  Ok(ok(DeletedOut { id }))
}

//
// Daily sets
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_daily_sets(
  State(state): State<Arc<AppState>>,
  ApiQuery(q): ApiQuery<PageQuery>,
) -> ApiResult<Page<DailySetSummaryOut>> {
  Ok(ok(daily::list_daily_sets(&state, q).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_daily_set(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<CreateDailySetIn>,
) -> ApiResult<AdminDailySetOut> {
  Ok(ok(daily::create_daily_set(&state, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_daily_set(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
) -> ApiResult<AdminDailySetOut> {
  Ok(ok(daily::get_daily_set(&state, id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_daily_set(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
) -> ApiResult<DeletedOut> {
  daily::delete_daily_set(&state, id.clone()).await?;
  Ok(ok(DeletedOut { id }))
}

//
// Feature flags
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_flags(State(state): State<Arc<AppState>>) -> ApiResult<Vec<FlagOut>> {
  Ok(ok(catalog::admin_list_flags(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_upsert_flag(
  State(state): State<Arc<AppState>>,
  ApiPath(key): ApiPath<String>,
  ApiJson(body): ApiJson<FlagIn>,
) -> ApiResult<FlagOut> {
  Ok(ok(catalog::upsert_flag(&state, key, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_flag(
  State(state): State<Arc<AppState>>,
  ApiPath(key): ApiPath<String>,
) -> ApiResult<DeletedOut> {
  catalog::delete_flag(&state, key.clone()).await?;
  Ok(ok(DeletedOut { id: key }))
}

//
// Notifications
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_notifications(
  State(state): State<Arc<AppState>>,
  ApiQuery(q): ApiQuery<NotificationsQuery>,
) -> ApiResult<Vec<NotificationOut>> {
  Ok(ok(catalog::notifications(&state, q.limit).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_create_notification(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<NotificationIn>,
) -> ApiResult<NotificationOut> {
  Ok(ok(catalog::create_notification(&state, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_notification(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<String>,
) -> ApiResult<DeletedOut> {
  catalog::delete_notification(&state, id.clone()).await?;
  Ok(ok(DeletedOut { id }))
}
