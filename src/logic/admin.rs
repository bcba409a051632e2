//! Admin panel operations: question moderation workflow, AI generation, dashboard, users.

use std::collections::BTreeMap;

use diesel::SqliteConnection;
use tracing::{error, info, instrument, warn};

use crate::db::models::{Category, Question, QuestionChanges};
use crate::db::questions::{self, QuestionFilter};
use crate::db::{catalog, daily_sets, new_id, now, users};
use crate::domain::{Difficulty, QuestionSource, QuestionStatus};
use crate::error::ApiError;
use crate::logic::{check_len, non_blank, today, Paging, DEFAULT_PAGE_LIMIT};
use crate::protocol::{
  AdminUserOut, CreateQuestionIn, DashboardOut, GenerateIn, GenerateOut, Page, PageQuery, QuestionListQuery,
  QuestionOut, UpdateQuestionIn,
};
use crate::state::AppState;

pub const MAX_GENERATE_COUNT: i64 = 10;
const DEFAULT_GENERATE_COUNT: i64 = 5;

fn check_statement(s: &str) -> Result<(), ApiError> {
  check_len("statement", s, 10, 500)
}

fn check_explanation(s: &str) -> Result<(), ApiError> {
  check_len("explanation", s, 0, 1000)
}

/// A referenced category that does not exist is a client error, not a 404.
fn require_category(conn: &mut SqliteConnection, id: &str) -> Result<Category, ApiError> {
  match catalog::get_category(conn, id) {
    Err(ApiError::NotFound(_)) => Err(ApiError::bad_request(format!("Category {id} does not exist"))),
    other => other,
  }
}

fn parse_status(raw: &str) -> Result<QuestionStatus, ApiError> {
  QuestionStatus::parse(raw.trim()).ok_or_else(|| ApiError::bad_request(format!("Unknown status '{raw}'")))
}

// ---- Questions ----

#[instrument(level = "info", skip(state, q))]
pub async fn list_questions(state: &AppState, q: QuestionListQuery) -> Result<Page<QuestionOut>, ApiError> {
  let p = Paging::resolve(q.page, q.limit, DEFAULT_PAGE_LIMIT)?;
  let status = non_blank(q.status).map(|s| parse_status(&s)).transpose()?;
  let difficulty = match non_blank(q.difficulty) {
    Some(d) => Some(Difficulty::parse(&d).ok_or_else(|| ApiError::bad_request(format!("Unknown difficulty '{d}'")))?),
    None => None,
  };
  let filter = QuestionFilter { status, category_id: non_blank(q.category_id), difficulty, search: non_blank(q.search) };

  let (items, total) = state.db.run(move |conn| questions::list(conn, &filter, p.offset, p.limit)).await?;
  Ok(Page { items: items.iter().map(QuestionOut::from).collect(), total, page: p.page, limit: p.limit })
}

/// New questions always start as drafts.
#[instrument(level = "info", skip(state, body), fields(category_id = %body.category_id))]
pub async fn create_question(state: &AppState, body: CreateQuestionIn) -> Result<QuestionOut, ApiError> {
  let statement = body.statement.trim().to_string();
  let explanation = body.explanation.trim().to_string();
  check_statement(&statement)?;
  check_explanation(&explanation)?;

  let at = now();
  let q = Question {
    id: new_id(),
    category_id: body.category_id,
    statement,
    is_fact: body.is_fact,
    explanation,
    difficulty: body.difficulty.as_str().into(),
    status: QuestionStatus::Draft.as_str().into(),
    source: QuestionSource::Manual.as_str().into(),
    image_url: non_blank(body.image_url),
    created_at: at,
    updated_at: at,
  };
  let q = state
    .db
    .run(move |conn| {
      require_category(conn, &q.category_id)?;
      questions::insert(conn, &q)?;
      Ok(q)
    })
    .await?;
  info!(target: "admin", question_id = %q.id, "Question created");
  Ok(QuestionOut::from(&q))
}

#[instrument(level = "info", skip(state))]
pub async fn get_question(state: &AppState, id: String) -> Result<QuestionOut, ApiError> {
  let q = state.db.run(move |conn| questions::get(conn, &id)).await?;
  Ok(QuestionOut::from(&q))
}

/// Content fields only; status changes go through [`set_status`].
#[instrument(level = "info", skip(state, body))]
pub async fn update_question(state: &AppState, id: String, body: UpdateQuestionIn) -> Result<QuestionOut, ApiError> {
  let statement = body.statement.map(|s| s.trim().to_string());
  if let Some(s) = &statement {
    check_statement(s)?;
  }
  let explanation = body.explanation.map(|s| s.trim().to_string());
  if let Some(e) = &explanation {
    check_explanation(e)?;
  }
  let changes = QuestionChanges {
    category_id: body.category_id,
    statement,
    is_fact: body.is_fact,
    explanation,
    difficulty: body.difficulty.map(|d| d.as_str().to_string()),
    status: None,
    image_url: body.image_url.map(|u| non_blank(Some(u))),
    updated_at: Some(now()),
  };

  let q = state
    .db
    .run(move |conn| {
      if let Some(cid) = &changes.category_id {
        require_category(conn, cid)?;
      }
      questions::update(conn, &id, &changes)
    })
    .await?;
  info!(target: "admin", question_id = %q.id, "Question updated");
  Ok(QuestionOut::from(&q))
}

#[instrument(level = "info", skip(state))]
pub async fn delete_question(state: &AppState, id: String) -> Result<(), ApiError> {
  let deleted = id.clone();
  state
    .db
    .run(move |conn| {
      questions::get(conn, &id)?;
      if questions::in_any_daily_set(conn, &id)? {
        return Err(ApiError::conflict("Question is used in a daily set"));
      }
      questions::delete(conn, &id)
    })
    .await?;
  warn!(target: "admin", question_id = %deleted, "Question deleted");
  Ok(())
}

/// Move a question along the moderation workflow.
#[instrument(level = "info", skip(state))]
pub async fn set_status(state: &AppState, id: String, status: String) -> Result<QuestionOut, ApiError> {
  let next = parse_status(&status)?;
  let (q, from) = state
    .db
    .run(move |conn| {
      let q = questions::get(conn, &id)?;
      let current = q.status();
      if !current.can_transition_to(next) {
        return Err(ApiError::bad_request(format!(
          "Cannot move a question from {} to {}",
          current.as_str(),
          next.as_str()
        )));
      }
      if current == QuestionStatus::Approved && questions::in_any_daily_set(conn, &id)? {
        return Err(ApiError::conflict("Question is used in a daily set and must stay approved"));
      }
      let changes = QuestionChanges {
        status: Some(next.as_str().into()),
        updated_at: Some(now()),
        ..Default::default()
      };
      Ok((questions::update(conn, &id, &changes)?, current))
    })
    .await?;
  info!(target: "admin", question_id = %q.id, from = from.as_str(), to = next.as_str(), "Question status changed");
  Ok(QuestionOut::from(&q))
}

/// Ask the model for new statements and queue them for moderation.
#[instrument(level = "info", skip(state, body), fields(category_id = %body.category_id, difficulty = body.difficulty.as_str(), count = ?body.count))]
pub async fn generate_questions(state: &AppState, body: GenerateIn) -> Result<GenerateOut, ApiError> {
  let count = body.count.unwrap_or(DEFAULT_GENERATE_COUNT);
  if !(1..=MAX_GENERATE_COUNT).contains(&count) {
    return Err(ApiError::bad_request(format!("count must be between 1 and {MAX_GENERATE_COUNT}")));
  }
  let Some(oa) = &state.openai else {
    return Err(ApiError::Unavailable("AI generation is not configured".into()));
  };

  let category_id = body.category_id.clone();
  let category = state
    .db
    .run(move |conn| require_category(conn, &category_id))
    .await?;

  let generated = oa
    .generate_questions(&state.prompts, &category.name, body.difficulty, count as usize)
    .await
    .map_err(|e| {
      error!(target: "admin", category = %category.slug, error = %e, "AI question generation failed");
      ApiError::Internal("question generation failed".into())
    })?;

  let difficulty = body.difficulty;
  let created = state
    .db
    .run(move |conn| {
      let at = now();
      let mut created = Vec::with_capacity(generated.len());
      for g in generated {
        if questions::statement_exists(conn, &g.statement)? {
          continue;
        }
        let q = Question {
          id: new_id(),
          category_id: category.id.clone(),
          statement: g.statement,
          is_fact: g.is_fact,
          explanation: g.explanation.chars().take(1000).collect(),
          difficulty: difficulty.as_str().into(),
          status: QuestionStatus::Moderation.as_str().into(),
          source: QuestionSource::Ai.as_str().into(),
          image_url: None,
          created_at: at,
          updated_at: at,
        };
        questions::insert(conn, &q)?;
        created.push(q);
      }
      Ok(created)
    })
    .await?;

  info!(target: "admin", created = created.len(), "AI questions queued for moderation");
  Ok(GenerateOut { created: created.iter().map(QuestionOut::from).collect() })
}

// ---- Dashboard & users ----

#[instrument(level = "info", skip(state))]
pub async fn dashboard(state: &AppState) -> Result<DashboardOut, ApiError> {
  let day = today();
  state
    .db
    .run(move |conn| {
      let mut by_status: BTreeMap<QuestionStatus, i64> = QuestionStatus::ALL.iter().map(|s| (*s, 0)).collect();
      for (raw, n) in questions::count_by_status(conn)? {
        if let Some(s) = QuestionStatus::parse(&raw) {
          by_status.insert(s, n);
        }
      }
      let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::Internal("invalid day start".into()))?;
      Ok(DashboardOut {
        users: users::count(conn)?,
        questions_by_status: by_status,
        categories: catalog::count_categories(conn)?,
        daily_sets: daily_sets::count(conn)?,
        answers_today: questions::count_answers_since(conn, midnight)?,
        today_set_exists: daily_sets::find_by_date(conn, day)?.is_some(),
      })
    })
    .await
}

#[instrument(level = "info", skip(state, q))]
pub async fn list_users(state: &AppState, q: PageQuery) -> Result<Page<AdminUserOut>, ApiError> {
  let p = Paging::resolve(q.page, q.limit, DEFAULT_PAGE_LIMIT)?;
  let search = non_blank(q.search);
  let (items, total) = state
    .db
    .run(move |conn| users::list(conn, search.as_deref(), p.offset, p.limit))
    .await?;
  Ok(Page { items: items.into_iter().map(AdminUserOut::from).collect(), total, page: p.page, limit: p.limit })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::fixtures;
  use crate::db::models::DailySet;
  use crate::openai::OpenAI;

  fn create_body(category_id: &str) -> CreateQuestionIn {
    CreateQuestionIn {
      category_id: category_id.into(),
      statement: "Sharks existed before trees did.".into(),
      is_fact: true,
      explanation: "Sharks appeared ~450M years ago, trees ~385M.".into(),
      difficulty: Difficulty::Hard,
      image_url: None,
    }
  }

  async fn with_category() -> (AppState, String) {
    let state = AppState::for_tests();
    let cid = state.db.run(|conn| Ok(fixtures::category(conn, "science").id)).await.unwrap();
    (state, cid)
  }

  #[tokio::test]
  async fn create_starts_as_draft_and_validates() {
    let (state, cid) = with_category().await;
    let q = create_question(&state, create_body(&cid)).await.unwrap();
    assert_eq!(q.status, QuestionStatus::Draft);
    assert_eq!(q.source, QuestionSource::Manual);
    assert_eq!(q.difficulty, Difficulty::Hard);

    let mut short = create_body(&cid);
    short.statement = "Too short".into();
    assert!(matches!(create_question(&state, short).await, Err(ApiError::BadRequest(_))));
    assert!(matches!(create_question(&state, create_body("nope")).await, Err(ApiError::BadRequest(_))));
  }

  #[tokio::test]
  async fn moderation_workflow_transitions() {
    let (state, cid) = with_category().await;
    let q = create_question(&state, create_body(&cid)).await.unwrap();

    assert!(matches!(set_status(&state, q.id.clone(), "approved".into()).await, Err(ApiError::BadRequest(_))));
    assert!(matches!(set_status(&state, q.id.clone(), "published".into()).await, Err(ApiError::BadRequest(_))));

    let q = set_status(&state, q.id, "moderation".into()).await.unwrap();
    assert_eq!(q.status, QuestionStatus::Moderation);
    let q = set_status(&state, q.id, "rejected".into()).await.unwrap();
    let q = set_status(&state, q.id, "draft".into()).await.unwrap();
    let q = set_status(&state, q.id, "moderation".into()).await.unwrap();
    let q = set_status(&state, q.id, "approved".into()).await.unwrap();
    assert_eq!(q.status, QuestionStatus::Approved);
    let q = set_status(&state, q.id, "draft".into()).await.unwrap();
    assert_eq!(q.status, QuestionStatus::Draft);
  }

  #[tokio::test]
  async fn daily_set_membership_blocks_unapprove_and_delete() {
    let (state, cid) = with_category().await;
    let qs = state
      .db
      .run(move |conn| {
        let qs: Vec<Question> = (0..5).map(|_| fixtures::question(conn, &cid, QuestionStatus::Approved, true)).collect();
        let ids: Vec<String> = qs.iter().map(|q| q.id.clone()).collect();
        let set = DailySet { id: new_id(), set_date: today(), title: None, created_at: now() };
        daily_sets::insert(conn, &set, &ids)?;
        Ok(qs)
      })
      .await
      .unwrap();

    let id = qs[0].id.clone();
    assert!(matches!(set_status(&state, id.clone(), "draft".into()).await, Err(ApiError::Conflict(_))));
    assert!(matches!(delete_question(&state, id).await, Err(ApiError::Conflict(_))));
  }

  #[tokio::test]
  async fn update_touches_content_only() {
    let (state, cid) = with_category().await;
    let q = create_question(&state, create_body(&cid)).await.unwrap();
    let body = UpdateQuestionIn { is_fact: Some(false), image_url: Some("https://img.example/x.png".into()), ..Default::default() };
    let updated = update_question(&state, q.id.clone(), body).await.unwrap();
    assert!(!updated.is_fact);
    assert_eq!(updated.status, QuestionStatus::Draft);
    assert_eq!(updated.image_url.as_deref(), Some("https://img.example/x.png"));

    let cleared = update_question(&state, q.id, UpdateQuestionIn { image_url: Some(String::new()), ..Default::default() }).await.unwrap();
    assert_eq!(cleared.image_url, None);
  }

  #[tokio::test]
  async fn list_filters_and_paginates() {
    let (state, cid) = with_category().await;
    for _ in 0..3 {
      create_question(&state, create_body(&cid)).await.unwrap();
    }
    state.db.run(move |conn| Ok(fixtures::question(conn, &cid, QuestionStatus::Approved, true))).await.unwrap();

    let drafts = list_questions(&state, QuestionListQuery { status: Some("draft".into()), limit: Some(2), ..Default::default() }).await.unwrap();
    assert_eq!(drafts.total, 3);
    assert_eq!(drafts.items.len(), 2);
    let page2 = list_questions(&state, QuestionListQuery { status: Some("draft".into()), limit: Some(2), page: Some(2), ..Default::default() }).await.unwrap();
    assert_eq!(page2.items.len(), 1);

    let found = list_questions(&state, QuestionListQuery { search: Some("Sharks".into()), ..Default::default() }).await.unwrap();
    assert_eq!(found.total, 3);
  }

  #[tokio::test]
  async fn generate_requires_ai_and_valid_count() {
    let (state, cid) = with_category().await;
    let body = |count| GenerateIn { category_id: cid.clone(), difficulty: Difficulty::Easy, count };
    assert!(matches!(generate_questions(&state, body(Some(11))).await, Err(ApiError::BadRequest(_))));
    assert!(matches!(generate_questions(&state, body(Some(3))).await, Err(ApiError::Unavailable(_))));
  }

  #[tokio::test]
  async fn generate_failure_is_500() {
    let (mut state, cid) = with_category().await;
    // Nothing listens on port 9; the request fails fast.
    state.openai = OpenAI::new("test-key".into(), "http://127.0.0.1:9/v1".into(), "test-model".into());
    let body = GenerateIn { category_id: cid, difficulty: Difficulty::Easy, count: Some(2) };
    match generate_questions(&state, body).await {
      Err(ApiError::Internal(msg)) => assert_eq!(msg, "question generation failed"),
      other => panic!("expected 500, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn dashboard_counts() {
    let (state, cid) = with_category().await;
    create_question(&state, create_body(&cid)).await.unwrap();
    state.db.run(|conn| Ok(fixtures::user(conn, "device-dash-001", "Dash_1"))).await.unwrap();

    let d = dashboard(&state).await.unwrap();
    assert_eq!(d.users, 1);
    assert_eq!(d.categories, 1);
    assert_eq!(d.questions_by_status.get(&QuestionStatus::Draft), Some(&1));
    assert_eq!(d.questions_by_status.get(&QuestionStatus::Approved), Some(&0));
    assert!(!d.today_set_exists);

    let users = list_users(&state, PageQuery { search: Some("Dash".into()), ..Default::default() }).await.unwrap();
    assert_eq!(users.total, 1);
    assert_eq!(users.items[0].device_id, "device-dash-001");
  }
}
