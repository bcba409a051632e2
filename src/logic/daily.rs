//! Daily sets: today's set for players, one-shot submissions, and admin management.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use diesel::{Connection, SqliteConnection};
use tracing::{info, instrument, warn};

use crate::db::models::{Answer, DailySet, LeaderboardEntry, User};
use crate::db::{daily_sets, leaderboard, new_id, now, questions};
use crate::domain::{score_answer, valid_answer_time, QuestionStatus, DAILY_SET_SIZE};
use crate::error::ApiError;
use crate::logic::{check_len, Paging, DEFAULT_PAGE_LIMIT};
use crate::protocol::{
  AdminDailySetOut, AnswerOut, CreateDailySetIn, DailySetOut, DailySetSummaryOut, EntryOut, Page, PageQuery,
  PlayQuestionOut, QuestionOut, SubmitDailyIn, SubmitDailyOut,
};
use crate::state::AppState;

fn player_view(conn: &mut SqliteConnection, set: DailySet, user_id: &str) -> Result<DailySetOut, ApiError> {
  let qs = daily_sets::questions(conn, &set.id)?;
  let entry = leaderboard::find(conn, user_id, &set.id)?;
  Ok(DailySetOut {
    id: set.id,
    date: set.set_date,
    title: set.title,
    questions: qs.iter().map(PlayQuestionOut::from).collect(),
    entry: entry.as_ref().map(EntryOut::from),
  })
}

/// Today's set without answers, plus the caller's submission if they already played.
#[instrument(level = "info", skip(state, user), fields(user_id = %user.id, %today))]
pub async fn today_set(state: &AppState, user: &User, today: NaiveDate) -> Result<DailySetOut, ApiError> {
  daily_set_by_date(state, user, today).await
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id, %date))]
pub async fn daily_set_by_date(state: &AppState, user: &User, date: NaiveDate) -> Result<DailySetOut, ApiError> {
  let uid = user.id.clone();
  state
    .db
    .run(move |conn| {
      let set = daily_sets::find_by_date(conn, date)?
        .ok_or_else(|| ApiError::not_found(format!("No daily set for {date}")))?;
      player_view(conn, set, &uid)
    })
    .await
}

/// Check a submission covers each set question exactly once.
pub fn check_submission(set_question_ids: &[String], submitted: &[String]) -> Result<(), ApiError> {
  let expected: HashSet<&str> = set_question_ids.iter().map(String::as_str).collect();
  let mut seen = HashSet::new();
  for id in submitted {
    if !expected.contains(id.as_str()) {
      return Err(ApiError::bad_request(format!("Question {id} is not part of this daily set")));
    }
    if !seen.insert(id.as_str()) {
      return Err(ApiError::bad_request(format!("Question {id} answered more than once")));
    }
  }
  if seen.len() != expected.len() {
    return Err(ApiError::bad_request(format!(
      "Expected {} answers, got {}",
      expected.len(),
      seen.len()
    )));
  }
  Ok(())
}

/// Score every answer, write answers and the leaderboard entry atomically, return the daily rank.
#[instrument(level = "info", skip(state, user, body), fields(user_id = %user.id, %daily_set_id, answers = body.answers.len()))]
pub async fn submit_daily(
  state: &AppState,
  user: &User,
  daily_set_id: String,
  body: SubmitDailyIn,
) -> Result<SubmitDailyOut, ApiError> {
  if body.answers.iter().any(|a| !valid_answer_time(a.time_seconds)) {
    return Err(ApiError::bad_request("timeSeconds must be between 0 and 3600"));
  }

  let uid = user.id.clone();
  let out = state
    .db
    .run(move |conn| {
      conn.transaction::<_, ApiError, _>(|conn| {
        let set = daily_sets::get(conn, &daily_set_id)?;
        if leaderboard::find(conn, &uid, &set.id)?.is_some() {
          return Err(ApiError::conflict("Daily set already submitted"));
        }

        let qs = daily_sets::questions(conn, &set.id)?;
        let set_ids: Vec<String> = qs.iter().map(|q| q.id.clone()).collect();
        let submitted: Vec<String> = body.answers.iter().map(|a| a.question_id.clone()).collect();
        check_submission(&set_ids, &submitted)?;

        let by_id: HashMap<&str, _> = body.answers.iter().map(|a| (a.question_id.as_str(), a)).collect();
        let at = now();
        let mut rows = Vec::with_capacity(qs.len());
        let mut results = Vec::with_capacity(qs.len());
        for q in &qs {
          let Some(a) = by_id.get(q.id.as_str()) else {
            continue;
          };
          let is_correct = a.answer == q.is_fact;
          let score = score_answer(is_correct, a.time_seconds);
          rows.push(Answer {
            id: new_id(),
            user_id: uid.clone(),
            question_id: q.id.clone(),
            daily_set_id: Some(set.id.clone()),
            answer: a.answer,
            is_correct,
            time_seconds: a.time_seconds,
            score,
            answered_at: at,
          });
          results.push(AnswerOut {
            question_id: q.id.clone(),
            is_correct,
            is_fact: q.is_fact,
            explanation: q.explanation.clone(),
            score,
          });
        }

        let score: i32 = rows.iter().map(|r| r.score).sum();
        let correct_answers = rows.iter().filter(|r| r.is_correct).count() as i32;
        let total_time_seconds: f64 = rows.iter().map(|r| r.time_seconds).sum();

        questions::insert_answers(conn, &rows)?;
        leaderboard::insert(conn, &LeaderboardEntry {
          id: new_id(),
          user_id: uid.clone(),
          daily_set_id: set.id.clone(),
          score,
          correct_answers,
          total_time_seconds,
          created_at: at,
        })?;

        let better = leaderboard::count_better(conn, set.set_date, set.set_date, score as i64, total_time_seconds)?;
        Ok(SubmitDailyOut {
          daily_set_id: set.id,
          results,
          score,
          correct_answers,
          total_time_seconds,
          rank: better + 1,
        })
      })
    })
    .await?;

  info!(target: "daily", user_id = %user.id, daily_set_id = %out.daily_set_id, score = out.score, correct = out.correct_answers, rank = out.rank, "Daily set submitted");
  Ok(out)
}

// ---- Admin ----

fn admin_view(conn: &mut SqliteConnection, set: DailySet) -> Result<AdminDailySetOut, ApiError> {
  let qs = daily_sets::questions(conn, &set.id)?;
  let entries = daily_sets::entry_count(conn, &set.id)?;
  Ok(AdminDailySetOut {
    id: set.id,
    date: set.set_date,
    title: set.title,
    created_at: set.created_at,
    questions: qs.iter().map(QuestionOut::from).collect(),
    entries,
  })
}

#[instrument(level = "info", skip(state, body), fields(date = %body.date, ids = body.question_ids.len()))]
pub async fn create_daily_set(state: &AppState, body: CreateDailySetIn) -> Result<AdminDailySetOut, ApiError> {
  let title = body.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
  if let Some(t) = &title {
    check_len("title", t, 1, 120)?;
  }
  let ids = body.question_ids;
  let distinct: HashSet<&String> = ids.iter().collect();
  if ids.len() != DAILY_SET_SIZE || distinct.len() != DAILY_SET_SIZE {
    return Err(ApiError::bad_request(format!("A daily set needs exactly {DAILY_SET_SIZE} distinct question ids")));
  }

  let date = body.date;
  let out = state
    .db
    .run(move |conn| {
      conn.transaction::<_, ApiError, _>(|conn| {
        let found = questions::find_many(conn, &ids)?;
        let invalid: Vec<&str> = ids
          .iter()
          .filter(|id| !found.iter().any(|q| &q.id == *id && q.status() == QuestionStatus::Approved))
          .map(String::as_str)
          .collect();
        if !invalid.is_empty() {
          return Err(ApiError::bad_request(format!(
            "Missing or unapproved questions: {}",
            invalid.join(", ")
          )));
        }
        if daily_sets::find_by_date(conn, date)?.is_some() {
          return Err(ApiError::conflict(format!("A daily set for {date} already exists")));
        }

        let set = DailySet { id: new_id(), set_date: date, title, created_at: now() };
        daily_sets::insert(conn, &set, &ids)?;
        admin_view(conn, set)
      })
    })
    .await?;

  info!(target: "admin", daily_set_id = %out.id, date = %out.date, "Daily set created");
  Ok(out)
}

#[instrument(level = "info", skip(state, q))]
pub async fn list_daily_sets(state: &AppState, q: PageQuery) -> Result<Page<DailySetSummaryOut>, ApiError> {
  let p = Paging::resolve(q.page, q.limit, DEFAULT_PAGE_LIMIT)?;
  let (items, total) = state.db.run(move |conn| daily_sets::list(conn, p.offset, p.limit)).await?;
  Ok(Page { items: items.into_iter().map(Into::into).collect(), total, page: p.page, limit: p.limit })
}

#[instrument(level = "info", skip(state))]
pub async fn get_daily_set(state: &AppState, id: String) -> Result<AdminDailySetOut, ApiError> {
  state
    .db
    .run(move |conn| {
      let set = daily_sets::get(conn, &id)?;
      admin_view(conn, set)
    })
    .await
}

#[instrument(level = "info", skip(state))]
pub async fn delete_daily_set(state: &AppState, id: String) -> Result<(), ApiError> {
  let deleted = id.clone();
  state
    .db
    .run(move |conn| {
      conn.transaction::<_, ApiError, _>(|conn| {
        let set = daily_sets::get(conn, &id)?;
        if daily_sets::entry_count(conn, &set.id)? > 0 {
          return Err(ApiError::conflict("Daily set already has leaderboard entries"));
        }
        daily_sets::delete(conn, &set.id)
      })
    })
    .await?;
  warn!(target: "admin", daily_set_id = %deleted, "Daily set deleted");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::fixtures;
  use crate::db::models::Question;
  use crate::protocol::DailyAnswerIn;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
  }

  async fn setup() -> (AppState, User, Vec<Question>) {
    let state = AppState::for_tests();
    let (user, qs) = state
      .db
      .run(|conn| {
        let cat = fixtures::category(conn, "science");
        let qs: Vec<Question> = (0..6).map(|i| fixtures::question(conn, &cat.id, QuestionStatus::Approved, i % 2 == 0)).collect();
        Ok((fixtures::user(conn, "device-daily-001", "Daily_1"), qs))
      })
      .await
      .unwrap();
    (state, user, qs)
  }

  fn create_body(qs: &[Question]) -> CreateDailySetIn {
    CreateDailySetIn {
      date: today(),
      title: Some("Monday mix".into()),
      question_ids: qs.iter().take(5).map(|q| q.id.clone()).collect(),
    }
  }

  fn all_correct(set: &AdminDailySetOut, t: f64) -> SubmitDailyIn {
    SubmitDailyIn {
      answers: set
        .questions
        .iter()
        .map(|q| DailyAnswerIn { question_id: q.id.clone(), answer: q.is_fact, time_seconds: t })
        .collect(),
    }
  }

  #[test]
  fn submission_must_match_set_exactly() {
    let set: Vec<String> = vec!["a".into(), "b".into()];
    assert!(check_submission(&set, &["b".into(), "a".into()]).is_ok());
    assert!(check_submission(&set, &["a".into()]).is_err());
    assert!(check_submission(&set, &["a".into(), "a".into()]).is_err());
    assert!(check_submission(&set, &["a".into(), "z".into()]).is_err());
  }

  #[tokio::test]
  async fn create_keeps_position_order() {
    let (state, user, qs) = setup().await;
    let created = create_daily_set(&state, create_body(&qs)).await.unwrap();
    let order: Vec<&str> = created.questions.iter().map(|q| q.id.as_str()).collect();
    let expected: Vec<&str> = qs.iter().take(5).map(|q| q.id.as_str()).collect();
    assert_eq!(order, expected);

    let view = today_set(&state, &user, today()).await.unwrap();
    assert_eq!(view.questions.len(), 5);
    assert!(view.entry.is_none());
  }

  #[tokio::test]
  async fn create_rejects_wrong_size_unapproved_and_duplicate_date() {
    let (state, _user, qs) = setup().await;

    let mut short = create_body(&qs);
    short.question_ids.pop();
    assert!(matches!(create_daily_set(&state, short).await, Err(ApiError::BadRequest(_))));

    let mut dup = create_body(&qs);
    dup.question_ids[4] = dup.question_ids[0].clone();
    assert!(matches!(create_daily_set(&state, dup).await, Err(ApiError::BadRequest(_))));

    let draft = state
      .db
      .run(|conn| {
        let cat = fixtures::category(conn, "history");
        Ok(fixtures::question(conn, &cat.id, QuestionStatus::Draft, true))
      })
      .await
      .unwrap();
    let mut unapproved = create_body(&qs);
    unapproved.question_ids[0] = draft.id.clone();
    unapproved.question_ids[1] = "missing-id".into();
    match create_daily_set(&state, unapproved).await {
      Err(ApiError::BadRequest(msg)) => {
        assert!(msg.contains(&draft.id), "{msg}");
        assert!(msg.contains("missing-id"), "{msg}");
      }
      other => panic!("expected 400, got {other:?}"),
    }

    create_daily_set(&state, create_body(&qs)).await.unwrap();
    assert!(matches!(create_daily_set(&state, create_body(&qs)).await, Err(ApiError::Conflict(_))));
  }

  #[tokio::test]
  async fn submit_scores_ranks_and_blocks_resubmission() {
    let (state, user, qs) = setup().await;
    let set = create_daily_set(&state, create_body(&qs)).await.unwrap();

    let out = submit_daily(&state, &user, set.id.clone(), all_correct(&set, 5.0)).await.unwrap();
    assert_eq!(out.correct_answers, 5);
    assert_eq!(out.score, 5 * 125);
    assert_eq!(out.total_time_seconds, 25.0);
    assert_eq!(out.rank, 1);

    let again = submit_daily(&state, &user, set.id.clone(), all_correct(&set, 5.0)).await;
    assert!(matches!(again, Err(ApiError::Conflict(_))));

    let view = today_set(&state, &user, today()).await.unwrap();
    assert_eq!(view.entry.map(|e| e.score), Some(625));

    // Entries now block deleting the set.
    assert!(matches!(delete_daily_set(&state, set.id).await, Err(ApiError::Conflict(_))));
  }

  #[tokio::test]
  async fn submit_rejects_incomplete_answers() {
    let (state, user, qs) = setup().await;
    let set = create_daily_set(&state, create_body(&qs)).await.unwrap();
    let mut body = all_correct(&set, 1.0);
    body.answers.pop();
    assert!(matches!(submit_daily(&state, &user, set.id.clone(), body).await, Err(ApiError::BadRequest(_))));

    let mut foreign = all_correct(&set, 1.0);
    foreign.answers[0].question_id = qs[5].id.clone();
    assert!(matches!(submit_daily(&state, &user, set.id, foreign).await, Err(ApiError::BadRequest(_))));
  }

  #[tokio::test]
  async fn unknown_set_is_404() {
    let (state, user, _) = setup().await;
    let body = SubmitDailyIn { answers: vec![] };
    assert!(matches!(submit_daily(&state, &user, "nope".into(), body).await, Err(ApiError::NotFound(_))));
    assert!(matches!(today_set(&state, &user, today()).await, Err(ApiError::NotFound(_))));
  }

  #[tokio::test]
  async fn empty_set_can_be_deleted() {
    let (state, _user, qs) = setup().await;
    let set = create_daily_set(&state, create_body(&qs)).await.unwrap();
    delete_daily_set(&state, set.id.clone()).await.unwrap();
    assert!(matches!(get_daily_set(&state, set.id).await, Err(ApiError::NotFound(_))));
    let page = list_daily_sets(&state, PageQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
  }
}
