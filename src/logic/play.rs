//! Free play: the anti-repeat random draw and single-question answers.
//!
//! The draw pool is approved questions matching the player's filters, minus:
//!   - the last `HISTORY_LIMIT` questions they answered,
//!   - the last `HISTORY_LIMIT` questions they were served,
//!   - today's daily set (free play must not spoil it).
//!
//! When that leaves nothing, the history exclusions are dropped but the daily set stays
//! excluded. Every served question is recorded as a view.

use chrono::NaiveDate;
use diesel::SqliteConnection;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::db::models::{Answer, NewQuestionView, Question, User};
use crate::db::questions::{self, DrawFilter};
use crate::db::{daily_sets, new_id, now};
use crate::domain::{score_answer, valid_answer_time, Difficulty, QuestionStatus};
use crate::error::ApiError;
use crate::logic::non_blank;
use crate::protocol::{AnswerIn, AnswerOut, PlayQuestionOut, RandomQuery};
use crate::state::AppState;

/// Bound on each of the answered/served history lists.
pub const HISTORY_LIMIT: i64 = 500;

/// Ids kept out of a player's draw pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exclusions {
  /// Recently answered plus recently served, deduplicated.
  pub history: Vec<String>,
  /// Today's daily set questions.
  pub daily: Vec<String>,
}

impl Exclusions {
  pub fn all(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.history.iter().chain(self.daily.iter()).cloned().collect();
    ids.sort();
    ids.dedup();
    ids
  }
}

pub fn excluded_question_ids(conn: &mut SqliteConnection, user_id: &str, today: NaiveDate) -> Result<Exclusions, ApiError> {
  let mut history = questions::recent_answered_ids(conn, user_id, HISTORY_LIMIT)?;
  history.extend(questions::recent_served_ids(conn, user_id, HISTORY_LIMIT)?);
  history.sort();
  history.dedup();

  let daily = match daily_sets::find_by_date(conn, today)? {
    Some(set) => daily_sets::question_ids(conn, &set.id)?,
    None => Vec::new(),
  };
  Ok(Exclusions { history, daily })
}

/// Uniform pick from the pool: count, random offset, fetch one row in id order.
fn draw<R: Rng + ?Sized>(
  conn: &mut SqliteConnection,
  rng: &mut R,
  filter: &DrawFilter,
  excluded: &[String],
) -> Result<Option<Question>, ApiError> {
  let n = questions::count_pool(conn, filter, excluded)?;
  if n == 0 {
    return Ok(None);
  }
  let offset = rng.gen_range(0..n);
  questions::nth_in_pool(conn, filter, excluded, offset)
}

/// Parse the optional filters of the random endpoint.
pub fn draw_filter(q: RandomQuery) -> Result<DrawFilter, ApiError> {
  let difficulty = match non_blank(q.difficulty) {
    Some(d) => Some(Difficulty::parse(&d).ok_or_else(|| ApiError::bad_request(format!("Unknown difficulty '{d}'")))?),
    None => None,
  };
  Ok(DrawFilter { category_id: non_blank(q.category_id), difficulty })
}

#[instrument(level = "info", skip(state, user), fields(user_id = %user.id, category = ?filter.category_id, difficulty = ?filter.difficulty))]
pub async fn random_question(
  state: &AppState,
  user: &User,
  filter: DrawFilter,
  today: NaiveDate,
) -> Result<PlayQuestionOut, ApiError> {
  let uid = user.id.clone();
  let (question, recycled) = state
    .db
    .run(move |conn| {
      let excl = excluded_question_ids(conn, &uid, today)?;
      let mut rng = rand::thread_rng();

      let mut recycled = false;
      let mut picked = draw(conn, &mut rng, &filter, &excl.all())?;
      if picked.is_none() && !excl.history.is_empty() {
        recycled = true;
        picked = draw(conn, &mut rng, &filter, &excl.daily)?;
      }
      let question = picked.ok_or_else(|| ApiError::not_found("No questions available for these filters"))?;

      questions::record_view(conn, &NewQuestionView {
        id: new_id(),
        user_id: uid.clone(),
        question_id: question.id.clone(),
        served_at: now(),
      })?;
      Ok((question, recycled))
    })
    .await?;

  if recycled {
    warn!(target: "play", user_id = %user.id, question_id = %question.id, "Pool exhausted; served a previously seen question");
  } else {
    debug!(target: "play", user_id = %user.id, question_id = %question.id, "Served question");
  }
  Ok(PlayQuestionOut::from(&question))
}

/// Free-play answer. Today's daily set questions are not answerable here; the reply
/// reveals the truth value.
#[instrument(level = "info", skip(state, user, body), fields(user_id = %user.id, %question_id))]
pub async fn answer_question(
  state: &AppState,
  user: &User,
  question_id: String,
  body: AnswerIn,
  today: NaiveDate,
) -> Result<AnswerOut, ApiError> {
  let uid = user.id.clone();
  let out = state
    .db
    .run(move |conn| {
      let q = questions::get(conn, &question_id)?;
      if q.status() != QuestionStatus::Approved {
        return Err(ApiError::not_found(format!("Question {question_id} not found")));
      }
      if let Some(set) = daily_sets::find_by_date(conn, today)? {
        if daily_sets::question_ids(conn, &set.id)?.contains(&q.id) {
          return Err(ApiError::not_found(format!("Question {question_id} not found")));
        }
      }
      if !valid_answer_time(body.time_seconds) {
        return Err(ApiError::bad_request("timeSeconds must be between 0 and 3600"));
      }

      let is_correct = body.answer == q.is_fact;
      let score = score_answer(is_correct, body.time_seconds);
      questions::insert_answers(conn, &[Answer {
        id: new_id(),
        user_id: uid,
        question_id: q.id.clone(),
        daily_set_id: None,
        answer: body.answer,
        is_correct,
        time_seconds: body.time_seconds,
        score,
        answered_at: now(),
      }])?;

      Ok(AnswerOut {
        question_id: q.id,
        is_correct,
        is_fact: q.is_fact,
        explanation: q.explanation,
        score,
      })
    })
    .await?;

  info!(target: "play", user_id = %user.id, question_id = %out.question_id, correct = out.is_correct, score = out.score, "Answer recorded");
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::fixtures;
  use crate::db::models::DailySet;
  use std::collections::HashSet;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
  }

  async fn seeded(n: usize) -> (AppState, User, Vec<Question>) {
    let state = AppState::for_tests();
    let (user, qs) = state
      .db
      .run(move |conn| {
        let cat = fixtures::category(conn, "science");
        let qs: Vec<Question> = (0..n).map(|i| fixtures::question(conn, &cat.id, QuestionStatus::Approved, i % 2 == 0)).collect();
        fixtures::question(conn, &cat.id, QuestionStatus::Draft, true);
        let user = fixtures::user(conn, "device-play-0001", "Player_1");
        Ok((user, qs))
      })
      .await
      .unwrap();
    (state, user, qs)
  }

  #[tokio::test]
  async fn draws_never_repeat_until_pool_exhausted() {
    let (state, user, qs) = seeded(4).await;
    let mut seen = HashSet::new();
    for _ in 0..4 {
      let q = random_question(&state, &user, DrawFilter::default(), today()).await.unwrap();
      assert!(seen.insert(q.id.clone()), "repeated {}", q.id);
    }
    let approved: HashSet<String> = qs.iter().map(|q| q.id.clone()).collect();
    assert_eq!(seen, approved);

    // History is exhausted: the draw falls back to previously seen questions.
    let again = random_question(&state, &user, DrawFilter::default(), today()).await.unwrap();
    assert!(approved.contains(&again.id));
  }

  #[tokio::test]
  async fn answered_questions_are_excluded() {
    let (state, user, qs) = seeded(2).await;
    answer_question(&state, &user, qs[0].id.clone(), AnswerIn { answer: true, time_seconds: 3.0 }, today()).await.unwrap();
    let q = random_question(&state, &user, DrawFilter::default(), today()).await.unwrap();
    assert_eq!(q.id, qs[1].id);
  }

  #[tokio::test]
  async fn daily_set_questions_stay_excluded_in_fallback() {
    let (state, user, qs) = seeded(5).await;
    let ids: Vec<String> = qs.iter().map(|q| q.id.clone()).collect();
    state
      .db
      .run(move |conn| {
        let set = DailySet { id: new_id(), set_date: today(), title: None, created_at: now() };
        daily_sets::insert(conn, &set, &ids)
      })
      .await
      .unwrap();

    let err = random_question(&state, &user, DrawFilter::default(), today()).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn todays_daily_questions_cannot_be_answered_in_free_play() {
    let (state, user, qs) = seeded(6).await;
    let ids: Vec<String> = qs[..5].iter().map(|q| q.id.clone()).collect();
    state
      .db
      .run(move |conn| {
        let set = DailySet { id: new_id(), set_date: today(), title: None, created_at: now() };
        daily_sets::insert(conn, &set, &ids)
      })
      .await
      .unwrap();

    let body = || AnswerIn { answer: true, time_seconds: 1.0 };
    for q in &qs[..5] {
      let res = answer_question(&state, &user, q.id.clone(), body(), today()).await;
      assert!(matches!(res, Err(ApiError::NotFound(_))), "daily question {} was answerable", q.id);
    }
    // Outside the daily set, and on other days, free play still works.
    assert!(answer_question(&state, &user, qs[5].id.clone(), body(), today()).await.is_ok());
    let tomorrow = today().succ_opt().unwrap();
    assert!(answer_question(&state, &user, qs[0].id.clone(), body(), tomorrow).await.is_ok());
  }

  #[tokio::test]
  async fn empty_pool_is_404() {
    let (state, user, _) = seeded(1).await;
    let filter = DrawFilter { category_id: Some("missing".into()), difficulty: None };
    assert!(matches!(random_question(&state, &user, filter, today()).await, Err(ApiError::NotFound(_))));
  }

  #[tokio::test]
  async fn incorrect_answer_scores_zero_and_reveals_truth() {
    let (state, user, qs) = seeded(1).await;
    let truth = qs[0].is_fact;
    let out = answer_question(&state, &user, qs[0].id.clone(), AnswerIn { answer: !truth, time_seconds: 0.5 }, today()).await.unwrap();
    assert!(!out.is_correct);
    assert_eq!(out.score, 0);
    assert_eq!(out.is_fact, truth);
    assert_eq!(out.explanation, "Because.");
  }

  #[tokio::test]
  async fn fast_correct_answer_gets_bonus() {
    let (state, user, qs) = seeded(1).await;
    let out = answer_question(&state, &user, qs[0].id.clone(), AnswerIn { answer: qs[0].is_fact, time_seconds: 2.0 }, today()).await.unwrap();
    assert!(out.is_correct);
    assert_eq!(out.score, 140);
  }

  #[tokio::test]
  async fn answering_draft_or_unknown_is_404_and_bad_time_is_400() {
    let (state, user, qs) = seeded(1).await;
    let draft = state
      .db
      .run(|conn| {
        let cat = fixtures::category(conn, "history");
        Ok(fixtures::question(conn, &cat.id, QuestionStatus::Draft, true))
      })
      .await
      .unwrap();
    let body = || AnswerIn { answer: true, time_seconds: 1.0 };
    assert!(matches!(answer_question(&state, &user, draft.id, body(), today()).await, Err(ApiError::NotFound(_))));
    assert!(matches!(answer_question(&state, &user, "nope".into(), body(), today()).await, Err(ApiError::NotFound(_))));

    let bad = AnswerIn { answer: true, time_seconds: -1.0 };
    assert!(matches!(answer_question(&state, &user, qs[0].id.clone(), bad, today()).await, Err(ApiError::BadRequest(_))));
  }

  #[test]
  fn filter_parsing() {
    let f = draw_filter(RandomQuery { category_id: Some(" ".into()), difficulty: Some("hard".into()) }).unwrap();
    assert_eq!(f.category_id, None);
    assert_eq!(f.difficulty, Some(Difficulty::Hard));
    assert!(draw_filter(RandomQuery { category_id: None, difficulty: Some("insane".into()) }).is_err());
  }
}
