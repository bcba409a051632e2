//! Categories, feature flags and notifications, for both the mobile API and the admin panel.

use std::collections::HashMap;

use tracing::{info, instrument};

use crate::db::models::{Category, CategoryChanges, FeatureFlag, Notification};
use crate::db::{catalog, new_id, now, questions};
use crate::error::ApiError;
use crate::logic::{check_len, check_limit};
use crate::protocol::{CategoryIn, CategoryOut, CategoryPatch, FlagIn, FlagMap, FlagOut, NotificationIn, NotificationOut};
use crate::state::AppState;

pub const DEFAULT_NOTIFICATION_LIMIT: i64 = 20;

/// Lowercase `[a-z0-9-]`, 2..=40 chars.
pub fn is_valid_slug(s: &str) -> bool {
  (2..=40).contains(&s.len()) && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// `[a-z0-9_]`, 2..=64 chars.
pub fn is_valid_flag_key(s: &str) -> bool {
  (2..=64).contains(&s.len()) && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// ---- Categories ----

async fn categories_with_counts(state: &AppState, active_only: bool) -> Result<Vec<CategoryOut>, ApiError> {
  state
    .db
    .run(move |conn| {
      let cats = catalog::list_categories(conn, active_only)?;
      let counts: HashMap<String, i64> = questions::approved_count_by_category(conn)?.into_iter().collect();
      Ok(
        cats
          .iter()
          .map(|c| CategoryOut::new(c, counts.get(&c.id).copied().unwrap_or(0)))
          .collect(),
      )
    })
    .await
}

/// Active categories in display order, with approved question counts.
#[instrument(level = "info", skip(state))]
pub async fn list_categories(state: &AppState) -> Result<Vec<CategoryOut>, ApiError> {
  categories_with_counts(state, true).await
}

#[instrument(level = "info", skip(state))]
pub async fn admin_list_categories(state: &AppState) -> Result<Vec<CategoryOut>, ApiError> {
  categories_with_counts(state, false).await
}

#[instrument(level = "info", skip(state, body), fields(slug = %body.slug))]
pub async fn create_category(state: &AppState, body: CategoryIn) -> Result<CategoryOut, ApiError> {
  let slug = body.slug.trim().to_string();
  if !is_valid_slug(&slug) {
    return Err(ApiError::bad_request("slug must be 2-40 characters of a-z, 0-9 or -"));
  }
  let name = body.name.trim().to_string();
  check_len("name", &name, 1, 60)?;

  let c = Category {
    id: new_id(),
    slug,
    name,
    emoji: body.emoji.unwrap_or_else(|| "❓".into()),
    sort_order: body.sort_order.unwrap_or(0),
    is_active: body.is_active.unwrap_or(true),
    created_at: now(),
  };
  let created = state
    .db
    .run(move |conn| {
      if catalog::find_category_by_slug(conn, &c.slug)?.is_some() {
        return Err(ApiError::conflict(format!("Slug '{}' is already taken", c.slug)));
      }
      catalog::insert_category(conn, &c)?;
      Ok(c)
    })
    .await?;
  info!(target: "admin", category_id = %created.id, slug = %created.slug, "Category created");
  Ok(CategoryOut::new(&created, 0))
}

#[instrument(level = "info", skip(state, body))]
pub async fn update_category(state: &AppState, id: String, body: CategoryPatch) -> Result<CategoryOut, ApiError> {
  let slug = body.slug.map(|s| s.trim().to_string());
  if let Some(s) = &slug {
    if !is_valid_slug(s) {
      return Err(ApiError::bad_request("slug must be 2-40 characters of a-z, 0-9 or -"));
    }
  }
  let name = body.name.map(|s| s.trim().to_string());
  if let Some(n) = &name {
    check_len("name", n, 1, 60)?;
  }
  let changes = CategoryChanges {
    slug,
    name,
    emoji: body.emoji,
    sort_order: body.sort_order,
    is_active: body.is_active,
  };

  state
    .db
    .run(move |conn| {
      if let Some(s) = &changes.slug {
        if let Some(other) = catalog::find_category_by_slug(conn, s)? {
          if other.id != id {
            return Err(ApiError::conflict(format!("Slug '{s}' is already taken")));
          }
        }
      }
      // An empty changeset is a diesel error; treat it as a read.
      let c = if changes.slug.is_none()
        && changes.name.is_none()
        && changes.emoji.is_none()
        && changes.sort_order.is_none()
        && changes.is_active.is_none()
      {
        catalog::get_category(conn, &id)?
      } else {
        catalog::update_category(conn, &id, &changes)?
      };
      let count = questions::approved_count_by_category(conn)?
        .into_iter()
        .find(|(cid, _)| cid == &c.id)
        .map(|(_, n)| n)
        .unwrap_or(0);
      Ok(CategoryOut::new(&c, count))
    })
    .await
}

#[instrument(level = "info", skip(state))]
pub async fn delete_category(state: &AppState, id: String) -> Result<(), ApiError> {
  let deleted = id.clone();
  state
    .db
    .run(move |conn| {
      catalog::get_category(conn, &id)?;
      let n = questions::count_in_category(conn, &id)?;
      if n > 0 {
        return Err(ApiError::conflict(format!("Category still has {n} questions")));
      }
      catalog::delete_category(conn, &id)
    })
    .await?;
  info!(target: "admin", category_id = %deleted, "Category deleted");
  Ok(())
}

// ---- Feature flags ----

#[instrument(level = "info", skip(state))]
pub async fn feature_flags(state: &AppState) -> Result<FlagMap, ApiError> {
  let flags = state.db.run(catalog::list_flags).await?;
  Ok(flags.into_iter().map(|f| (f.key, f.enabled)).collect())
}

#[instrument(level = "info", skip(state))]
pub async fn admin_list_flags(state: &AppState) -> Result<Vec<FlagOut>, ApiError> {
  let flags = state.db.run(catalog::list_flags).await?;
  Ok(flags.into_iter().map(FlagOut::from).collect())
}

/// Create or replace a flag. A missing description keeps the stored one.
#[instrument(level = "info", skip(state, body), fields(enabled = body.enabled))]
pub async fn upsert_flag(state: &AppState, key: String, body: FlagIn) -> Result<FlagOut, ApiError> {
  if !is_valid_flag_key(&key) {
    return Err(ApiError::bad_request("flag key must be 2-64 characters of a-z, 0-9 or _"));
  }
  if let Some(d) = &body.description {
    check_len("description", d, 0, 500)?;
  }
  let flag = state
    .db
    .run(move |conn| {
      let description = match body.description {
        Some(d) => d,
        None => catalog::find_flag(conn, &key)?.map(|f| f.description).unwrap_or_default(),
      };
      let flag = FeatureFlag { key, enabled: body.enabled, description, updated_at: now() };
      catalog::upsert_flag(conn, &flag)?;
      Ok(flag)
    })
    .await?;
  info!(target: "admin", key = %flag.key, enabled = flag.enabled, "Feature flag saved");
  Ok(flag.into())
}

#[instrument(level = "info", skip(state))]
pub async fn delete_flag(state: &AppState, key: String) -> Result<(), ApiError> {
  state.db.run(move |conn| catalog::delete_flag(conn, &key)).await
}

// ---- Notifications ----

#[instrument(level = "info", skip(state))]
pub async fn notifications(state: &AppState, limit: Option<i64>) -> Result<Vec<NotificationOut>, ApiError> {
  let limit = limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);
  check_limit(limit)?;
  let rows = state.db.run(move |conn| catalog::recent_notifications(conn, limit)).await?;
  Ok(rows.into_iter().map(NotificationOut::from).collect())
}

#[instrument(level = "info", skip(state, body))]
pub async fn create_notification(state: &AppState, body: NotificationIn) -> Result<NotificationOut, ApiError> {
  let title = body.title.trim().to_string();
  let text = body.body.trim().to_string();
  check_len("title", &title, 1, 120)?;
  check_len("body", &text, 1, 1000)?;
  let n = Notification { id: new_id(), title, body: text, created_at: now() };
  let n = state
    .db
    .run(move |conn| {
      catalog::insert_notification(conn, &n)?;
      Ok(n)
    })
    .await?;
  info!(target: "admin", notification_id = %n.id, "Notification created");
  Ok(n.into())
}

#[instrument(level = "info", skip(state))]
pub async fn delete_notification(state: &AppState, id: String) -> Result<(), ApiError> {
  state.db.run(move |conn| catalog::delete_notification(conn, &id)).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::fixtures;
  use crate::domain::QuestionStatus;

  fn cat_in(slug: &str) -> CategoryIn {
    CategoryIn { slug: slug.into(), name: "Name".into(), emoji: None, sort_order: None, is_active: None }
  }

  #[test]
  fn slug_and_key_rules() {
    assert!(is_valid_slug("pop-culture"));
    assert!(!is_valid_slug("Pop"));
    assert!(!is_valid_slug("a"));
    assert!(!is_valid_slug("under_score"));
    assert!(is_valid_flag_key("free_play"));
    assert!(!is_valid_flag_key("free-play"));
  }

  #[tokio::test]
  async fn categories_are_ordered_and_counted() {
    let state = AppState::for_tests();
    state
      .db
      .run(|conn| {
        let science = fixtures::category(conn, "science");
        fixtures::question(conn, &science.id, QuestionStatus::Approved, true);
        fixtures::question(conn, &science.id, QuestionStatus::Draft, true);
        let hidden = fixtures::category(conn, "hidden");
        catalog::update_category(conn, &hidden.id, &CategoryChanges { is_active: Some(false), ..Default::default() })?;
        Ok(())
      })
      .await
      .unwrap();

    let public = list_categories(&state).await.unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].slug, "science");
    assert_eq!(public[0].question_count, 1);
    assert_eq!(admin_list_categories(&state).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn category_slug_conflicts_and_delete_guard() {
    let state = AppState::for_tests();
    let c = create_category(&state, cat_in("trivia")).await.unwrap();
    assert!(matches!(create_category(&state, cat_in("trivia")).await, Err(ApiError::Conflict(_))));
    assert!(matches!(create_category(&state, cat_in("Bad Slug")).await, Err(ApiError::BadRequest(_))));

    let cid = c.id.clone();
    state.db.run(move |conn| Ok(fixtures::question(conn, &cid, QuestionStatus::Draft, true))).await.unwrap();
    assert!(matches!(delete_category(&state, c.id.clone()).await, Err(ApiError::Conflict(_))));

    let renamed = update_category(&state, c.id, CategoryPatch { name: Some("Trivia!".into()), ..Default::default() }).await.unwrap();
    assert_eq!(renamed.name, "Trivia!");
  }

  #[tokio::test]
  async fn flags_upsert_and_map() {
    let state = AppState::for_tests();
    upsert_flag(&state, "free_play".into(), FlagIn { enabled: true, description: Some("Free play".into()) }).await.unwrap();
    let f = upsert_flag(&state, "free_play".into(), FlagIn { enabled: false, description: None }).await.unwrap();
    assert_eq!(f.description, "Free play");
    assert!(!f.enabled);

    let map = feature_flags(&state).await.unwrap();
    assert_eq!(map.get("free_play"), Some(&false));

    delete_flag(&state, "free_play".into()).await.unwrap();
    assert!(matches!(delete_flag(&state, "free_play".into()).await, Err(ApiError::NotFound(_))));
    assert!(matches!(
      upsert_flag(&state, "Bad Key".into(), FlagIn { enabled: true, description: None }).await,
      Err(ApiError::BadRequest(_))
    ));
  }

  #[tokio::test]
  async fn notifications_validate_and_list_newest_first() {
    let state = AppState::for_tests();
    let bad = NotificationIn { title: " ".into(), body: "x".into() };
    assert!(matches!(create_notification(&state, bad).await, Err(ApiError::BadRequest(_))));

    create_notification(&state, NotificationIn { title: "First".into(), body: "one".into() }).await.unwrap();
    let second = create_notification(&state, NotificationIn { title: "Second".into(), body: "two".into() }).await.unwrap();
    let list = notifications(&state, Some(1)).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, second.id);

    delete_notification(&state, second.id).await.unwrap();
    assert_eq!(notifications(&state, None).await.unwrap().len(), 1);
  }
}
