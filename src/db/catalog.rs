//! Categories, feature flags and in-app notifications. Plain CRUD.

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::db::models::{Category, CategoryChanges, FeatureFlag, Notification};
use crate::db::schema::{categories, feature_flags, notifications};
use crate::error::ApiError;

// ---- Categories ----

pub fn insert_category(conn: &mut SqliteConnection, c: &Category) -> Result<(), ApiError> {
  diesel::insert_into(categories::table).values(c).execute(conn)?;
  Ok(())
}

pub fn get_category(conn: &mut SqliteConnection, id: &str) -> Result<Category, ApiError> {
  categories::table
    .find(id)
    .select(Category::as_select())
    .first(conn)
    .optional()?
    .ok_or_else(|| ApiError::not_found(format!("Category {id} not found")))
}

pub fn find_category_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<Option<Category>, ApiError> {
  Ok(
    categories::table
      .filter(categories::slug.eq(slug))
      .select(Category::as_select())
      .first(conn)
      .optional()?,
  )
}

pub fn list_categories(conn: &mut SqliteConnection, active_only: bool) -> Result<Vec<Category>, ApiError> {
  let mut q: categories::BoxedQuery<'_, Sqlite> = categories::table.into_boxed();
  if active_only {
    q = q.filter(categories::is_active.eq(true));
  }
  Ok(
    q.order((categories::sort_order.asc(), categories::name.asc()))
      .select(Category::as_select())
      .load(conn)?,
  )
}

pub fn update_category(conn: &mut SqliteConnection, id: &str, changes: &CategoryChanges) -> Result<Category, ApiError> {
  let n = diesel::update(categories::table.find(id)).set(changes).execute(conn)?;
  if n == 0 {
    return Err(ApiError::not_found(format!("Category {id} not found")));
  }
  get_category(conn, id)
}

pub fn delete_category(conn: &mut SqliteConnection, id: &str) -> Result<(), ApiError> {
  let n = diesel::delete(categories::table.find(id)).execute(conn)?;
  if n == 0 {
    return Err(ApiError::not_found(format!("Category {id} not found")));
  }
  Ok(())
}

pub fn count_categories(conn: &mut SqliteConnection) -> Result<i64, ApiError> {
  Ok(categories::table.select(count_star()).first(conn)?)
}

// ---- Feature flags ----

pub fn list_flags(conn: &mut SqliteConnection) -> Result<Vec<FeatureFlag>, ApiError> {
  Ok(
    feature_flags::table
      .order(feature_flags::key.asc())
      .select(FeatureFlag::as_select())
      .load(conn)?,
  )
}

/// Insert or replace by key.
pub fn upsert_flag(conn: &mut SqliteConnection, flag: &FeatureFlag) -> Result<(), ApiError> {
  diesel::insert_into(feature_flags::table)
    .values(flag)
    .on_conflict(feature_flags::key)
    .do_update()
    .set((
      feature_flags::enabled.eq(flag.enabled),
      feature_flags::description.eq(&flag.description),
      feature_flags::updated_at.eq(flag.updated_at),
    ))
    .execute(conn)?;
  Ok(())
}

pub fn find_flag(conn: &mut SqliteConnection, key: &str) -> Result<Option<FeatureFlag>, ApiError> {
  Ok(
    feature_flags::table
      .find(key)
      .select(FeatureFlag::as_select())
      .first(conn)
      .optional()?,
  )
}

pub fn delete_flag(conn: &mut SqliteConnection, key: &str) -> Result<(), ApiError> {
  let n = diesel::delete(feature_flags::table.find(key)).execute(conn)?;
  if n == 0 {
    return Err(ApiError::not_found(format!("Feature flag '{key}' not found")));
  }
  Ok(())
}

// ---- Notifications ----

pub fn insert_notification(conn: &mut SqliteConnection, n: &Notification) -> Result<(), ApiError> {
  diesel::insert_into(notifications::table).values(n).execute(conn)?;
  Ok(())
}

pub fn recent_notifications(conn: &mut SqliteConnection, limit: i64) -> Result<Vec<Notification>, ApiError> {
  Ok(
    notifications::table
      .order(notifications::created_at.desc())
      .limit(limit)
      .select(Notification::as_select())
      .load(conn)?,
  )
}

pub fn delete_notification(conn: &mut SqliteConnection, id: &str) -> Result<(), ApiError> {
  let n = diesel::delete(notifications::table.find(id)).execute(conn)?;
  if n == 0 {
    return Err(ApiError::not_found(format!("Notification {id} not found")));
  }
  Ok(())
}
