//! API error type. Every service returns `Result<_, ApiError>` and handlers let axum
//! turn it into a status code plus the `{ success: false, error: {..} }` envelope.

use axum::{
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  Unauthorized(String),
  #[error("{0}")]
  Forbidden(String),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Conflict(String),
  #[error("{0}")]
  Unavailable(String),
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::BadRequest(_) => "BAD_REQUEST",
      Self::Unauthorized(_) => "UNAUTHORIZED",
      Self::Forbidden(_) => "FORBIDDEN",
      Self::NotFound(_) => "NOT_FOUND",
      Self::Conflict(_) => "CONFLICT",
      Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
      Self::Internal(_) => "INTERNAL_ERROR",
    }
  }

  pub fn bad_request(msg: impl Into<String>) -> Self { Self::BadRequest(msg.into()) }
  pub fn not_found(msg: impl Into<String>) -> Self { Self::NotFound(msg.into()) }
  pub fn conflict(msg: impl Into<String>) -> Self { Self::Conflict(msg.into()) }
}

#[derive(Serialize)]
struct ErrorBody {
  code: &'static str,
  message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
  success: bool,
  error: ErrorBody,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = ErrorEnvelope {
      success: false,
      error: ErrorBody { code: self.code(), message: self.to_string() },
    };
    (status, Json(body)).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rej: JsonRejection) -> Self {
    ApiError::BadRequest(format!("Invalid JSON body: {}", rej.body_text()))
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rej: QueryRejection) -> Self {
    ApiError::BadRequest(format!("Invalid query: {}", rej.body_text()))
  }
}

impl From<PathRejection> for ApiError {
  fn from(rej: PathRejection) -> Self {
    ApiError::BadRequest(format!("Invalid path: {}", rej.body_text()))
  }
}

impl From<DieselError> for ApiError {
  fn from(err: DieselError) -> Self {
    match err {
      DieselError::NotFound => ApiError::NotFound("Record not found".into()),
      DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
        ApiError::Conflict(format!("Already exists: {}", info.message()))
      }
      other => {
        // Internal details stay in the logs.
        error!(target: "trivia_backend", error = %other, "Database error");
        ApiError::Internal("Database error".into())
      }
    }
  }
}

impl From<diesel::r2d2::PoolError> for ApiError {
  fn from(err: diesel::r2d2::PoolError) -> Self {
    error!(target: "trivia_backend", error = %err, "Connection pool error");
    ApiError::Internal("Database unavailable".into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn diesel_not_found_maps_to_404() {
    let e: ApiError = DieselError::NotFound.into();
    assert_eq!(e.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn other_diesel_errors_hide_details() {
    let e: ApiError = DieselError::RollbackTransaction.into();
    assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(e.to_string(), "Database error");
  }

  #[test]
  fn codes_match_status() {
    assert_eq!(ApiError::conflict("x").code(), "CONFLICT");
    assert_eq!(ApiError::Unavailable("x".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
  }
}
