//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tablebook_core::Error as CoreError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("missing or invalid X-Requester-Id header")]
  Unauthenticated,

  #[error("administrator access required")]
  Forbidden,
}

impl ApiError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Core(CoreError::validation(message))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(CoreError::Validation(_)) => StatusCode::BAD_REQUEST,
      ApiError::Core(CoreError::Conflict { .. }) => StatusCode::CONFLICT,
      ApiError::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
      ApiError::Core(CoreError::Storage(_)) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::validation(format!("invalid request body: {}", rejection.body_text()))
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::validation(format!("invalid path: {}", rejection.body_text()))
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::validation(format!("invalid query string: {}", rejection.body_text()))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Core(CoreError::Storage(e)) => {
        tracing::error!(error = %e, "storage failure");
        "storage temporarily unavailable, retry later".to_owned()
      }
      ApiError::Core(CoreError::Conflict { .. }) => {
        "this table is already booked for that time".to_owned()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
  }
}
