//! Caller identity extractor.
//!
//! The requester is named by the `X-Requester-Id` header. The one
//! administrator is whoever carries the configured admin id; there is no
//! further authentication.

use axum::{extract::FromRequestParts, http::request::Parts};
use tablebook_core::{
  booking::{CancelScope, RequesterId},
  clock::Clock,
  store::BookingStore,
};

use crate::{AppState, error::ApiError};

pub const REQUESTER_HEADER: &str = "x-requester-id";

/// The identity a request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
  pub requester_id: RequesterId,
  pub is_admin:     bool,
}

impl Caller {
  pub fn cancel_scope(&self) -> CancelScope {
    if self.is_admin {
      CancelScope::Admin
    } else {
      CancelScope::Owner(self.requester_id)
    }
  }

  pub fn require_admin(&self) -> Result<(), ApiError> {
    if self.is_admin { Ok(()) } else { Err(ApiError::Forbidden) }
  }
}

impl<S, C> FromRequestParts<AppState<S, C>> for Caller
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, C>,
  ) -> Result<Self, Self::Rejection> {
    let requester_id = parts
      .headers
      .get(REQUESTER_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| s.trim().parse::<RequesterId>().ok())
      .ok_or(ApiError::Unauthenticated)?;

    Ok(Caller {
      requester_id,
      is_admin: state.admin_id == Some(requester_id),
    })
  }
}
