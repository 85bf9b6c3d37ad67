//! Extractor wrappers that report rejections through [`ApiError`], so a
//! malformed body, path or query string gets the usual 400 error body.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer, de::Error as _};

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Deserialize an optional integer sent either as a JSON number or as a
/// numeric string (`"3"`), as web form front ends do.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum NumberOrString {
    Number(i64),
    String(String),
  }

  match Option::<NumberOrString>::deserialize(deserializer)? {
    None => Ok(None),
    Some(NumberOrString::Number(n)) => Ok(Some(n)),
    Some(NumberOrString::String(s)) => s
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
  }
}
