//! Extractors whose rejections answer with the API error body

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON request body; a malformed body becomes `BAD_REQUEST`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters; an unparsable segment becomes `BAD_REQUEST`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
