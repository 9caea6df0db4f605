//! Request body extractors.
//!
//! `ApiJson<T>` behaves like axum's `Json<T>` but rejects malformed or
//! mistyped bodies with the same `ApiError` envelope as every other failure.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON request body whose rejection is an [`ApiError`] (`INVALID_INPUT`).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
