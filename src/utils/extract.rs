//! Extractor wrappers that report rejections through [`AppError`].

use axum::extract::{FromRequest, FromRequestParts};

use crate::utils::error::AppError;

/// JSON body whose parse failures become `400 VALIDATION_ERROR`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose parse failures become `400 VALIDATION_ERROR`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
