use std::convert::Infallible;

use serde::Serialize;
use thiserror::Error;
use warp::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    reject::{self, Reject, Rejection},
    reply::{self, Reply, Response},
};

use crate::{
    accounts::AccountError,
    error::{StoreError, ValidationError},
    token::AuthError,
};

/// Every failure a handler can produce. Raised as a warp rejection and
/// rendered by [`handle_rejection`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(AuthError),
    #[error("Not found.")]
    NotFound,
    #[error(transparent)]
    Invalid(ValidationError),
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    Internal(String),
}

impl Reject for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { field, .. } => {
                Self::Invalid(ValidationError::field(field, value.to_string()))
            }
            StoreError::Query(info) => Self::Internal(info),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Store(e) => e.into(),
            e => Self::Auth(e),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::MissingEmail | AccountError::InvalidEmail => {
                Self::Invalid(ValidationError::field("email", value.to_string()))
            }
            AccountError::Hash(info) => Self::Internal(info),
            AccountError::Store(e) => e.into(),
        }
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

#[derive(Serialize)]
struct Detail<'a> {
    detail: &'a str,
}

fn detail(status: StatusCode, message: &str) -> Response {
    reply::with_status(reply::json(&Detail { detail: message }), status).into_response()
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Invalid(_) | ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> Response {
        match self {
            ApiError::Auth(e) => {
                let mut response = detail(self.status(), &e.to_string());
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
                response
            }
            ApiError::Invalid(errors) => {
                reply::with_status(reply::json(errors), self.status()).into_response()
            }
            ApiError::Internal(info) => {
                log::error!("Internal error: {info}");
                detail(self.status(), "A server error occurred.")
            }
            e => detail(self.status(), &e.to_string()),
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<ApiError>() {
        return Ok(e.to_response());
    }
    if err.find::<reject::PayloadTooLarge>().is_some() {
        return Ok(detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large."));
    }
    if err.find::<reject::LengthRequired>().is_some() {
        return Ok(detail(StatusCode::LENGTH_REQUIRED, "Content-Length is required."));
    }
    if let Some(e) = err.find::<reject::InvalidQuery>() {
        return Ok(detail(StatusCode::BAD_REQUEST, &e.to_string()));
    }
    if let Some(e) = err.find::<reject::InvalidHeader>() {
        return Ok(detail(StatusCode::BAD_REQUEST, &e.to_string()));
    }
    // Sibling routes on the same path leave this behind for any method.
    if err.find::<reject::MethodNotAllowed>().is_some() {
        return Ok(detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed."));
    }
    if err.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, "Not found."));
    }

    log::error!("Unhandled rejection: {err:?}");
    Ok(detail(
        StatusCode::INTERNAL_SERVER_ERROR,
        "A server error occurred.",
    ))
}
