use std::future::Future;

use serde_json::Value;
use warp::{hyper::body::Bytes, reject::Rejection, reply::Response, Filter};

use crate::{
    constants::MAX_BODY_BYTES,
    error::ValidationError,
    form::{value_kind, FormData},
    schema::Id,
};

use super::error::ApiError;

/// JSON object body. An empty body reads as `{}`.
pub fn form_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|body: Bytes| async move { parse_form(&body).map_err(Rejection::from) })
}

pub fn parse_form(body: &[u8]) -> Result<FormData, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FormData::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(data)) => Ok(data),
        Ok(other) => Err(ValidationError::non_field(format!(
            "Invalid data. Expected a dictionary, but got {}.",
            value_kind(&other)
        ))
        .into()),
        Err(e) => Err(ApiError::Malformed(format!("JSON parse error - {e}"))),
    }
}

/// Adapts a handler result to what `and_then` expects.
pub async fn respond(
    handler: impl Future<Output = Result<Response, ApiError>>,
) -> Result<Response, Rejection> {
    handler.await.map_err(Rejection::from)
}

/// Fallback for a form that validated cleanly yet lacks a required value.
pub fn incomplete() -> ApiError {
    ValidationError::non_field("Invalid data.").into()
}

/// Comma separated ids from a query parameter. Absent or empty means no
/// filter.
pub fn id_list(field: &str, raw: Option<&String>) -> Result<Option<Vec<Id>>, ValidationError> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };

    raw.split(',')
        .map(|part| part.trim().parse::<Id>())
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
        .map_err(|_| ValidationError::field(field, "Enter a comma separated list of integers."))
}

/// `0`/`1` query flag, absent meaning `false`.
pub fn flag(field: &str, raw: Option<&String>) -> Result<bool, ValidationError> {
    match raw.map(|raw| raw.trim()) {
        None | Some("") | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(_) => Err(ValidationError::field(field, "Select either 0 or 1.")),
    }
}
