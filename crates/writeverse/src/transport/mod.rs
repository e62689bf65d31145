//! Transport to the platform's HTTP endpoints.
//!
//! Everything that talks to the server goes through the [`Transport`] trait so
//! the API layer and secure sessions can be exercised against a fake.

mod http;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

pub use http::HttpTransport;

/// Body of a POST request.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `application/json` body.
    Json(Value),
    /// `application/x-www-form-urlencoded` body.
    Form(Vec<(String, String)>),
    /// No body.
    Empty,
}

/// A way to POST to the platform and get JSON back.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` to `path` (relative to the platform base URL).
    ///
    /// Implementations return the decoded JSON body of a successful response
    /// after passing it through [`check_success`].
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, non-success status, non-JSON
    /// body, or a body with `success: false`.
    async fn post(&self, path: &str, payload: Payload) -> Result<Value>;

    /// POST `payload` the way a plain HTML form does, following the redirect
    /// the server answers with.
    ///
    /// Returns the path (relative to the base URL) of the page the request
    /// landed on. The body of that page is not inspected.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or a non-success status.
    async fn post_form(&self, path: &str, payload: Payload) -> Result<String>;
}

/// Turn a `success: false` body into [`Error::Server`].
///
/// Bodies without a `success` field pass through unchanged; several endpoints
/// omit it.
///
/// # Errors
///
/// Returns [`Error::Server`] when the body reports failure.
pub fn check_success(body: Value) -> Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message =
            failure_message(&body).unwrap_or_else(|| "request failed".to_string());
        return Err(Error::Server { message });
    }
    Ok(body)
}

/// The human-readable failure text of a response body (`message`, else
/// `error`).
#[must_use]
pub fn failure_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
