//! reqwest-backed transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderName;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use super::{check_success, failure_message, Payload, Transport};
use crate::config::ServerConfig;
use crate::csrf;
use crate::error::{Error, Result};

/// Name of the platform's authenticated session cookie.
const SESSION_COOKIE_NAME: &str = "sessionid";

/// Header marking a request as AJAX; the platform answers JSON only then.
const AJAX_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// Transport over HTTP with a shared cookie jar.
///
/// The CSRF token is read from the jar on every request and echoed in the
/// configured header. If the jar holds no token yet, one GET to the base URL
/// lets the server set it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    csrf_cookie: String,
    csrf_header: HeaderName,
}

impl HttpTransport {
    /// Build a transport from server configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or header name is invalid, or the
    /// HTTP client cannot be built.
    pub fn new(config: &ServerConfig, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid base_url '{}': {e}", config.base_url),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        if let Some(session) = &config.session_cookie {
            jar.add_cookie_str(&format!("{SESSION_COOKIE_NAME}={session}"), &base_url);
        }
        if let Some(cookies) = &config.cookies {
            for pair in cookies.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                jar.add_cookie_str(pair, &base_url);
            }
        }

        let csrf_header =
            HeaderName::from_bytes(config.csrf_header.as_bytes()).map_err(|e| {
                Error::ConfigValidation {
                    message: format!("invalid csrf_header '{}': {e}", config.csrf_header),
                }
            })?;

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url,
            csrf_cookie: config.csrf_cookie.clone(),
            csrf_header,
        })
    }

    /// The base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the path cannot form a URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::validation(format!("invalid endpoint path '{path}': {e}")))
    }

    /// The CSRF token currently held in the cookie jar.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let cookies = header.to_str().ok()?;
        csrf::cookie_value(cookies, &self.csrf_cookie)
    }

    async fn ensure_csrf_token(&self) -> Result<String> {
        if let Some(token) = self.csrf_token() {
            return Ok(token);
        }

        debug!(url = %self.base_url, "no CSRF cookie yet; fetching base page");
        self.client
            .get(self.base_url.clone())
            .send()
            .await?
            .error_for_status()?;

        self.csrf_token().ok_or_else(|| Error::MissingCsrfToken {
            cookie: self.csrf_cookie.clone(),
        })
    }

    async fn send(&self, path: &str, payload: Payload) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        let token = self.ensure_csrf_token().await?;

        let request = self
            .client
            .post(url.clone())
            .header(AJAX_HEADER.0, AJAX_HEADER.1)
            .header(self.csrf_header.clone(), token);
        let request = match payload {
            Payload::Json(body) => request.json(&body),
            Payload::Form(fields) => request.form(&fields),
            Payload::Empty => request,
        };

        debug!(%url, "POST");
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .as_ref()
            .and_then(failure_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        warn!(%url, status = status.as_u16(), "request failed");
        Err(Error::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, payload: Payload) -> Result<Value> {
        let response = self.send(path, payload).await?;
        let status = response.status();
        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body).map_err(|_| Error::Http {
            status: status.as_u16(),
            message: "response was not JSON (is the session cookie valid?)".to_string(),
        })?;
        check_success(value)
    }

    async fn post_form(&self, path: &str, payload: Payload) -> Result<String> {
        let response = self.send(path, payload).await?;
        let landed = response.url();
        let relative = self
            .base_url
            .make_relative(landed)
            .unwrap_or_else(|| landed.path().trim_start_matches('/').to_string());
        debug!(landed = %landed, "form accepted");
        Ok(relative)
    }
}
