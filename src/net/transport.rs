//! Transport seam between the client pipeline and the network.
//!
//! A transport returns `Ok` for every response that reached the client,
//! whatever its status; `Err(ApiError::Network)` means no response at all.
//! Status interpretation belongs to the client, so test transports only
//! have to script `(status, body)` pairs.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::cookies::PersistentJar;
use super::error::ApiError;
use super::request::{ApiRequest, ApiResponse, Method};
use crate::config::ClientConfig;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

// =============================================================================
// REQWEST
// =============================================================================

/// Production transport over `reqwest`.
///
/// The cookie store is enabled so the HTTP-only refresh cookie set by the
/// login and refresh endpoints rides along on later refresh calls. With
/// [`with_cookie_file`](Self::with_cookie_file) it also outlives the process.
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend or client
    /// configuration cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::build(config, reqwest::Client::builder().cookie_store(true))
    }

    /// Transport whose cookies are persisted to `path`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_cookie_file(config: &ClientConfig, path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let jar = Arc::new(PersistentJar::file(path));
        Self::build(config, reqwest::Client::builder().cookie_provider(jar))
    }

    fn build(config: &ClientConfig, builder: reqwest::ClientBuilder) -> Result<Self, ApiError> {
        let http = builder
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(reqwest_method(request.method), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        tracing::debug!(method = request.method.as_str(), path = %request.path, status, "api response");
        Ok(ApiResponse::new(status, parse_body(&text)))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
    }
}

/// Empty bodies become `Null`; non-JSON bodies (proxy error pages) are kept
/// as a string so error messages stay readable.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_body_handles_empty_json_and_text() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  \n"), Value::Null);
        assert_eq!(parse_body(r#"{"access":"a"}"#), serde_json::json!({"access": "a"}));
        assert_eq!(parse_body("<html>bad gateway</html>"), Value::String("<html>bad gateway</html>".into()));
    }

    #[test]
    fn new_keeps_normalized_base_url() {
        let cfg = ClientConfig::default().with_base_url("http://127.0.0.1:8000/api/");
        let transport = ReqwestTransport::new(&cfg).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:8000/api");
    }

    #[test]
    fn reqwest_method_maps_every_verb() {
        assert_eq!(reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest_method(Method::Post), reqwest::Method::POST);
        assert_eq!(reqwest_method(Method::Patch), reqwest::Method::PATCH);
    }

    #[test]
    fn with_cookie_file_does_not_touch_disk_until_a_cookie_arrives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");
        let transport = ReqwestTransport::with_cookie_file(&ClientConfig::default(), &path).unwrap();
        assert_eq!(transport.base_url(), crate::config::DEFAULT_API_BASE_URL);
        assert!(!path.exists());
    }
}
