//! Request and response envelopes passed through the client pipeline.
//!
//! An [`ApiRequest`] is a complete, rebuildable description of one call:
//! the pipeline mutates it in place (headers, retry marker) and a replay is
//! simply a clone re-sent with a new `Authorization` header.

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::ApiError;

pub const AUTHORIZATION: &str = "authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Endpoint path relative to the API root, e.g. `/accounts/me/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Header names are stored lowercase.
    pub headers: BTreeMap<String, String>,
    /// Never attach the stored bearer credential.
    pub no_auth: bool,
    /// Never attempt refresh-and-replay for this request.
    pub skip_auth_refresh: bool,
    /// Set once the request has been replayed after a refresh.
    pub retried: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: BTreeMap::new(),
            no_auth: false,
            skip_auth_refresh: false,
            retried: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    #[must_use]
    pub fn no_auth(mut self) -> Self {
        self.no_auth = true;
        self
    }

    #[must_use]
    pub fn skip_auth_refresh(mut self) -> Self {
        self.skip_auth_refresh = true;
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(&name.to_ascii_lowercase());
    }

    pub fn set_bearer(&mut self, token: &str) {
        self.set_header(AUTHORIZATION, format!("Bearer {token}"));
    }

    /// Token from an attached `Authorization: Bearer` header.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.header(AUTHORIZATION)?.strip_prefix("Bearer ")
    }

    /// Query value by key (first match).
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// A response that reached the client, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert non-2xx responses into [`ApiError::Status`].
    ///
    /// # Errors
    ///
    /// Returns the status error carrying the body verbatim.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status { status: self.status, body: self.body })
        }
    }

    /// Decode the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] when the body does not match `T`.
    pub fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_case_insensitive() {
        let mut req = ApiRequest::get("/accounts/me/");
        req.set_header("Authorization", "Bearer abc");
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer abc"));
        assert_eq!(req.bearer(), Some("abc"));

        req.remove_header("authorization");
        assert!(req.bearer().is_none());
    }

    #[test]
    fn builders_set_flags_and_query() {
        let req = ApiRequest::post("/accounts/token/refresh/", serde_json::json!({}))
            .no_auth()
            .skip_auth_refresh()
            .with_query("page", 2);
        assert_eq!(req.method, Method::Post);
        assert!(req.no_auth && req.skip_auth_refresh && !req.retried);
        assert_eq!(req.query_value("page"), Some("2"));
        assert_eq!(req.body, Some(serde_json::json!({})));
    }

    #[test]
    fn error_for_status_keeps_body() {
        let ok = ApiResponse::new(204, Value::Null).error_for_status();
        assert!(ok.is_ok());

        let err = ApiResponse::new(401, serde_json::json!({"detail": "expired"}))
            .error_for_status()
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.body().unwrap()["detail"], "expired");
    }
}
