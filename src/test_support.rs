//! Scripted in-process backend for unit tests.
//!
//! `FakeBackend` implements [`Transport`] and mimics the marketplace API
//! closely enough to exercise the refresh protocol: one valid access token
//! at a time, a refresh "cookie" that logout revokes, and call counters per
//! endpoint.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::net::api::{LOGIN_PATH, LOGOUT_PATH, ME_PATH, REFRESH_PATH, REGISTER_PATH};
use crate::net::client::AuthHttpClient;
use crate::net::error::ApiError;
use crate::net::request::{ApiRequest, ApiResponse, Method};
use crate::net::transport::Transport;
use crate::net::types::{Role, User};
use crate::state::token_store::TokenStore;

pub const PASSWORD: &str = "secret";

pub struct FakeState {
    pub user: User,
    /// The only access token `/accounts/me/` accepts.
    pub valid_access: String,
    /// Whether the refresh cookie is present and valid.
    pub refresh_ok: bool,
    /// Refresh answers 200 without an `access` field.
    pub refresh_omits_access: bool,
    /// Every authenticated endpoint answers 401 regardless of token.
    pub reject_all: bool,
    /// Every request fails before reaching the server.
    pub offline: bool,
    pub refresh_delay: Duration,
    pub refresh_calls: usize,
    pub me_calls: usize,
    pub logout_calls: usize,
    pub nft_count: u64,
    pub requests: Vec<ApiRequest>,
}

#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

pub fn sample_user(role: Role) -> User {
    User {
        id: 1,
        username: "alice".into(),
        email: "alice@example.test".into(),
        role,
        first_name: Some("Alice".into()),
        last_name: None,
        date_joined: None,
        last_login: None,
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                user: sample_user(Role::Collector),
                valid_access: "access-0".into(),
                refresh_ok: true,
                refresh_omits_access: false,
                reject_all: false,
                offline: false,
                refresh_delay: Duration::from_millis(20),
                refresh_calls: 0,
                me_calls: 0,
                logout_calls: 0,
                nft_count: 30,
                requests: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Client over this backend with the given stored credential.
    pub fn client(&self, stored: Option<&str>) -> AuthHttpClient {
        let tokens = TokenStore::in_memory();
        if let Some(access) = stored {
            tokens.set(access);
        }
        AuthHttpClient::new(Arc::new(self.clone()), tokens)
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.state().requests.iter().filter(|r| r.path == path).cloned().collect()
    }

    fn authorized(state: &FakeState, request: &ApiRequest) -> bool {
        !state.reject_all && request.bearer() == Some(state.valid_access.as_str())
    }

    fn unauthorized() -> ApiResponse {
        ApiResponse::new(401, json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"}))
    }

    /// The refresh is decided when it arrives and answered after
    /// `refresh_delay`, so a logout can land while the answer is in flight.
    async fn refresh(&self) -> ApiResponse {
        let (delay, response) = {
            let mut state = self.state();
            state.refresh_calls += 1;
            let response = if !state.refresh_ok {
                ApiResponse::new(401, json!({"detail": "No refresh cookie"}))
            } else if state.refresh_omits_access {
                ApiResponse::new(200, json!({}))
            } else {
                let access = format!("access-{}", state.refresh_calls);
                state.valid_access.clone_from(&access);
                ApiResponse::new(200, json!({"access": access}))
            };
            (state.refresh_delay, response)
        };
        tokio::time::sleep(delay).await;
        response
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state();
        match (request.method, request.path.as_str()) {
            (Method::Post, LOGIN_PATH) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                if body["username"] == state.user.username.as_str() && body["password"] == PASSWORD {
                    state.valid_access = "access-login".into();
                    state.refresh_ok = true;
                    ApiResponse::new(200, json!({"access": "access-login", "user": state.user}))
                } else {
                    ApiResponse::new(401, json!({"detail": "No active account found with the given credentials"}))
                }
            }
            (Method::Get, ME_PATH) => {
                state.me_calls += 1;
                if Self::authorized(&state, request) {
                    ApiResponse::new(200, serde_json::to_value(&state.user).unwrap_or(Value::Null))
                } else {
                    Self::unauthorized()
                }
            }
            (Method::Patch, ME_PATH) => {
                if !Self::authorized(&state, request) {
                    return Self::unauthorized();
                }
                let body = request.body.clone().unwrap_or(Value::Null);
                if body.get("email").and_then(Value::as_str).is_some_and(|e| !e.contains('@')) {
                    return ApiResponse::new(400, json!({"email": ["Enter a valid email address."]}));
                }
                if let Ok(patch) = serde_json::from_value::<crate::net::types::UserPatch>(body) {
                    patch.apply_to(&mut state.user);
                }
                ApiResponse::new(200, serde_json::to_value(&state.user).unwrap_or(Value::Null))
            }
            (Method::Post, LOGOUT_PATH) => {
                // Revokes the refresh cookie whatever the bearer.
                state.logout_calls += 1;
                state.refresh_ok = false;
                ApiResponse::new(205, Value::Null)
            }
            (Method::Post, REGISTER_PATH) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                if body["username"] == state.user.username.as_str() {
                    return ApiResponse::new(400, json!({"username": ["A user with that username already exists."]}));
                }
                ApiResponse::new(
                    201,
                    json!({
                        "id": 2,
                        "username": body["username"],
                        "email": body["email"],
                        "role": body.get("role").cloned().unwrap_or(json!("collector")),
                    }),
                )
            }
            (Method::Get, path) if path.starts_with("/users/") && path.ends_with("/nfts") => {
                // Public, but a bearer that is sent must be valid.
                if request.bearer().is_some() && !Self::authorized(&state, request) {
                    return Self::unauthorized();
                }
                nft_page(&state, request)
            }
            _ => ApiResponse::new(404, json!({"detail": "Not found."})),
        }
    }
}

fn nft_page(state: &FakeState, request: &ApiRequest) -> ApiResponse {
    let page: u64 = request.query_value("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let size: u64 = request.query_value("page_size").and_then(|p| p.parse().ok()).unwrap_or(24);
    let start = (page - 1) * size;
    if start >= state.nft_count && page > 1 {
        return ApiResponse::new(404, json!({"detail": "Invalid page."}));
    }
    let end = (start + size).min(state.nft_count);
    let owner = request.path.trim_start_matches("/users/").trim_end_matches("/nfts");
    let results: Vec<Value> = (start..end)
        .map(|i| json!({"id": i + 1, "name": format!("NFT #{}", i + 1), "price": "0.10000000", "currency": "ETH", "owner": owner, "creator": owner}))
        .collect();
    let next = (end < state.nft_count).then(|| format!("http://testserver{}?page={}", request.path, page + 1));
    let previous = (page > 1).then(|| format!("http://testserver{}?page={}", request.path, page - 1));
    ApiResponse::new(200, json!({"count": state.nft_count, "next": next, "previous": previous, "results": results}))
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        {
            let mut state = self.state();
            state.requests.push(request.clone());
            if state.offline {
                return Err(ApiError::Network("connection refused".into()));
            }
        }
        if request.method == Method::Post && request.path == REFRESH_PATH {
            return Ok(self.refresh().await);
        }
        // Yield so concurrent callers interleave like real network calls.
        tokio::task::yield_now().await;
        Ok(self.handle(request))
    }
}
