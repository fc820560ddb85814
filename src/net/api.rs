//! REST endpoint helpers for the marketplace backend.
//!
//! Each helper builds an [`ApiRequest`] and sends it through the
//! authenticated client, so every call below gets bearer attachment and
//! 401 healing for free. Paths are relative to the configured API root.

use serde::Deserialize;
use serde_json::json;

use super::client::AuthHttpClient;
use super::error::ApiError;
use super::request::ApiRequest;
use super::types::{LoginRequest, LoginResponse, Nft, NftListKind, Page, RegisterRequest, User, UserPatch};

pub const LOGIN_PATH: &str = "/accounts/login/";
pub const REFRESH_PATH: &str = "/accounts/token/refresh/";
pub const ME_PATH: &str = "/accounts/me/";
pub const LOGOUT_PATH: &str = "/accounts/logout/";
pub const REGISTER_PATH: &str = "/accounts/register/";

/// Endpoints that must never carry an `Authorization` header.
#[must_use]
pub fn is_no_auth_path(path: &str) -> bool {
    path == LOGIN_PATH || path == REFRESH_PATH
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
}

/// `POST /accounts/token/refresh/` with an empty body. The refresh
/// credential travels in the HTTP-only cookie, not in the request.
#[must_use]
pub fn refresh_request() -> ApiRequest {
    ApiRequest::post(REFRESH_PATH, json!({})).no_auth()
}

/// Log in with `POST /accounts/login/`.
///
/// Does not touch the token store; session actions decide what to keep.
/// A rejected login is a credential error, never a reason to refresh.
///
/// # Errors
///
/// A 400/401 carries the backend's validation body verbatim.
pub async fn login(client: &AuthHttpClient, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let body = serde_json::to_value(LoginRequest { username, password }).map_err(|e| ApiError::Decode(e.to_string()))?;
    client
        .send_json(ApiRequest::post(LOGIN_PATH, body).no_auth().skip_auth_refresh())
        .await
}

/// Fetch the currently authenticated user from `/accounts/me/`.
///
/// # Errors
///
/// Returns the 401 when the credential is missing and cannot be refreshed.
pub async fn fetch_current_user(client: &AuthHttpClient) -> Result<User, ApiError> {
    client.send_json(ApiRequest::get(ME_PATH)).await
}

/// Invalidate the server-side refresh cookie with `POST /accounts/logout/`.
///
/// # Errors
///
/// Any transport or status error; callers usually ignore it.
pub async fn logout(client: &AuthHttpClient) -> Result<(), ApiError> {
    client.send(ApiRequest::post(LOGOUT_PATH, json!({}))).await.map(|_| ())
}

/// Create an account with `POST /accounts/register/`.
///
/// # Errors
///
/// A 400 carries per-field validation errors verbatim.
pub async fn register(client: &AuthHttpClient, request: &RegisterRequest) -> Result<User, ApiError> {
    let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
    client.send_json(ApiRequest::post(REGISTER_PATH, body)).await
}

/// Apply a partial profile update with `PATCH /accounts/me/`; returns the
/// user as echoed by the backend.
///
/// # Errors
///
/// A 400 carries per-field validation errors verbatim.
pub async fn update_profile(client: &AuthHttpClient, patch: &UserPatch) -> Result<User, ApiError> {
    let body = serde_json::to_value(patch).map_err(|e| ApiError::Decode(e.to_string()))?;
    client.send_json(ApiRequest::patch(ME_PATH, body)).await
}

/// Path of a user's NFT listing, with the username percent-encoded.
#[must_use]
pub fn user_nfts_path(username: &str) -> String {
    format!("/users/{}/nfts", urlencoding::encode(username))
}

/// Fetch one page of a user's NFTs from `/users/{username}/nfts`.
///
/// # Errors
///
/// Transport, status, or decode errors.
pub async fn fetch_user_nfts(
    client: &AuthHttpClient,
    username: &str,
    kind: NftListKind,
    page: u32,
    page_size: u32,
) -> Result<Page<Nft>, ApiError> {
    let request = ApiRequest::get(user_nfts_path(username))
        .with_query("type", kind.as_str())
        .with_query("page", page)
        .with_query("page_size", page_size);
    client.send_json(request).await
}
