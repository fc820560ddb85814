//! Request pipeline stages.
//!
//! DESIGN
//! ======
//! `BeforeSend` stages run in order on every outgoing request, including
//! replays, and may only mutate the envelope. `OnError` stages run in order
//! on a failed request; the first stage that answers `Replay` wins, and the
//! replayed request flows through the whole pipeline again. A replay that
//! fails comes back through the `OnError` chain, where its `retried` marker
//! stops further recovery.
//!
//! The two stages the client installs by default are [`BearerAuth`] and
//! [`RefreshOnUnauthorized`].

use async_trait::async_trait;

use super::api::is_no_auth_path;
use super::client::AuthHttpClient;
use super::error::ApiError;
use super::request::{AUTHORIZATION, ApiRequest};
use crate::state::token_store::TokenStore;

pub trait BeforeSend: Send + Sync {
    fn before_send(&self, request: &mut ApiRequest);
}

/// What the client should do with a failed request.
#[derive(Debug)]
pub enum Recovery {
    /// Surface the error to the caller unchanged.
    Propagate,
    /// Re-issue this (rebuilt) request instead.
    Replay(ApiRequest),
}

#[async_trait]
pub trait OnError: Send + Sync {
    async fn on_error(&self, client: &AuthHttpClient, request: &ApiRequest, error: &ApiError) -> Recovery;
}

// =============================================================================
// BEARER AUTH
// =============================================================================

/// Attaches the stored access credential as `Authorization: Bearer`.
///
/// No-auth requests (explicit flag or a login/refresh path) are stripped of
/// any Authorization header instead, so stale state never leaks onto them.
pub struct BearerAuth {
    tokens: TokenStore,
}

impl BearerAuth {
    #[must_use]
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }
}

impl BeforeSend for BearerAuth {
    fn before_send(&self, request: &mut ApiRequest) {
        if request.no_auth || is_no_auth_path(&request.path) {
            request.remove_header(AUTHORIZATION);
            return;
        }
        if let Some(access) = self.tokens.get() {
            request.set_bearer(&access);
        }
    }
}

// =============================================================================
// REFRESH ON 401
// =============================================================================

/// Heals a 401 by refreshing the access credential once and replaying the
/// failed request with it.
///
/// Concurrent 401s share the client's single in-flight refresh. When the
/// refresh fails the original error propagates, not the refresh error.
pub struct RefreshOnUnauthorized;

#[async_trait]
impl OnError for RefreshOnUnauthorized {
    async fn on_error(&self, client: &AuthHttpClient, request: &ApiRequest, error: &ApiError) -> Recovery {
        if request.skip_auth_refresh || client.is_logged_out() || !error.is_unauthorized() {
            return Recovery::Propagate;
        }
        if request.retried || is_refresh_call(request) {
            return Recovery::Propagate;
        }

        let mut replay = request.clone();
        replay.retried = true;

        match client.refresh_access().await {
            Ok(_) if client.is_logged_out() => {
                tracing::debug!(path = %request.path, "logged out during refresh; not replaying");
                Recovery::Propagate
            }
            Ok(access) => {
                tracing::debug!(path = %request.path, "replaying request with refreshed credential");
                replay.set_bearer(&access);
                Recovery::Replay(replay)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %request.path, "token refresh failed");
                Recovery::Propagate
            }
        }
    }
}

fn is_refresh_call(request: &ApiRequest) -> bool {
    request.path == super::api::REFRESH_PATH
}
