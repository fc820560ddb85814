//! Session actions: login, logout, registration and profile edits.
//!
//! DESIGN
//! ======
//! `AuthService` pairs the shared client with the shared session so each
//! action updates the credential, the logged-out gate and the cached user
//! together. Backend validation errors are returned untouched; callers
//! render the `body` of [`ApiError::Status`] as-is.
//!
//! ERROR HANDLING
//! ==============
//! Authenticated calls go through [`AuthService::authenticated`]. A 401
//! that reaches it has already survived refresh-and-replay, so the session
//! is over: the credential is dropped and the user reset, which sends
//! guarded routes back to `/login`.

use std::future::Future;

use crate::net::api;
use crate::net::client::AuthHttpClient;
use crate::net::error::ApiError;
use crate::net::types::{Nft, NftListKind, Page, RegisterRequest, User, UserPatch};
use crate::state::auth::Session;
use crate::state::nfts::NftFeed;

#[derive(Clone)]
pub struct AuthService {
    client: AuthHttpClient,
    session: Session,
}

impl AuthService {
    #[must_use]
    pub fn new(client: AuthHttpClient, session: Session) -> Self {
        Self { client, session }
    }

    #[must_use]
    pub fn client(&self) -> &AuthHttpClient {
        &self.client
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Log in and make the returned user current.
    ///
    /// Re-enables refresh and drops any previous credential before the
    /// request, so a stale token never rides along. When the backend omits
    /// the user from the login response it is fetched from `/accounts/me/`.
    ///
    /// # Errors
    ///
    /// The backend's error unchanged; the cached user is left as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        self.client.set_logged_out(false);
        self.client.tokens().clear();

        let response = api::login(&self.client, username, password).await?;
        if response.access.is_empty() {
            return Err(ApiError::MissingAccess);
        }
        self.client.tokens().set(&response.access);

        let user = match response.user {
            Some(user) => user,
            None => api::fetch_current_user(&self.client).await?,
        };
        tracing::info!(username = %user.username, role = %user.role, "logged in");
        self.session.resolve(Some(user.clone()));
        Ok(user)
    }

    /// Log out locally and on the backend. Safe to call repeatedly.
    ///
    /// The backend call only revokes the refresh cookie; its failure is
    /// logged and otherwise ignored.
    pub async fn logout(&self) {
        if let Err(e) = api::logout(&self.client).await {
            tracing::debug!(error = %e, "logout request failed");
        }
        self.client.tokens().clear();
        self.client.set_logged_out(true);
        self.session.resolve(None);
        tracing::info!("logged out");
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Per-field validation errors are returned verbatim.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let user = api::register(&self.client, request).await?;
        tracing::info!(username = %user.username, "registered");
        Ok(user)
    }

    /// Re-read the current user from the backend and cache it.
    ///
    /// # Errors
    ///
    /// Transport, status or decode errors. A 401 that survives refresh signs
    /// the session out; anything else leaves the cached user unchanged.
    pub async fn fetch_me(&self) -> Result<User, ApiError> {
        let user = self.authenticated(api::fetch_current_user(&self.client)).await?;
        self.session.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Persist a profile edit; the echoed user replaces the cached one.
    ///
    /// # Errors
    ///
    /// Validation errors verbatim; the cached user is unchanged. A 401 that
    /// survives refresh signs the session out.
    pub async fn update_profile(&self, patch: &UserPatch) -> Result<User, ApiError> {
        let user = self.authenticated(api::update_profile(&self.client, patch)).await?;
        self.session.set_user(Some(user.clone()));
        Ok(user)
    }

    /// One page of a user's NFTs.
    ///
    /// # Errors
    ///
    /// Transport, status or decode errors.
    pub async fn fetch_nfts(&self, username: &str, kind: NftListKind, page: u32, page_size: u32) -> Result<Page<Nft>, ApiError> {
        self.authenticated(api::fetch_user_nfts(&self.client, username, kind, page, page_size)).await
    }

    /// Load the next page of `feed`.
    ///
    /// # Errors
    ///
    /// Same as [`NftFeed::load_next`].
    pub async fn load_more(&self, feed: &mut NftFeed) -> Result<usize, ApiError> {
        self.authenticated(feed.load_next(&self.client)).await
    }

    /// Merge `patch` into the cached user without contacting the backend.
    pub fn update_user(&self, patch: &UserPatch) {
        self.session.update_user(patch);
    }

    #[must_use]
    pub fn role_home(&self) -> String {
        self.session.role_home()
    }

    /// Await `call`, ending the local session if it fails with a 401.
    async fn authenticated<T>(&self, call: impl Future<Output = Result<T, ApiError>>) -> Result<T, ApiError> {
        let result = call.await;
        if result.as_ref().is_err_and(ApiError::is_unauthorized) {
            self.end_session();
        }
        result
    }

    fn end_session(&self) {
        tracing::info!("session expired; signing out locally");
        self.client.tokens().clear();
        self.session.resolve(None);
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
