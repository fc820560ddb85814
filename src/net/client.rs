//! Authenticated HTTP client with transparent access-token refresh.
//!
//! DESIGN
//! ======
//! One `AuthHttpClient` is constructed at startup and cloned into every
//! consumer (clones share state). It owns the session-wide pieces the
//! refresh protocol coordinates on:
//! - the [`TokenStore`] holding the current access credential
//! - the logged-out gate, which suppresses refresh after an explicit logout
//!   and discards a refresh that settles after one
//! - the single in-flight refresh slot, so N concurrent 401s cause exactly
//!   one refresh call and every waiter replays with the same credential
//!
//! ERROR HANDLING
//! ==============
//! Transport failures surface as [`ApiError::Network`] and are never
//! retried. Non-2xx responses become [`ApiError::Status`] and go through the
//! `OnError` stages; anything they decline to recover is returned unchanged.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;

use super::api::{self, RefreshResponse};
use super::error::ApiError;
use super::pipeline::{BearerAuth, BeforeSend, OnError, Recovery, RefreshOnUnauthorized};
use super::request::{ApiRequest, ApiResponse};
use super::single_flight::SingleFlight;
use super::transport::{ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::state::token_store::TokenStore;

#[derive(Clone)]
pub struct AuthHttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    dispatcher: Dispatcher,
    on_error: Vec<Arc<dyn OnError>>,
    tokens: TokenStore,
    logged_out: Arc<AtomicBool>,
    refresh: SingleFlight<Result<String, ApiError>>,
}

/// Runs the `BeforeSend` stages and hands the request to the transport.
///
/// Kept separate from `Inner` so the shared refresh future can own a copy
/// without holding the client itself.
#[derive(Clone)]
struct Dispatcher {
    transport: Arc<dyn Transport>,
    before_send: Arc<[Arc<dyn BeforeSend>]>,
}

impl Dispatcher {
    fn prepare(&self, request: &mut ApiRequest) {
        for stage in self.before_send.iter() {
            stage.before_send(request);
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.transport.send(request).await?.error_for_status()
    }
}

impl AuthHttpClient {
    /// Client with the default pipeline: bearer attachment, then
    /// refresh-and-replay on 401.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        Self::builder(transport, tokens).build()
    }

    /// Client over `reqwest` configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), tokens))
    }

    #[must_use]
    pub fn builder(transport: Arc<dyn Transport>, tokens: TokenStore) -> ClientBuilder {
        ClientBuilder::new(transport, tokens)
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    #[must_use]
    pub fn is_logged_out(&self) -> bool {
        self.inner.logged_out.load(Ordering::SeqCst)
    }

    /// Open or close the logged-out gate. While set, no refresh is started.
    pub fn set_logged_out(&self, logged_out: bool) {
        self.inner.logged_out.store(logged_out, Ordering::SeqCst);
    }

    #[must_use]
    pub fn refresh_pending(&self) -> bool {
        self.inner.refresh.is_pending()
    }

    /// Send a request through the pipeline and return the 2xx response.
    ///
    /// # Errors
    ///
    /// Returns the original error when no recovery applies or refresh
    /// fails, or the replayed request's own error when the replay fails.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut request = request;
        loop {
            self.inner.dispatcher.prepare(&mut request);
            let error = match self.inner.dispatcher.dispatch(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };
            match self.recover(&request, &error).await {
                Recovery::Propagate => return Err(error),
                Recovery::Replay(next) => request = next,
            }
        }
    }

    /// Send and decode the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), plus [`ApiError::Decode`].
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.json()
    }

    /// Obtain a new access credential from the cookie-backed refresh
    /// endpoint and store it.
    ///
    /// Joins the in-flight refresh if there is one, so concurrent callers
    /// share a single backend call and observe the same credential.
    ///
    /// A refresh that settles after logout is discarded: the credential is
    /// not stored and every waiter sees [`ApiError::LoggedOut`].
    ///
    /// # Errors
    ///
    /// Returns the refresh call's error, [`ApiError::MissingAccess`] if the
    /// backend answered without a credential, or [`ApiError::LoggedOut`]
    /// while the logged-out gate is closed.
    pub async fn refresh_access(&self) -> Result<String, ApiError> {
        if self.is_logged_out() {
            return Err(ApiError::LoggedOut);
        }
        let dispatcher = self.inner.dispatcher.clone();
        let tokens = self.inner.tokens.clone();
        let logged_out = Arc::clone(&self.inner.logged_out);
        self.inner
            .refresh
            .run(move || async move {
                let mut request = api::refresh_request();
                dispatcher.prepare(&mut request);
                let response: RefreshResponse = dispatcher.dispatch(&request).await?.json()?;
                let access = response
                    .access
                    .filter(|a| !a.is_empty())
                    .ok_or(ApiError::MissingAccess)?;
                if logged_out.load(Ordering::SeqCst) {
                    tracing::info!("refresh settled after logout; credential discarded");
                    return Err(ApiError::LoggedOut);
                }
                tokens.set(&access);
                tracing::info!("access credential refreshed");
                Ok(access)
            })
            .await
    }

    async fn recover(&self, request: &ApiRequest, error: &ApiError) -> Recovery {
        for stage in &self.inner.on_error {
            if let Recovery::Replay(next) = stage.on_error(self, request, error).await {
                return Recovery::Replay(next);
            }
        }
        Recovery::Propagate
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Composes the client pipeline. Starts with the default stages; extra
/// stages run after them, in the order added.
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    before_send: Vec<Arc<dyn BeforeSend>>,
    on_error: Vec<Arc<dyn OnError>>,
}

impl ClientBuilder {
    fn new(transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        Self {
            before_send: vec![Arc::new(BearerAuth::new(tokens.clone()))],
            on_error: vec![Arc::new(RefreshOnUnauthorized)],
            transport,
            tokens,
        }
    }

    #[must_use]
    pub fn before_send(mut self, stage: impl BeforeSend + 'static) -> Self {
        self.before_send.push(Arc::new(stage));
        self
    }

    #[must_use]
    pub fn on_error(mut self, stage: impl OnError + 'static) -> Self {
        self.on_error.push(Arc::new(stage));
        self
    }

    #[must_use]
    pub fn build(self) -> AuthHttpClient {
        AuthHttpClient {
            inner: Arc::new(Inner {
                dispatcher: Dispatcher { transport: self.transport, before_send: self.before_send.into() },
                on_error: self.on_error,
                tokens: self.tokens,
                logged_out: Arc::new(AtomicBool::new(false)),
                refresh: SingleFlight::new(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
