//! Startup session resolution.
//!
//! DESIGN
//! ======
//! Runs once per process start, before any guarded page is decided:
//! - with a stored credential, ask `/accounts/me/` (a stale token heals
//!   through the client's refresh-and-replay); failure forgets the token
//! - without one, try the refresh cookie directly and then ask
//!   `/accounts/me/`; a failed refresh resolves to nobody without asking
//!
//! ERROR HANDLING
//! ==============
//! Resolution never fails. Every error ends in `Resolved(None)` and is
//! logged at debug level.

use std::sync::{Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::net::api;
use crate::net::client::AuthHttpClient;
use crate::net::types::User;
use crate::state::auth::Session;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapPhase {
    Init,
    Resolving,
    Resolved(Option<User>),
}

pub struct SessionBootstrapper {
    client: AuthHttpClient,
    session: Session,
    phase: Mutex<BootstrapPhase>,
    outcome: OnceCell<Option<User>>,
}

impl SessionBootstrapper {
    #[must_use]
    pub fn new(client: AuthHttpClient, session: Session) -> Self {
        Self { client, session, phase: Mutex::new(BootstrapPhase::Init), outcome: OnceCell::new() }
    }

    #[must_use]
    pub fn phase(&self) -> BootstrapPhase {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Resolve the session once. Later calls, including concurrent ones,
    /// return the first outcome without touching the network.
    pub async fn run(&self) -> Option<User> {
        self.outcome.get_or_init(|| self.resolve()).await.clone()
    }

    fn set_phase(&self, phase: BootstrapPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    async fn resolve(&self) -> Option<User> {
        self.set_phase(BootstrapPhase::Resolving);
        self.session.set_loading(true);

        let user = if self.client.tokens().is_present() {
            self.resolve_stored().await
        } else {
            self.resolve_by_refresh().await
        };

        match &user {
            Some(u) => tracing::info!(username = %u.username, role = %u.role, "session restored"),
            None => tracing::info!("no active session"),
        }
        self.session.resolve(user.clone());
        self.set_phase(BootstrapPhase::Resolved(user.clone()));
        user
    }

    async fn resolve_stored(&self) -> Option<User> {
        match api::fetch_current_user(&self.client).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "stored credential rejected");
                self.client.tokens().clear();
                None
            }
        }
    }

    async fn resolve_by_refresh(&self) -> Option<User> {
        if let Err(e) = self.client.refresh_access().await {
            tracing::debug!(error = %e, "no refresh cookie session");
            return None;
        }
        api::fetch_current_user(&self.client)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "user lookup after refresh failed"))
            .ok()
    }
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
