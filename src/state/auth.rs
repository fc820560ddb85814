#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, PoisonError, RwLock};

use crate::net::types::{User, UserPatch};
use crate::routes::guard::default_path_for;

/// Authentication state tracking the current user and loading status.
///
/// `loading` is true only while the startup bootstrap is resolving the
/// user; `user` is `None` whenever nobody is logged in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
}

/// Shared handle to the process-wide [`SessionState`]. Clones share state.
///
/// A new session starts out loading: until the bootstrapper resolves it,
/// route guards must not redirect to the login page.
#[derive(Clone, Debug)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Arc::new(RwLock::new(SessionState { user: None, loading: true })) }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).loading
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).loading = loading;
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).user = user;
    }

    /// Settle the session in one step: store `user` and stop loading.
    pub fn resolve(&self, user: Option<User>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.user = user;
        state.loading = false;
    }

    /// Merge a local patch into the cached user. No-op when logged out.
    pub fn update_user(&self, patch: &UserPatch) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = state.user.as_mut() {
            patch.apply_to(user);
        }
    }

    /// Role-appropriate landing path for the current user, `/login` when
    /// nobody is logged in.
    #[must_use]
    pub fn role_home(&self) -> String {
        self.user().map_or_else(|| crate::routes::LOGIN_ROUTE.to_owned(), |u| default_path_for(&u))
    }
}
