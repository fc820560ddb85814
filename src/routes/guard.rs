//! Role-based route guarding.
//!
//! A guarded page asks [`decide`] what to do with the current session. While
//! the session is still loading the answer is always [`RouteDecision::Loading`]
//! so nothing redirects to `/login` before the bootstrap has had a chance to
//! restore the user.

use crate::net::types::{Role, User};
use crate::state::auth::SessionState;

use super::LOGIN_ROUTE;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session not resolved yet; show a placeholder.
    Loading,
    RedirectTo(String),
    Render,
}

/// Decide how a page restricted to `allowed` roles handles `state`.
/// An empty `allowed` admits any logged-in user.
#[must_use]
pub fn decide(state: &SessionState, allowed: &[Role]) -> RouteDecision {
    if state.loading {
        return RouteDecision::Loading;
    }
    let Some(user) = state.user.as_ref() else {
        return RouteDecision::RedirectTo(LOGIN_ROUTE.to_owned());
    };
    if allowed.is_empty() || allowed.contains(&user.role) {
        RouteDecision::Render
    } else {
        RouteDecision::RedirectTo(default_path_for(user))
    }
}

/// Landing page for a user's role.
#[must_use]
pub fn default_path_for(user: &User) -> String {
    match user.role {
        Role::Admin => "/admin".to_owned(),
        Role::Pro => "/pro".to_owned(),
        Role::Collector => format!("/u/{}", user.username),
    }
}

/// Capability check. An empty `required` allows everyone, including
/// anonymous visitors; otherwise the user must hold one of the roles.
#[must_use]
pub fn can(user: Option<&User>, required: &[Role]) -> bool {
    if required.is_empty() {
        return true;
    }
    user.is_some_and(|u| required.contains(&u.role))
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
