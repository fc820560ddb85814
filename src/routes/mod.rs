//! Client route table and role guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! The marketplace UI has a handful of pages, some public and some limited
//! to particular roles. This module names them, matches concrete paths
//! against their patterns, and turns the resolved session into a routing
//! decision via [`guard::decide`].

pub mod guard;

use crate::net::types::Role;
use crate::state::auth::SessionState;

use self::guard::RouteDecision;

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const REGISTER_ROUTE: &str = "/register";
pub const PROFILE_ROUTE: &str = "/profile";
pub const USER_ROUTE: &str = "/u/:username";
pub const PRO_ROUTE: &str = "/pro";
pub const ADMIN_ROUTE: &str = "/admin";

/// One page: a path pattern (`:name` segments capture) and who may see it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub pattern: &'static str,
    /// Public pages render for anyone, logged in or not.
    pub public: bool,
    /// Roles admitted to a non-public page; empty admits any logged-in user.
    pub allowed: &'static [Role],
}

impl RouteSpec {
    #[must_use]
    pub const fn public(pattern: &'static str) -> Self {
        Self { pattern, public: true, allowed: &[] }
    }

    #[must_use]
    pub const fn guarded(pattern: &'static str, allowed: &'static [Role]) -> Self {
        Self { pattern, public: false, allowed }
    }

    /// Match `path` against the pattern, returning captured parameters.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let pattern: Vec<&str> = segments(self.pattern).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }
        let mut params = Vec::new();
        for (expected, got) in pattern.iter().zip(&actual) {
            if let Some(name) = expected.strip_prefix(':') {
                params.push((name.to_owned(), (*got).to_owned()));
            } else if expected != got {
                return None;
            }
        }
        Some(params)
    }
}

/// A path resolved against the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteSpec,
    pub params: Vec<(String, String)>,
}

impl RouteMatch<'_> {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<RouteSpec>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            RouteSpec::public(HOME_ROUTE),
            RouteSpec::public(LOGIN_ROUTE),
            RouteSpec::public(REGISTER_ROUTE),
            RouteSpec::guarded(PROFILE_ROUTE, &[]),
            RouteSpec::public(USER_ROUTE),
            RouteSpec::guarded(PRO_ROUTE, &[Role::Pro, Role::Admin]),
            RouteSpec::guarded(ADMIN_ROUTE, &[Role::Admin]),
        ])
    }
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<RouteSpec>) -> Self {
        Self { routes }
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    /// First route whose pattern matches `path`. Query string and trailing
    /// slash are ignored.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        self.routes
            .iter()
            .find_map(|route| route.matches(path).map(|params| RouteMatch { route, params }))
    }

    /// Routing decision for `path`, or `None` for an unknown path.
    #[must_use]
    pub fn decide(&self, path: &str, state: &SessionState) -> Option<RouteDecision> {
        let matched = self.resolve(path)?;
        if matched.route.public {
            return Some(RouteDecision::Render);
        }
        Some(guard::decide(state, matched.route.allowed))
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::types::User;

    fn resolved(role: Option<Role>) -> SessionState {
        SessionState {
            user: role.map(|role| User {
                id: 1,
                username: "alice".into(),
                email: "alice@example.test".into(),
                role,
                first_name: None,
                last_name: None,
                date_joined: None,
                last_login: None,
            }),
            loading: false,
        }
    }

    #[test]
    fn resolve_captures_username() {
        let table = RouteTable::default();
        let matched = table.resolve("/u/bob/").unwrap();
        assert_eq!(matched.route.pattern, USER_ROUTE);
        assert_eq!(matched.param("username"), Some("bob"));
    }

    #[test]
    fn resolve_ignores_query() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/admin?tab=users").unwrap().route.pattern, ADMIN_ROUTE);
        assert_eq!(table.resolve("").unwrap().route.pattern, HOME_ROUTE);
    }

    #[test]
    fn unknown_path_has_no_decision() {
        let table = RouteTable::default();
        assert!(table.resolve("/u").is_none());
        assert!(table.decide("/nope", &resolved(None)).is_none());
    }

    #[test]
    fn public_routes_never_redirect() {
        let table = RouteTable::default();
        let loading = SessionState { user: None, loading: true };
        for path in ["/", "/login", "/register", "/u/bob"] {
            assert_eq!(table.decide(path, &resolved(None)), Some(RouteDecision::Render));
            assert_eq!(table.decide(path, &loading), Some(RouteDecision::Render));
        }
    }

    #[test]
    fn guarded_routes_follow_role() {
        let table = RouteTable::default();
        assert_eq!(table.decide("/profile", &resolved(None)), Some(RouteDecision::RedirectTo("/login".into())));
        assert_eq!(table.decide("/profile", &resolved(Some(Role::Collector))), Some(RouteDecision::Render));
        assert_eq!(
            table.decide("/pro", &resolved(Some(Role::Collector))),
            Some(RouteDecision::RedirectTo("/u/alice".into()))
        );
        assert_eq!(table.decide("/pro", &resolved(Some(Role::Admin))), Some(RouteDecision::Render));
        assert_eq!(
            table.decide("/admin", &resolved(Some(Role::Pro))),
            Some(RouteDecision::RedirectTo("/pro".into()))
        );
    }
}
