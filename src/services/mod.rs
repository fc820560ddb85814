//! Session services built on the authenticated client.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the session workflows (startup resolution, login,
//! logout, profile edits) so rendering layers and the CLI only call a method
//! and read the resulting [`crate::state::auth::Session`].

pub mod auth;
pub mod bootstrap;
