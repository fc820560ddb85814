//! # nftmarket-client
//!
//! Client core for the NFT marketplace REST backend: an authenticated HTTP
//! client that heals expired access tokens, the session bootstrap that
//! resolves the current user at startup, role-based route guarding, and the
//! paginated per-user NFT listing.
//!
//! The crate owns no UI. Rendering layers (or the bundled `nftmarket` CLI)
//! construct one [`net::client::AuthHttpClient`] and one
//! [`state::auth::Session`] at startup and hand clones to everything
//! that needs them.

pub mod config;
pub mod net;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
