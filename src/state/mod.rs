//! Client-side session state.
//!
//! DESIGN
//! ======
//! State is split by concern so consumers depend on small focused models:
//! `token_store` holds the access credential, `auth` the resolved user and
//! loading flag, `nfts` the paged listing shown on a profile.

pub mod auth;
pub mod nfts;
pub mod token_store;
