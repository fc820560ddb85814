//! Network layer: wire types, the request pipeline, and the authenticated
//! HTTP client.
//!
//! DESIGN
//! ======
//! Requests are plain [`request::ApiRequest`] envelopes. The
//! [`client::AuthHttpClient`] runs each one through an explicit pipeline of
//! `BeforeSend` stages (bearer attachment) and `OnError` stages (refresh and
//! replay on 401) before handing it to a [`transport::Transport`]. REST
//! endpoint helpers in [`api`] are thin typed wrappers over the client.

pub mod api;
pub mod client;
pub mod cookies;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod single_flight;
pub mod transport;
pub mod types;
