//! Wire types and a typed HTTP client for the LinkCash payment-link backend.
//!
//! `objects` mirrors the JSON shapes the backend exchanges with the checkout
//! frontend. `client` (behind the `client` feature) wraps `reqwest` with one
//! method per backend endpoint.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
