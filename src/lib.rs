//! qrpass — single-use, unit-scoped access tokens delivered as URLs and
//! QR codes.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! in `tests/` drive the same router.

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod qr;
pub mod service;
pub mod store;

use service::TokenService;

/// Shared application state passed to handlers.
pub struct AppState {
    pub tokens: TokenService,
}
