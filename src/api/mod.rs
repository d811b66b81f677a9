//! HTTP API service.
//!
//! Stateless request handling over the in-process account store: every
//! request authenticates from the signed token it carries, and all
//! continuity lives in the token plus the store.

pub mod accounts;
pub mod auth;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod play;
pub mod routes;
pub mod server;

pub use server::ApiServer;
