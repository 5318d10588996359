//! Authentication server library
//!
//! Exposes the login router so it can be embedded or exercised in-process.

pub mod config;
pub mod routes;
pub mod store;

pub use config::ServerConfig;
pub use routes::{router, AppState, LoginResponse};
pub use store::InMemoryIdentityStore;
