//! Middleware for the transaction guard service
//!
//! Provides bearer-token authentication and role checks for the API

mod auth;

pub use auth::*;
