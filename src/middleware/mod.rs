//! Middleware for the back-office API
//!
//! Request tracing and authentication extractors.

pub mod auth;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, ClientUser, StaffUser, ACCESS_TOKEN_COOKIE};
pub use self::tracing::{client_ip, request_tracing, REQUEST_ID_HEADER};
