//! API handlers for the back-office server

pub mod audit;
pub mod auth;
pub mod backup;
pub mod client;
pub mod employee;
pub mod loan;
pub mod product;
pub mod system;

// Re-export extractors from middleware for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, ClientUser, StaffUser};
