//! Route definitions for the back-office API

mod admin;
mod auth;
mod client;
mod loan;
mod system;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use client::client_routes;
pub use loan::loan_routes;
pub use system::system_routes;
