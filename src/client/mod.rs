//! Bank clients
//!
//! Staff register clients; each client gets a login derived from the passport
//! and a generated password, delivered by email.

mod model;
mod service;

pub use model::*;
pub use service::{ClientError, ClientService, GENERATED_PASSWORD_LEN};
