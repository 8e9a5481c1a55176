//! Loan contract lifecycle
//!
//! Issuance, scheduled payment and early repayment. Each state transition
//! runs as a single unit of work that touches the contract, its schedule,
//! the operation log and the audit trail together.

mod error;
mod model;
pub mod schedule;
mod service;

pub use error::LoanError;
pub use model::*;
pub use service::{format_contract_number, settle_balance, Access, LoanService, CLOSURE_EPSILON};
