//! Audit trail
//!
//! Every mutating operation appends an immutable entry to `audit_logs` inside
//! its own transaction. Entries are written under a savepoint: a failed audit
//! insert is logged and rolled back on its own, never taking the business
//! write down with it.

mod model;
mod recorder;

pub use model::*;
pub use recorder::{record, AuditService};
