//! Loan route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::loan;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(loan::list_loans).post(loan::issue_loan))
        .route("/loans/preview", post(loan::preview_loan))
        .route("/loans/:id/schedule", get(loan::get_schedule))
        .route("/loans/:id/operations", get(loan::get_operations))
        .route("/my-loans", get(loan::my_loans))
        .route("/pay", post(loan::pay))
        .route("/early-repayment", post(loan::early_repayment))
        .route("/stats", get(loan::stats))
}
