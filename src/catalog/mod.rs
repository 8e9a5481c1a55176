//! Credit product catalog
//!
//! Products are seeded by migration and are read-only to the loan engine.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgExecutor;

use crate::db::{Database, DbError};

/// Credit product terms
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CreditProduct {
    pub id: i64,
    pub name: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub min_term_months: i32,
    pub max_term_months: i32,
    /// Annual rate in percent
    pub interest_rate: Decimal,
    pub is_active: bool,
}

impl CreditProduct {
    pub fn amount_in_range(&self, amount: Decimal) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }

    pub fn term_in_range(&self, term_months: i32) -> bool {
        term_months >= self.min_term_months && term_months <= self.max_term_months
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, min_amount, max_amount, min_term_months, max_term_months, interest_rate, is_active";

pub async fn find_product<'e, E>(executor: E, id: i64) -> Result<Option<CreditProduct>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, CreditProduct>(&format!(
        "SELECT {} FROM credit_products WHERE id = $1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Products currently offered to clients
    pub async fn list_active(&self) -> Result<Vec<CreditProduct>, DbError> {
        let products = sqlx::query_as::<_, CreditProduct>(&format!(
            "SELECT {} FROM credit_products WHERE is_active = TRUE ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(products)
    }
}
