//! Staff directory

use crate::db::{Database, DbError};
use crate::models::EmployeeSummary;

#[derive(Clone)]
pub struct EmployeeService {
    db: Database,
}

impl EmployeeService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All employees with their login and role, newest first
    pub async fn list(&self) -> Result<Vec<EmployeeSummary>, DbError> {
        let employees = sqlx::query_as::<_, EmployeeSummary>(
            r#"
            SELECT e.id, e.first_name, e.last_name, e.position, e.email, u.login, u.role
            FROM employees e
            JOIN users u ON e.user_id = u.id
            ORDER BY e.id DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(employees)
    }
}
