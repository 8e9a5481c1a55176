//! Client models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub passport_series: String,
    pub passport_number: String,
    pub passport_issued_by: Option<String>,
    pub date_of_birth: NaiveDate,
    pub address: Option<String>,
    pub phone: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

fn digits(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("digits"))
    }
}

fn phone_number(value: &str) -> Result<(), ValidationError> {
    let digit_count = value.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    if allowed && digit_count >= 10 {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

fn past_date(value: &NaiveDate) -> Result<(), ValidationError> {
    if *value < Utc::now().date_naive() {
        Ok(())
    } else {
        Err(ValidationError::new("date_of_birth"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 2, max = 100))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100))]
    pub last_name: String,
    #[validate(length(max = 100))]
    pub middle_name: Option<String>,
    #[validate(length(equal = 4), custom = "digits")]
    pub passport_series: String,
    #[validate(length(equal = 6), custom = "digits")]
    pub passport_number: String,
    pub passport_issued_by: Option<String>,
    /// `YYYY-MM-DD`
    #[validate(custom = "past_date")]
    pub date_of_birth: NaiveDate,
    pub address: Option<String>,
    #[validate(length(min = 10, max = 32), custom = "phone_number")]
    pub phone: String,
    #[validate(email)]
    pub email: String,
}

impl CreateClientRequest {
    /// Login assigned to the client: passport series followed by number
    pub fn generated_login(&self) -> String {
        format!("{}{}", self.passport_series, self.passport_number)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreated {
    pub id: i64,
    pub login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateClientRequest {
        serde_json::from_str(
            r#"{
                "firstName": "Ivan",
                "lastName": "Petrov",
                "passportSeries": "4510",
                "passportNumber": "123456",
                "dateOfBirth": "1990-05-17",
                "phone": "+7 (912) 345-67-89",
                "email": "ivan@example.com"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_request() {
        let request = valid_request();
        assert!(request.validate().is_ok());
        assert_eq!(request.generated_login(), "4510123456");
        assert_eq!(request.full_name(), "Ivan Petrov");
        assert!(request.middle_name.is_none());
    }

    #[test]
    fn test_passport_must_be_digits_of_fixed_length() {
        let request = CreateClientRequest {
            passport_series: "45A0".to_string(),
            ..valid_request()
        };
        assert!(request.validate().is_err());

        let request = CreateClientRequest {
            passport_number: "12345".to_string(),
            ..valid_request()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_phone_needs_ten_digits() {
        let request = CreateClientRequest {
            phone: "12-34-56-78".to_string(),
            ..valid_request()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_birth_date_in_future_rejected() {
        let request = CreateClientRequest {
            date_of_birth: Utc::now().date_naive() + chrono::Duration::days(1),
            ..valid_request()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_bad_date_format_fails_to_parse() {
        let result: Result<CreateClientRequest, _> = serde_json::from_str(
            r#"{"firstName":"Ivan","lastName":"Petrov","passportSeries":"4510","passportNumber":"123456",
                "dateOfBirth":"17.05.1990","phone":"89123456789","email":"ivan@example.com"}"#,
        );
        assert!(result.is_err());
    }
}
