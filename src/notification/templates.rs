//! Message bodies

use chrono::{DateTime, Utc};

use super::EmailMessage;

/// Credentials for a newly registered client
pub fn client_welcome(to: &str, full_name: &str, login: &str, password: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome to Rosebank".to_string(),
        body: format!(
            "Hello, {full_name}!\n\n\
             Your personal account has been created.\n\n\
             Login: {login}\n\
             Password: {password}\n\n\
             Please keep these credentials private.\n"
        ),
    }
}

/// Sign-in alert with the caller's address
pub fn login_alert(to: &str, login: &str, ip: Option<&str>, at: DateTime<Utc>) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "New sign-in to your account".to_string(),
        body: format!(
            "Account {login} signed in at {} from {}.\n\n\
             If this was not you, contact the bank immediately.\n",
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            ip.unwrap_or("an unknown address"),
        ),
    }
}
