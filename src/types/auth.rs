use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub active: bool,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    /// Checks run before any request leaves the process.
    pub fn validate(&self) -> Result<(), DashboardError> {
        let mut errors = Vec::new();

        if self.username.trim().is_empty() {
            errors.push("username must not be empty".to_string());
        }
        if !self.email.contains('@') {
            errors.push("email must be a valid address".to_string());
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            errors.push(format!("password must be at least {} characters", MIN_PASSWORD_LEN));
        }
        if self.password != self.confirm_password {
            errors.push("passwords do not match".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DashboardError::Validation(errors.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: "trader".to_string(),
            email: "trader@example.com".to_string(),
            password: "secret123".to_string(),
            confirm_password: "secret123".to_string(),
            first_name: "Dana".to_string(),
            last_name: String::new(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_password_mismatch_is_validation_error() {
        let req = RegisterRequest {
            confirm_password: "secret124".to_string(),
            ..request()
        };
        match req.validate() {
            Err(DashboardError::Validation(msg)) => assert!(msg.contains("passwords do not match")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_confirmation_never_serialized() {
        let json = serde_json::to_value(request()).unwrap();
        assert!(json.get("confirmPassword").is_none());
        assert_eq!(json["firstName"], "Dana");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user = User {
            username: "trader".to_string(),
            ..User::default()
        };
        assert_eq!(user.display_name(), "trader");
    }
}
