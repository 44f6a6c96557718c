// src/models/identity.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Who is making the request.
///
/// Built by the identity middleware from a verified token and handed to
/// handlers explicitly instead of being looked up from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

/// DTO for a candidate signing in with the identity provider's result.
#[derive(Debug, Deserialize, Validate)]
pub struct IdentityLoginRequest {
    #[validate(length(min = 1, max = 128, message = "uid must be between 1 and 128 characters."))]
    pub uid: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

impl IdentityLoginRequest {
    /// Display name, falling back to the local part of the email.
    pub fn display_name(&self) -> Option<String> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => self
                .email
                .as_deref()
                .and_then(|email| email.split('@').next())
                .filter(|local| !local.is_empty())
                .map(str::to_string),
        }
    }
}

/// DTO for the static admin credential check.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: Option<&str>, email: Option<&str>) -> IdentityLoginRequest {
        IdentityLoginRequest {
            uid: "uid-1".to_string(),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn display_name_prefers_given_name() {
        let req = request(Some("Asha"), Some("asha@example.com"));
        assert_eq!(req.display_name().as_deref(), Some("Asha"));
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let req = request(Some("  "), Some("ravi.k@example.com"));
        assert_eq!(req.display_name().as_deref(), Some("ravi.k"));
    }

    #[test]
    fn display_name_absent_without_name_or_email() {
        assert_eq!(request(None, None).display_name(), None);
    }
}
