use serde::{Deserialize, Serialize};

/// Email that always carries admin capability
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Identifier of the bootstrap administrator account
pub const ADMIN_USER_ID: i64 = 1;

/// The authenticated user's profile as reported by `/users/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub is_superuser: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Identity {
    /// The single admin-capability rule
    ///
    /// Used by both the explicit login path and the startup revalidation path.
    pub fn is_admin(&self) -> bool {
        self.is_superuser.unwrap_or(false) || self.id == ADMIN_USER_ID || self.email == ADMIN_EMAIL
    }
}

/// Email/password pair as typed into the auth form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration body
#[derive(Debug, Clone, Serialize)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}
