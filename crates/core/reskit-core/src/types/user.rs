//! User profile and auth payloads

use super::Id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Profile of the logged-in user, read-only on the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: Id,

    /// Display name
    #[serde(default)]
    pub username: String,

    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    /// Account enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    /// Administrator flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,

    /// Account creation time (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,

    /// Profile fields this client does not know about
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl User {
    /// Whether `user_id` (as carried on messages) refers to this user
    pub fn is(&self, user_id: &str) -> bool {
        self.id.to_string() == user_id
    }
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Password
    pub password: String,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Display name
    pub username: String,
    /// Account email
    pub email: String,
    /// Password
    pub password: String,
}

/// Response of the login/register endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    /// Issued token on success
    #[serde(default)]
    pub token: Option<String>,
    /// Status or failure text
    #[serde(default)]
    pub message: Option<String>,
}
