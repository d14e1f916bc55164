//! User accounts and registration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can manage other accounts.
    Admin,
    /// Regular account.
    #[default]
    User,
}

impl Role {
    /// Whether the role may manage accounts.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::User => f.write_str("user"),
        }
    }
}

/// An account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Account role; missing roles are regular users.
    #[serde(default)]
    pub role: Role,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Role to grant.
    pub role: Role,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Always `bearer`.
    #[serde(default)]
    pub token_type: String,
    /// The authenticated account.
    pub user: User,
}

/// Registration form contents, checked before anything is sent.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Password.
    pub password: String,
    /// Password typed a second time.
    pub confirm_password: String,
    /// Role to grant.
    pub role: Role,
}

impl Registration {
    /// Check the form and build the request body.
    ///
    /// Rules are checked in order and the first failure is reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the offending field.
    pub fn validate(self) -> Result<NewUser> {
        if self.username.trim().is_empty() {
            return Err(Error::invalid_field("username", "username is required"));
        }
        if self.email.trim().is_empty() {
            return Err(Error::invalid_field("email", "email is required"));
        }
        if !self.email.contains('@') {
            return Err(Error::invalid_field("email", "enter a valid email"));
        }
        if self.password.trim().is_empty() {
            return Err(Error::invalid_field("password", "password is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_field(
                "password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if self.password != self.confirm_password {
            return Err(Error::invalid_field(
                "confirm_password",
                "passwords do not match",
            ));
        }
        Ok(NewUser {
            username: self.username,
            email: self.email,
            password: self.password,
            role: self.role,
        })
    }
}
