use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Opaque backend-issued session credential.
///
/// `Debug` is redacted so the token never ends up in logs. Use
/// [`expose`](SessionToken::expose) when the raw value is actually needed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for storage and the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Backend user identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Dashboard role of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    User,
    Admin,
    SuperAdmin,
    /// Role name this client version does not know about.
    Other(String),
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user" => Self::User,
            "admin" => Self::Admin,
            "super_admin" => Self::SuperAdmin,
            _ => Self::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        match r {
            Role::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

/// Authenticated user profile as returned by the profile endpoint.
///
/// Always re-fetched with the current token; never restored from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub role_display: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub can_create_admin: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub projects_count: Option<u64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_joined: Option<time::OffsetDateTime>,
}

fn default_active() -> bool {
    true
}

impl Identity {
    /// Create an `Identity` with only the required fields.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            role: Role::User,
            role_display: None,
            is_admin: false,
            is_super_admin: false,
            can_create_admin: false,
            is_active: true,
            projects_count: None,
            date_joined: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Set the role and the admin flags the backend derives from it.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.is_admin = matches!(role, Role::Admin | Role::SuperAdmin);
        self.is_super_admin = role == Role::SuperAdmin;
        self.can_create_admin = role == Role::SuperAdmin;
        self.role = role;
        self
    }
}
