use serde::Serialize;

use crate::types::{Identity, SessionToken};

/// Registration form submitted to the backend.
///
/// `confirm_password` is sent as `password2`; the backend rejects the
/// request when it does not match.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "password2")]
    pub confirm_password: String,
}

impl RegisterRequest {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Read-only view of the session published to the application.
///
/// `user.is_some()` implies `token.is_some()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<SessionToken>,
    pub user: Option<Identity>,
    /// Initial resolution or an explicit profile refresh is running.
    pub loading: bool,
}

impl SessionSnapshot {
    pub(crate) fn resolving() -> Self {
        Self {
            token: None,
            user: None,
            loading: true,
        }
    }

    pub(crate) fn anonymous() -> Self {
        Self {
            token: None,
            user: None,
            loading: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.loading) {
            (Some(_), _) => SessionPhase::Authenticated,
            (None, true) => SessionPhase::Resolving,
            (None, false) => SessionPhase::Anonymous,
        }
    }

    /// A user has been resolved for the current token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Authenticated with an admin or super-admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }
}

/// Coarse state of the session, as a route guard would see it.
///
/// A kept token whose profile could not be fetched (transient failure)
/// reads as `Anonymous` until a refresh succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Resolving,
    Authenticated,
    Anonymous,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, UserId};

    #[test]
    fn register_request_uses_backend_field_names() {
        let req = RegisterRequest::new("bob", "bob@x.com", "pw123456", "pw123456");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["password2"], "pw123456");
        assert!(json.get("confirm_password").is_none());
    }

    #[test]
    fn register_request_debug_hides_passwords() {
        let req = RegisterRequest::new("bob", "bob@x.com", "pw123456", "pw123456");
        assert!(!format!("{req:?}").contains("pw123456"));
    }

    #[test]
    fn phase_follows_snapshot_fields() {
        assert_eq!(SessionSnapshot::resolving().phase(), SessionPhase::Resolving);
        assert_eq!(SessionSnapshot::anonymous().phase(), SessionPhase::Anonymous);

        let snapshot = SessionSnapshot {
            token: Some("T1".into()),
            user: Some(Identity::new(UserId(1), "alice").with_role(Role::Admin)),
            loading: false,
        };
        assert_eq!(snapshot.phase(), SessionPhase::Authenticated);
        assert!(snapshot.is_admin());

        let kept = SessionSnapshot {
            token: Some("T1".into()),
            user: None,
            loading: false,
        };
        assert_eq!(kept.phase(), SessionPhase::Anonymous);
        assert!(!kept.is_authenticated());
    }
}
