use std::sync::Arc;

use super::traits::AuthBackend;
use crate::error::{BackendError, Error};
use crate::types::{Identity, SessionToken};

/// Why a profile fetch did not produce an identity.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ProfileError {
    /// Backend answered 401: the token must be discarded.
    #[error("session token rejected")]
    InvalidToken,

    /// Anything else. The session is kept as it was.
    #[error("profile fetch failed: {0}")]
    Transient(BackendError),
}

impl From<ProfileError> for Error {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::InvalidToken => Self::InvalidToken,
            ProfileError::Transient(inner) => Self::Transient(inner.to_string()),
        }
    }
}

/// Resolves tokens into identities and classifies failures.
pub(crate) struct ProfileSync<B> {
    backend: Arc<B>,
}

impl<B: AuthBackend> ProfileSync<B> {
    pub(crate) fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub(crate) async fn fetch_profile(
        &self,
        token: &SessionToken,
    ) -> Result<Identity, ProfileError> {
        match self.backend.profile(token).await {
            Ok(identity) => Ok(identity),
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Profile request rejected, token is no longer valid");
                Err(ProfileError::InvalidToken)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    status = ?e.status(),
                    "Profile request failed, keeping session"
                );
                Err(ProfileError::Transient(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{ProfileReply, ScriptedBackend};

    async fn classify(reply: ProfileReply) -> Result<Identity, ProfileError> {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_profile(reply);
        ProfileSync::new(backend).fetch_profile(&SessionToken::new("T1")).await
    }

    #[tokio::test]
    async fn success_returns_identity() {
        let identity = classify(ProfileReply::user("alice")).await.unwrap();
        assert_eq!(identity.username, "alice");
    }

    #[tokio::test]
    async fn unauthorized_is_invalid_token() {
        let err = classify(ProfileReply::Status(401)).await.unwrap_err();
        assert!(matches!(err, ProfileError::InvalidToken));
    }

    #[tokio::test]
    async fn forbidden_is_transient() {
        let err = classify(ProfileReply::Status(403)).await.unwrap_err();
        assert!(matches!(err, ProfileError::Transient(_)));
    }

    #[tokio::test]
    async fn server_and_network_errors_are_transient() {
        let err = classify(ProfileReply::Status(503)).await.unwrap_err();
        assert!(matches!(err, ProfileError::Transient(_)));

        let err = classify(ProfileReply::Unreachable).await.unwrap_err();
        assert!(matches!(err, ProfileError::Transient(_)));
    }

    #[test]
    fn converts_into_public_error() {
        assert!(matches!(Error::from(ProfileError::InvalidToken), Error::InvalidToken));
        let transient = ProfileError::Transient(BackendError::Unreachable("down".into()));
        assert!(matches!(Error::from(transient), Error::Transient(_)));
    }
}
