use std::sync::Arc;

use super::traits::KeyValueStore;
use crate::error::StorageError;
use crate::types::SessionToken;

/// Holds the session token across a durable and an ephemeral tier.
///
/// A token is only reusable while the ephemeral tier still has it. One that
/// survives only in the durable tier means the host was closed since login,
/// and is discarded on [`initialize`](CredentialStore::initialize).
pub(crate) struct CredentialStore {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    key: String,
}

impl CredentialStore {
    pub(crate) fn new(
        durable: Arc<dyn KeyValueStore>,
        ephemeral: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            durable,
            ephemeral,
            key: key.into(),
        }
    }

    /// Decide whether a usable token is available right now.
    pub(crate) fn initialize(&self) -> Option<SessionToken> {
        match self.ephemeral.get(&self.key) {
            Ok(Some(token)) => return Some(SessionToken::new(token)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Ephemeral credential read failed");
                return None;
            }
        }

        match self.durable.get(&self.key) {
            Ok(Some(_)) => {
                tracing::info!("Discarding stale token from a previous session");
                if let Err(e) = self.durable.remove(&self.key) {
                    tracing::warn!(error = %e, "Stale token removal failed");
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Durable credential read failed");
                None
            }
        }
    }

    /// Write the token to both tiers. On failure both tiers are cleared, so
    /// they never hold different tokens.
    pub(crate) fn save(&self, token: &SessionToken) -> Result<(), StorageError> {
        let written = self
            .durable
            .set(&self.key, token.expose())
            .and_then(|()| self.ephemeral.set(&self.key, token.expose()));

        if let Err(e) = written {
            tracing::warn!(error = %e, "Credential save failed, clearing both tiers");
            if let Err(clear) = self.clear() {
                tracing::warn!(error = %clear, "Credential clear after failed save failed");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove the token from both tiers. Both removals are always attempted.
    pub(crate) fn clear(&self) -> Result<(), StorageError> {
        let durable = self.durable.remove(&self.key);
        let ephemeral = self.ephemeral.remove(&self.key);
        durable.and(ephemeral)
    }
}
