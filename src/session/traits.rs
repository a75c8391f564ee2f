use std::future::Future;

use super::types::RegisterRequest;
use crate::error::{BackendError, StorageError};
use crate::types::{Identity, SessionToken};

/// String key-value storage tier used by the credential store.
///
/// Implementations decide the lifetime of what they hold: a durable tier
/// survives process restarts, an ephemeral tier does not.
///
/// # Example
///
/// ```rust,ignore
/// impl KeyValueStore for KeyringStore {
///     fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
///         Ok(self.entry(key).get_password().ok())
///     }
///     // ...
/// }
/// ```
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Remote authentication API consumed by the session controller.
///
/// [`HttpBackend`](crate::client::HttpBackend) is the production
/// implementation. Status codes travel inside [`BackendError`] so the
/// controller can tell rejected credentials from an outage.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchange credentials for a session token.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<SessionToken, BackendError>> + Send;

    /// Create an account. Password confirmation is checked server-side.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Resolve a token into the identity it belongs to.
    fn profile(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Identity, BackendError>> + Send;

    /// Invalidate a token server-side.
    fn logout(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
