#![doc = include_str!("../README.md")]

#[cfg(feature = "http")]
pub mod client;
pub mod error;
pub mod session;
pub mod types;

// Re-exports for convenient access
#[cfg(feature = "http")]
pub use client::{AuthScheme, BackendConfig, HttpBackend};
pub use error::{BackendError, Error, StorageError};
pub use session::{
    ActivityEvent, ActivityListener, AuthBackend, FileStore, IdleStatus, KeyValueStore,
    MemoryStore, RegisterRequest, SessionConfig, SessionController, SessionPhase,
    SessionSnapshot, StorageTiers,
};
pub use types::{Identity, Role, SessionToken, UserId};
