//! Session lifecycle: credential tiers, profile sync, idle timeout.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dashboard_auth::{BackendConfig, HttpBackend, SessionConfig, SessionController, StorageTiers};
//!
//! // 1. Point the HTTP backend at the dashboard API
//! let backend = HttpBackend::new(BackendConfig::from_env()?);
//!
//! // 2. Build one controller at the application root
//! let session = SessionController::new(backend, StorageTiers::on_disk(data_dir.join("session.json")), SessionConfig::from_env()?);
//!
//! // 3. Resolve any session left by this browser session, then render
//! session.resolve().await;
//!
//! // 4. Feed input events so the idle timeout tracks real activity
//! let activity = session.activity_listener();
//! activity.record(ActivityEvent::KeyPress);
//! ```

mod activity;
mod config;
mod controller;
mod credentials;
mod profile;
mod stores;
#[cfg(test)]
pub(crate) mod testing;
mod traits;
mod types;

pub use activity::{ActivityEvent, ActivityListener, IdleStatus};
pub use config::SessionConfig;
pub use controller::{SessionController, StorageTiers};
pub use stores::{FileStore, MemoryStore};
pub use traits::{AuthBackend, KeyValueStore};
pub use types::{RegisterRequest, SessionPhase, SessionSnapshot};
