//! UserSync - Identity provider webhook receiver.
//!
//! Mirrors user lifecycle events (`user.created`, `user.updated`,
//! `user.deleted`) delivered by the identity provider into a local
//! SQLite `users` table.
//!
//! ## Architecture
//!
//! ```text
//! Provider → POST /api/webhooks/clerk → verify signature → apply_event → users table
//! ```

pub mod config;
pub mod store;
pub mod sync;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use store::{SqliteUserStore, StoreError, User, UserStore};
pub use sync::{apply_event, SyncError, SyncOutcome, UserFields, WebhookEvent};
pub use web::{router, AppState, Webhook, WebhookError};
