//! Event dispatch from verified webhooks to the user store.
//!
//! ## Processing Flow
//!
//! ```text
//! WebhookEvent → apply_event() → UserStore (at most one write) → SyncOutcome
//! ```

pub mod types;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::store::{StoreError, UserStore};

pub use types::{
    DeletedPayload, EmailAddress, EventKind, PhoneNumber, UserFields, UserPayload, WebhookEvent,
    USER_CREATED, USER_DELETED, USER_UPDATED,
};

/// What a successfully handled event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(String),
    /// Replayed creation for a user that is already mirrored.
    AlreadyExists(String),
    Updated(String),
    Deleted(String),
    /// Event type this service does not act on.
    Ignored(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// Recognized event whose `data` is not a usable user object.
    #[error("malformed {event_type} payload: {source}")]
    MalformedPayload {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Apply one verified event to the store.
///
/// The event is trusted as authoritative: there is no read-back before
/// writing. A duplicate key on `user.created` counts as already applied.
pub async fn apply_event(
    store: &dyn UserStore,
    event: WebhookEvent,
) -> Result<SyncOutcome, SyncError> {
    let kind = event.kind();

    match kind {
        EventKind::UserCreated => {
            let fields = parse_user(&event, USER_CREATED)?;
            match store.create_user(&fields).await {
                Ok(()) => {
                    info!(external_id = %fields.external_id, "user_created");
                    Ok(SyncOutcome::Created(fields.external_id))
                }
                Err(StoreError::DuplicateKey(id)) => {
                    warn!(external_id = %id, "user_already_exists");
                    Ok(SyncOutcome::AlreadyExists(id))
                }
                Err(e) => {
                    error!(external_id = %fields.external_id, error = %e, "user_create_failed");
                    Err(SyncError::Store {
                        operation: "create",
                        source: e,
                    })
                }
            }
        }
        EventKind::UserUpdated => {
            let fields = parse_user(&event, USER_UPDATED)?;
            if let Err(e) = store.update_user(&fields).await {
                error!(external_id = %fields.external_id, error = %e, "user_update_failed");
                return Err(SyncError::Store {
                    operation: "update",
                    source: e,
                });
            }
            info!(external_id = %fields.external_id, "user_updated");
            Ok(SyncOutcome::Updated(fields.external_id))
        }
        EventKind::UserDeleted => {
            let deleted: DeletedPayload = parse_data(&event, USER_DELETED)?;
            if let Err(e) = store.delete_user(&deleted.id).await {
                error!(external_id = %deleted.id, error = %e, "user_delete_failed");
                return Err(SyncError::Store {
                    operation: "delete",
                    source: e,
                });
            }
            info!(external_id = %deleted.id, "user_deleted");
            Ok(SyncOutcome::Deleted(deleted.id))
        }
        EventKind::Other(event_type) => {
            info!(event_type = %event_type, "event_ignored");
            Ok(SyncOutcome::Ignored(event_type))
        }
    }
}

fn parse_user(event: &WebhookEvent, event_type: &'static str) -> Result<UserFields, SyncError> {
    let payload: UserPayload = parse_data(event, event_type)?;
    Ok(payload.into_fields())
}

fn parse_data<T: serde::de::DeserializeOwned>(
    event: &WebhookEvent,
    event_type: &'static str,
) -> Result<T, SyncError> {
    T::deserialize(&event.data).map_err(|source| {
        error!(event_type = event_type, error = %source, "event_payload_malformed");
        SyncError::MalformedPayload { event_type, source }
    })
}
