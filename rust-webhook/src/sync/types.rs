//! Inbound event types and user field extraction.
//!
//! This module defines:
//! - The provider's webhook envelope (`type` + `data`)
//! - The user payload shape carried by `user.*` events
//! - `UserFields`, the flattened record written to the store

use serde::Deserialize;

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

// =============================================================================
// Envelope
// =============================================================================

/// Verified webhook envelope.
///
/// Built leniently from any JSON value: a missing or non-string `type`
/// yields `None`, and `data` stays untyped until the event kind is known,
/// since other event families (sessions, organizations, ...) carry
/// unrelated shapes.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_type: Option<String>,
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from(self.event_type.as_deref().unwrap_or_default())
    }
}

impl From<serde_json::Value> for WebhookEvent {
    fn from(mut value: serde_json::Value) -> Self {
        let event_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_string);
        let data = value
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or_default();

        Self { event_type, data }
    }
}

/// The event types this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    UserCreated,
    UserUpdated,
    UserDeleted,
    Other(String),
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        match value {
            USER_CREATED => EventKind::UserCreated,
            USER_UPDATED => EventKind::UserUpdated,
            USER_DELETED => EventKind::UserDeleted,
            other => EventKind::Other(other.to_string()),
        }
    }
}

// =============================================================================
// User payloads
// =============================================================================

/// User object carried by `user.created` and `user.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Option<Vec<EmailAddress>>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_numbers: Option<Vec<PhoneNumber>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneNumber {
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Deleted-object stub carried by `user.deleted`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedPayload {
    pub id: String,
}

/// Flattened user record as written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub external_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl UserPayload {
    /// Apply the extraction rules: first email, first phone, names default
    /// to the empty string. Every field is set, so updates replace rather
    /// than merge.
    pub fn into_fields(self) -> UserFields {
        UserFields {
            external_id: self.id,
            email: self
                .email_addresses
                .and_then(|list| list.into_iter().next())
                .and_then(|e| e.email_address),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            phone: self
                .phone_numbers
                .and_then(|list| list.into_iter().next())
                .and_then(|p| p.phone_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!(EventKind::from("user.created"), EventKind::UserCreated);
        assert_eq!(EventKind::from("user.updated"), EventKind::UserUpdated);
        assert_eq!(EventKind::from("user.deleted"), EventKind::UserDeleted);
        assert_eq!(
            EventKind::from("session.created"),
            EventKind::Other("session.created".to_string())
        );
    }

    #[test]
    fn test_envelope_ignores_extra_fields() {
        let event = WebhookEvent::from(json!({
            "type": "user.created",
            "object": "event",
            "timestamp": 1654012591835u64,
            "data": { "id": "user_29w83sxmDNGwOuEthce5gg56FcC" }
        }));

        assert_eq!(event.kind(), EventKind::UserCreated);
        assert_eq!(event.data["id"], "user_29w83sxmDNGwOuEthce5gg56FcC");
    }

    #[test]
    fn test_envelope_without_string_type() {
        let event = WebhookEvent::from(json!({ "data": {} }));
        assert_eq!(event.event_type, None);
        assert_eq!(event.kind(), EventKind::Other(String::new()));

        let event = WebhookEvent::from(json!({ "type": 7, "data": { "id": "user_1" } }));
        assert_eq!(event.event_type, None);
        assert_eq!(event.kind(), EventKind::Other(String::new()));

        let event = WebhookEvent::from(json!(["user.created"]));
        assert_eq!(event.event_type, None);
        assert!(event.data.is_null());
    }

    #[test]
    fn test_into_fields_takes_first_entries() {
        let payload: UserPayload = serde_json::from_value(json!({
            "id": "user_1",
            "email_addresses": [
                { "id": "idn_1", "email_address": "first@example.org" },
                { "id": "idn_2", "email_address": "second@example.org" }
            ],
            "first_name": "Ada",
            "last_name": "Lovelace",
            "phone_numbers": [
                { "id": "idn_3", "phone_number": "+15551234567" },
                { "id": "idn_4", "phone_number": "+15557654321" }
            ]
        }))
        .unwrap();

        let fields = payload.into_fields();

        assert_eq!(fields.external_id, "user_1");
        assert_eq!(fields.email.as_deref(), Some("first@example.org"));
        assert_eq!(fields.first_name, "Ada");
        assert_eq!(fields.last_name, "Lovelace");
        assert_eq!(fields.phone.as_deref(), Some("+15551234567"));
    }

    #[test]
    fn test_into_fields_defaults() {
        let payload: UserPayload = serde_json::from_value(json!({
            "id": "user_2",
            "email_addresses": [],
            "first_name": null,
            "phone_numbers": null
        }))
        .unwrap();

        let fields = payload.into_fields();

        assert_eq!(fields.email, None);
        assert_eq!(fields.first_name, "");
        assert_eq!(fields.last_name, "");
        assert_eq!(fields.phone, None);
    }

    #[test]
    fn test_user_payload_requires_id() {
        let result: Result<UserPayload, _> =
            serde_json::from_value(json!({ "first_name": "NoId" }));
        assert!(result.is_err());
    }
}
