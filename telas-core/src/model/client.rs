//! Client record: the owner of a set of rolls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient::datetime_or_null;

/// Identifier assigned by the record service.
pub type ClientId = i64;

/// A client owning fabric rolls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    /// Human label, trimmed and non-empty.
    pub nombre: String,
    /// Set by the record service at creation; absent on some records.
    #[serde(default, deserialize_with = "datetime_or_null")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields for creating a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub nombre: String,
}

/// Partial update of a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_service_json() {
        let json = r#"{"id": 3, "nombre": "Textiles Ruiz", "created_at": "2024-05-01T12:30:00.123456Z"}"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(client.id, 3);
        assert_eq!(client.nombre, "Textiles Ruiz");
        assert_eq!(
            client.created_at.unwrap().to_rfc3339(),
            "2024-05-01T12:30:00.123456+00:00"
        );
    }

    #[test]
    fn test_client_created_at_without_offset_is_utc() {
        let json = r#"{"id": 1, "nombre": "x", "created_at": "2024-05-01T12:30:00.123456"}"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(
            client.created_at.unwrap().to_rfc3339(),
            "2024-05-01T12:30:00.123456+00:00"
        );

        let json = r#"{"id": 1, "nombre": "x", "created_at": "2024-05-01 12:30:00"}"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(client.created_at.unwrap().to_rfc3339(), "2024-05-01T12:30:00+00:00");
    }

    #[test]
    fn test_client_created_at_missing_or_null() {
        let client: Client = serde_json::from_str(r#"{"id": 1, "nombre": "x"}"#).unwrap();
        assert_eq!(client.created_at, None);

        let json = r#"{"id": 1, "nombre": "x", "created_at": null}"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(client.created_at, None);
    }

    #[test]
    fn test_client_created_at_garbage_rejected() {
        let json = r#"{"id": 1, "nombre": "x", "created_at": "yesterday"}"#;
        assert!(serde_json::from_str::<Client>(json).is_err());
    }

    #[test]
    fn test_empty_patch_serializes_empty() {
        let json = serde_json::to_string(&ClientPatch::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
