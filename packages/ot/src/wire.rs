//! Wire encoding for submitted and broadcast operations.
//!
//! ```json
//! {"userId":"alice","baseLength":5,"ops":[{"retain":5},{"insert":"X"}]}
//! ```
//!
//! Decoding validates structure before anything else sees the operation:
//! counts must be positive, inserts non-empty, lengths must not overflow, and
//! `baseLength` must equal what the components actually consume.

use crate::{ClientId, Component, Operation, OperationBuilder, OtError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOperation {
    user_id: ClientId,
    base_length: usize,
    ops: Vec<Component>,
}

/// An operation together with the client that claims to have produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireOperation", into = "WireOperation")]
pub struct AuthoredOperation {
    pub author: ClientId,
    pub operation: Operation,
}

impl AuthoredOperation {
    pub fn new(author: impl Into<ClientId>, operation: Operation) -> Self {
        Self {
            author: author.into(),
            operation,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, OtError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OtError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, OtError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, OtError> {
        Ok(serde_json::from_value(value)?)
    }
}

impl From<AuthoredOperation> for WireOperation {
    fn from(authored: AuthoredOperation) -> Self {
        WireOperation {
            user_id: authored.author,
            base_length: authored.operation.base_len(),
            ops: authored.operation.components().to_vec(),
        }
    }
}

impl TryFrom<WireOperation> for AuthoredOperation {
    type Error = OtError;

    fn try_from(wire: WireOperation) -> Result<Self, Self::Error> {
        if wire.user_id.as_str().is_empty() {
            return Err(OtError::MalformedOperation("empty userId".to_string()));
        }

        let mut builder = OperationBuilder::new();
        let (mut consumed, mut produced) = (0usize, 0usize);
        for (index, component) in wire.ops.into_iter().enumerate() {
            let len = component.char_len();
            if len == 0 {
                return Err(OtError::MalformedOperation(format!(
                    "empty component at index {}",
                    index
                )));
            }
            let (base, target) = match component {
                Component::Retain(_) => (consumed.checked_add(len), produced.checked_add(len)),
                Component::Insert(_) => (Some(consumed), produced.checked_add(len)),
                Component::Delete(_) => (consumed.checked_add(len), Some(produced)),
            };
            match (base, target) {
                (Some(base), Some(target)) => (consumed, produced) = (base, target),
                _ => {
                    return Err(OtError::MalformedOperation(format!(
                        "length overflow at index {}",
                        index
                    )))
                }
            }
            builder.push(component);
        }
        let operation = builder.build();

        if operation.base_len() != wire.base_length {
            return Err(OtError::MalformedOperation(format!(
                "baseLength {} does not match components consuming {}",
                wire.base_length,
                operation.base_len()
            )));
        }

        Ok(AuthoredOperation {
            author: wire.user_id,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuthoredOperation {
        AuthoredOperation::new(
            "alice",
            Operation::builder()
                .retain(2)
                .insert("ñ")
                .delete(1)
                .retain(2)
                .build(),
        )
    }

    #[test]
    fn test_round_trip() {
        let authored = sample();
        let bytes = authored.to_bytes().unwrap();
        assert_eq!(AuthoredOperation::from_bytes(&bytes).unwrap(), authored);
    }

    #[test]
    fn test_encoding_is_flat_and_ordered() {
        let json = String::from_utf8(sample().to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"userId":"alice","baseLength":5,"ops":[{"retain":2},{"insert":"ñ"},{"delete":1},{"retain":2}]}"#
        );
    }

    #[test]
    fn test_rejects_negative_length() {
        let json = br#"{"userId":"a","baseLength":1,"ops":[{"delete":-1}]}"#;
        assert!(matches!(
            AuthoredOperation::from_bytes(json),
            Err(OtError::MalformedOperation(_))
        ));
    }

    #[test]
    fn test_rejects_missing_fields() {
        let json = br#"{"userId":"a","ops":[{"retain":1}]}"#;
        assert!(matches!(
            AuthoredOperation::from_bytes(json),
            Err(OtError::MalformedOperation(_))
        ));

        let json = br#"{"baseLength":1,"ops":[{"retain":1}]}"#;
        assert!(matches!(
            AuthoredOperation::from_bytes(json),
            Err(OtError::MalformedOperation(_))
        ));
    }

    #[test]
    fn test_rejects_empty_components() {
        for json in [
            br#"{"userId":"a","baseLength":0,"ops":[{"retain":0}]}"#.as_slice(),
            br#"{"userId":"a","baseLength":0,"ops":[{"insert":""}]}"#.as_slice(),
        ] {
            assert!(matches!(
                AuthoredOperation::from_bytes(json),
                Err(OtError::MalformedOperation(_))
            ));
        }
    }

    #[test]
    fn test_rejects_wrong_base_length() {
        let json = br#"{"userId":"a","baseLength":4,"ops":[{"retain":2},{"delete":1}]}"#;
        assert!(matches!(
            AuthoredOperation::from_bytes(json),
            Err(OtError::MalformedOperation(_))
        ));
    }

    #[test]
    fn test_rejects_length_overflow() {
        for json in [
            br#"{"userId":"a","baseLength":0,"ops":[{"retain":18446744073709551615},{"retain":1}]}"#.as_slice(),
            br#"{"userId":"a","baseLength":0,"ops":[{"delete":18446744073709551615},{"retain":2}]}"#.as_slice(),
            br#"{"userId":"a","baseLength":0,"ops":[{"retain":18446744073709551615},{"delete":1}]}"#.as_slice(),
        ] {
            assert!(matches!(
                AuthoredOperation::from_bytes(json),
                Err(OtError::MalformedOperation(_))
            ));
        }
    }

    #[test]
    fn test_rejects_unknown_component() {
        let json = br#"{"userId":"a","baseLength":1,"ops":[{"skip":1}]}"#;
        assert!(AuthoredOperation::from_bytes(json).is_err());
    }

    #[test]
    fn test_decoding_normalizes() {
        let json = br#"{"userId":"a","baseLength":3,"ops":[{"retain":1},{"retain":1},{"delete":1},{"insert":"x"}]}"#;
        let authored = AuthoredOperation::from_bytes(json).unwrap();
        assert_eq!(
            authored.operation.components(),
            &[
                Component::Retain(2),
                Component::Insert("x".to_string()),
                Component::Delete(1),
            ]
        );
    }
}
