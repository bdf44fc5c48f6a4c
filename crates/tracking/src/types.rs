//! Wire-level types for the tracking database interface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a remote entity: type name plus numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: i64,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }

    /// The JSON link form used in filters and field data.
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "type": self.entity_type, "id": self.id })
    }
}

/// Field name → value map carried by create/update calls and results.
pub type FieldData = BTreeMap<String, Value>;

/// A remote record: its reference plus the fields that were requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub entity: EntityRef,
    pub data: FieldData,
}

impl Record {
    /// Fetch a field as an i64, tolerating absent or null values.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.data.get(field).and_then(Value::as_i64)
    }

    /// Fetch a field as a string slice.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

/// Filter operator for find calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Is,
    In,
}

/// One filter triple: `field op value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn is(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Is,
            value: value.into(),
        }
    }

    pub fn is_entity(field: impl Into<String>, entity: &EntityRef) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Is,
            value: entity.to_value(),
        }
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            value: Value::Array(values),
        }
    }
}

/// One operation inside a combined batch call.
///
/// Creates carry an optional correlation id that the backend echoes back
/// on the matching result, so callers can pair created entities with the
/// objects that requested them without comparing payload fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request_type", rename_all = "snake_case")]
pub enum BatchRequest {
    Create {
        entity_type: String,
        data: FieldData,
        #[serde(default)]
        correlation: Option<String>,
    },
    Update {
        entity_type: String,
        id: i64,
        data: FieldData,
    },
}

/// Result of one batch operation, in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub entity: EntityRef,
    pub data: FieldData,
    /// Echoed from the originating create request.
    pub correlation: Option<String>,
}

/// Remote server capability report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCaps {
    pub version: (u32, u32, u32),
}

/// Minimum server version carrying the Cut / CutItem schema.
pub const CUT_SUPPORT_VERSION: (u32, u32, u32) = (7, 0, 0);

impl ServerCaps {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            version: (major, minor, patch),
        }
    }

    /// Whether the server understands Cut and CutItem entities.
    pub fn supports_cuts(&self) -> bool {
        self.version >= CUT_SUPPORT_VERSION
    }
}

/// Resolved working context for a Shot: project, entity, optional task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotContext {
    pub project: EntityRef,
    pub entity: EntityRef,
    pub task: Option<EntityRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_gate() {
        assert!(ServerCaps::new(7, 0, 0).supports_cuts());
        assert!(ServerCaps::new(8, 3, 1).supports_cuts());
        assert!(!ServerCaps::new(6, 3, 20).supports_cuts());
    }

    #[test]
    fn test_entity_ref_link_form() {
        let link = EntityRef::new("Shot", 42).to_value();
        assert_eq!(link["type"], "Shot");
        assert_eq!(link["id"], 42);
    }

    #[test]
    fn test_batch_request_serializes_correlation() {
        let req = BatchRequest::Create {
            entity_type: "Version".to_string(),
            data: FieldData::new(),
            correlation: Some("renders/010.exr".to_string()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["request_type"], "create");
        assert_eq!(json["correlation"], "renders/010.exr");
    }
}
