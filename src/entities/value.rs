//! Property values held by entities

use crate::entities::schema::EnumValue;
use crate::entities::EntityId;

/// Runtime value of an entity property
///
/// Nested entities are stored as arena ids, so values are cheap to clone and
/// never own other entities.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Declared but unset, or degraded during extraction
    Null,
    /// Primitive passthrough, or a raw fragment that did not describe an entity
    Value(serde_json::Value),
    /// Resolved enum member
    Enum(EnumValue),
    /// Single nested entity
    Entity(EntityId),
    /// Ordered collection; elements are entities or raw fragments
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Truthiness check shared by equivalence, merge and serialization
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Null => true,
            PropertyValue::Value(value) => json_is_empty(value),
            PropertyValue::Enum(_) | PropertyValue::Entity(_) => false,
            PropertyValue::List(items) => items.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Value(serde_json::Value::String(s)) => Some(s),
            PropertyValue::Enum(e) => Some(e.label),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            PropertyValue::Entity(id) => Some(*id),
            _ => None,
        }
    }

    /// Entity ids directly held by this value
    pub fn entity_ids(&self) -> Vec<EntityId> {
        match self {
            PropertyValue::Entity(id) => vec![*id],
            PropertyValue::List(items) => items.iter().filter_map(|v| v.as_entity()).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            other => PropertyValue::Value(other),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Value(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Value(serde_json::Value::String(value))
    }
}

impl From<EntityId> for PropertyValue {
    fn from(id: EntityId) -> Self {
        PropertyValue::Entity(id)
    }
}

impl From<EnumValue> for PropertyValue {
    fn from(value: EnumValue) -> Self {
        PropertyValue::Enum(value)
    }
}

/// JSON truthiness: null, "", false, 0, [] and {} are empty
pub fn json_is_empty(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emptiness() {
        assert!(PropertyValue::Null.is_empty());
        assert!(PropertyValue::from("").is_empty());
        assert!(PropertyValue::from(json!(false)).is_empty());
        assert!(PropertyValue::from(json!(0)).is_empty());
        assert!(PropertyValue::from(json!({})).is_empty());
        assert!(PropertyValue::List(vec![]).is_empty());

        assert!(!PropertyValue::from("web01").is_empty());
        assert!(!PropertyValue::from(json!(true)).is_empty());
        assert!(!PropertyValue::from(json!(443)).is_empty());
        assert!(!PropertyValue::Entity(EntityId(0)).is_empty());
    }

    #[test]
    fn test_json_null_becomes_null() {
        assert_eq!(PropertyValue::from(json!(null)), PropertyValue::Null);
    }

    #[test]
    fn test_entity_ids() {
        let list = PropertyValue::List(vec![
            PropertyValue::Entity(EntityId(1)),
            PropertyValue::from(json!({"Foo": "bar"})),
            PropertyValue::Entity(EntityId(3)),
        ]);
        assert_eq!(list.entity_ids(), vec![EntityId(1), EntityId(3)]);
        assert!(PropertyValue::from("x").entity_ids().is_empty());
    }
}
