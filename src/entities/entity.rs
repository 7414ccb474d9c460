//! Typed entity instances
//!
//! An entity always carries its kind (exposed as the `Type` property) and an
//! `AdditionalData` bag. Schema-declared properties and any extra properties
//! assigned directly live in a string-keyed map.

use crate::entities::graph::Edge;
use crate::entities::{EntityKind, PropertyValue};
use crate::error::{EntityError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved raw key carrying the kind name of a self-describing record
pub const TYPE_KEY: &str = "Type";

/// Reserved raw key carrying the opaque side-channel bag
pub const ADDITIONAL_DATA_KEY: &str = "AdditionalData";

/// Stable index of an entity inside its [`EntityStore`](crate::entities::EntityStore)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed record and graph node
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    type_value: PropertyValue,
    additional_data: PropertyValue,
    properties: BTreeMap<String, PropertyValue>,
    pub(crate) edges: Vec<Edge>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            type_value: PropertyValue::from(kind.name()),
            additional_data: PropertyValue::Value(serde_json::Value::Object(
                serde_json::Map::new(),
            )),
            properties: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Value of the `Type` property
    pub fn type_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn additional_data(&self) -> &serde_json::Map<String, serde_json::Value> {
        match &self.additional_data {
            PropertyValue::Value(serde_json::Value::Object(map)) => map,
            _ => unreachable!("AdditionalData is always an object"),
        }
    }

    pub fn set_additional_data(&mut self, data: serde_json::Map<String, serde_json::Value>) {
        self.additional_data = PropertyValue::Value(serde_json::Value::Object(data));
    }

    /// Read a property
    ///
    /// Returns `Ok(None)` for declared attributes that were never set and an
    /// `UndeclaredAttribute` error for names the kind does not know.
    pub fn get(&self, name: &str) -> Result<Option<&PropertyValue>> {
        match name {
            TYPE_KEY => return Ok(Some(&self.type_value)),
            ADDITIONAL_DATA_KEY => return Ok(Some(&self.additional_data)),
            _ => {}
        }

        if let Some(value) = self.properties.get(name) {
            return Ok(Some(value));
        }
        if self.kind.declares(name) {
            return Ok(None);
        }
        Err(EntityError::UndeclaredAttribute {
            kind: self.kind.name().to_string(),
            attribute: name.to_string(),
        })
    }

    /// Read a property as a string (plain strings and enum labels)
    pub fn get_str(&self, name: &str) -> Result<Option<&str>> {
        Ok(self.get(name)?.and_then(|v| v.as_str()))
    }

    /// Assign a property, declared or not
    ///
    /// `Type` cannot be reassigned. `AdditionalData` only accepts an object.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        let name = name.into();
        let value = value.into();

        match name.as_str() {
            TYPE_KEY => {
                tracing::warn!("Ignoring attempt to change the type of {} entity", self.kind);
            }
            ADDITIONAL_DATA_KEY => match value {
                PropertyValue::Value(serde_json::Value::Object(map)) => {
                    self.set_additional_data(map)
                }
                PropertyValue::Null => self.set_additional_data(serde_json::Map::new()),
                other => {
                    tracing::warn!("Ignoring non-object AdditionalData: {:?}", other);
                }
            },
            _ => {
                self.properties.insert(name, value);
            }
        }
    }

    /// All set properties, excluding `Type` and `AdditionalData`
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Non-empty properties including `Type` and a non-empty `AdditionalData`
    pub(crate) fn non_empty_properties(&self) -> BTreeMap<&str, &PropertyValue> {
        let mut props: BTreeMap<&str, &PropertyValue> = self
            .properties
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        props.insert(TYPE_KEY, &self.type_value);
        if !self.additional_data.is_empty() {
            props.insert(ADDITIONAL_DATA_KEY, &self.additional_data);
        }
        props
    }

    /// Property value or `Null` when unset, without schema checking
    pub(crate) fn value_or_null(&self, name: &str) -> &PropertyValue {
        static NULL: PropertyValue = PropertyValue::Null;
        match name {
            TYPE_KEY => &self.type_value,
            ADDITIONAL_DATA_KEY => &self.additional_data,
            _ => self.properties.get(name).unwrap_or(&NULL),
        }
    }

    /// Edges registered on this entity
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}
