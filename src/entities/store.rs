//! Entity arena, factory and schema-driven property extraction
//!
//! Entities are owned by an [`EntityStore`] and addressed by [`EntityId`].
//! Nested entities resolved during extraction are stored in the same arena,
//! and the owning entity is linked to each of them with a `{name: attribute}`
//! edge.
//!
//! Extraction is lenient: missing attributes are skipped, unmapped enum values
//! become `Null` and fragments that do not describe an entity are kept as raw
//! values. Only an unregistered kind tag at the top level is an error.

use crate::config::ExtractionConfig;
use crate::entities::entity::{ADDITIONAL_DATA_KEY, TYPE_KEY};
use crate::entities::graph::EdgeAttrs;
use crate::entities::schema::{Descriptor, EnumRef};
use crate::entities::{Entity, EntityId, EntityKind, PropertyValue};
use crate::error::{EntityError, Result};

/// Default bound on nested entity resolution
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Outcome of the factory: a typed entity or the raw fragment passed through
#[derive(Debug, Clone, PartialEq)]
pub enum Instantiated {
    Entity(EntityId),
    Raw(serde_json::Value),
}

impl Instantiated {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Instantiated::Entity(id) => Some(*id),
            Instantiated::Raw(_) => None,
        }
    }

    pub fn is_entity(&self) -> bool {
        self.entity().is_some()
    }
}

impl From<Instantiated> for PropertyValue {
    fn from(result: Instantiated) -> Self {
        match result {
            Instantiated::Entity(id) => PropertyValue::Entity(id),
            Instantiated::Raw(raw) => PropertyValue::from(raw),
        }
    }
}

/// Arena owning every entity built from raw records
#[derive(Debug, Clone)]
pub struct EntityStore {
    entities: Vec<Entity>,
    max_depth: usize,
}

impl EntityStore {
    /// Create an empty store with the default depth bound
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            entities: Vec::new(),
            max_depth,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::with_max_depth(config.max_depth)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(id.0)
            .ok_or(EntityError::UnknownEntity { id: id.0 })
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities
            .get_mut(id.0)
            .ok_or(EntityError::UnknownEntity { id: id.0 })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Ids of all entities of one kind, in creation order
    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.kind() == kind)
            .map(|e| e.id())
            .collect()
    }

    /// Follow a single-entity property
    pub fn get_entity(&self, id: EntityId, attribute: &str) -> Result<Option<EntityId>> {
        Ok(self
            .entity(id)?
            .get(attribute)?
            .and_then(|value| value.as_entity()))
    }

    /// Create an entity with no properties
    pub fn create_empty(&mut self, kind: EntityKind) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(Entity::new(id, kind));
        id
    }

    /// Construct `kind` from a raw mapping, then apply direct overrides
    ///
    /// Overrides take precedence over anything extracted from `raw`.
    pub fn create<I, S>(&mut self, kind: EntityKind, raw: &serde_json::Value, overrides: I) -> EntityId
    where
        I: IntoIterator<Item = (S, PropertyValue)>,
        S: Into<String>,
    {
        let id = self.build(kind, raw, 0);
        for (name, value) in overrides {
            self.assign(id, name.into(), value);
        }
        id
    }

    /// Factory entry point
    ///
    /// Without a `Type` tag and without an explicit kind the raw value is
    /// returned unchanged. An explicit kind wins over the tag.
    /// A tag that is not a string cannot name a kind and is rejected like an
    /// unregistered one.
    pub fn instantiate(
        &mut self,
        raw: &serde_json::Value,
        explicit_kind: Option<EntityKind>,
    ) -> Result<Instantiated> {
        self.instantiate_at(raw, explicit_kind, 0)
    }

    /// Factory entry point taking the explicit kind by name
    pub fn instantiate_named(
        &mut self,
        raw: &serde_json::Value,
        kind_name: Option<&str>,
    ) -> Result<Instantiated> {
        let explicit_kind = kind_name.map(EntityKind::from_name).transpose()?;
        self.instantiate(raw, explicit_kind)
    }

    fn instantiate_at(
        &mut self,
        raw: &serde_json::Value,
        explicit_kind: Option<EntityKind>,
        depth: usize,
    ) -> Result<Instantiated> {
        let kind = match (explicit_kind, raw.get(TYPE_KEY)) {
            (Some(kind), _) => kind,
            (None, Some(serde_json::Value::String(name))) => EntityKind::from_name(name)?,
            (None, None | Some(serde_json::Value::Null)) => {
                return Ok(Instantiated::Raw(raw.clone()))
            }
            (None, Some(other)) => {
                return Err(EntityError::UnknownEntityType {
                    name: other.to_string(),
                })
            }
        };

        if !raw.is_object() {
            tracing::debug!("Passing through non-mapping value for {} entity", kind);
            return Ok(Instantiated::Raw(raw.clone()));
        }

        Ok(Instantiated::Entity(self.build(kind, raw, depth)))
    }

    fn build(&mut self, kind: EntityKind, raw: &serde_json::Value, depth: usize) -> EntityId {
        let id = self.create_empty(kind);
        if let Some(map) = raw.as_object() {
            self.extract_into(id, map, depth);
        }
        id
    }

    /// Pull schema attributes out of `raw` into the entity `id`
    fn extract_into(
        &mut self,
        id: EntityId,
        raw: &serde_json::Map<String, serde_json::Value>,
        depth: usize,
    ) {
        let kind = self.entities[id.0].kind();

        for (attribute, descriptor) in kind.schema() {
            let Some(raw_value) = raw.get(*attribute) else {
                continue;
            };

            let value = match descriptor {
                Descriptor::Primitive => PropertyValue::from(raw_value.clone()),
                Descriptor::Enum(enum_ref) => Self::resolve_enum(kind, attribute, enum_ref, raw_value),
                Descriptor::Entity(nested_kind) => {
                    let value = self.resolve_nested(raw_value, Some(*nested_kind), depth + 1);
                    if let Some(child) = value.as_entity() {
                        self.link(id, child, attribute);
                    }
                    value
                }
                Descriptor::Collection(element_kind) => {
                    self.resolve_collection(id, attribute, raw_value, *element_kind, depth + 1)
                }
            };

            self.entities[id.0].set(*attribute, value);
        }

        match raw.get(ADDITIONAL_DATA_KEY) {
            Some(serde_json::Value::Object(data)) => {
                self.entities[id.0].set_additional_data(data.clone());
            }
            Some(other) => {
                tracing::debug!(
                    "Ignoring non-mapping {} for {} entity: {}",
                    ADDITIONAL_DATA_KEY,
                    kind,
                    other
                );
            }
            None => {}
        }
    }

    fn resolve_enum(
        kind: EntityKind,
        attribute: &str,
        enum_ref: &EnumRef,
        raw_value: &serde_json::Value,
    ) -> PropertyValue {
        match enum_ref.table().and_then(|table| table.lookup(raw_value)) {
            Some(member) => PropertyValue::Enum(member),
            None => {
                tracing::debug!(
                    "Invalid enum value {} for {}.{}, leaving it empty",
                    raw_value,
                    kind,
                    attribute
                );
                PropertyValue::Null
            }
        }
    }

    fn resolve_collection(
        &mut self,
        owner: EntityId,
        attribute: &str,
        raw_value: &serde_json::Value,
        element_kind: Option<EntityKind>,
        depth: usize,
    ) -> PropertyValue {
        let Some(elements) = raw_value.as_array() else {
            tracing::debug!(
                "Expected a sequence for collection attribute {}, got {}",
                attribute,
                raw_value
            );
            return PropertyValue::Null;
        };

        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self.resolve_nested(element, element_kind, depth);
            if let Some(child) = value.as_entity() {
                self.link(owner, child, attribute);
            }
            items.push(value);
        }
        PropertyValue::List(items)
    }

    /// Instantiate a nested value, absorbing errors and honoring the depth bound
    fn resolve_nested(
        &mut self,
        raw_value: &serde_json::Value,
        kind: Option<EntityKind>,
        depth: usize,
    ) -> PropertyValue {
        if depth > self.max_depth {
            tracing::warn!(
                "Nested entity depth {} exceeds limit {}, keeping raw value",
                depth,
                self.max_depth
            );
            return PropertyValue::from(raw_value.clone());
        }

        match self.instantiate_at(raw_value, kind, depth) {
            Ok(result) => result.into(),
            Err(e) => {
                tracing::warn!("Keeping raw value for nested entity: {}", e);
                PropertyValue::from(raw_value.clone())
            }
        }
    }

    fn link(&mut self, owner: EntityId, child: EntityId, attribute: &str) {
        if let Err(e) = self.add_edge(owner, child, EdgeAttrs::named(attribute)) {
            tracing::warn!("Failed to link {} to {}: {}", owner, child, e);
        }
    }

    fn unlink(&mut self, owner: EntityId, child: EntityId, attribute: &str) {
        let back_reference = child != owner
            && self
                .entities
                .get(child.0)
                .is_some_and(|c| c.value_or_null(attribute).entity_ids().contains(&owner));
        if back_reference {
            return;
        }
        tracing::debug!("Unlinking {} from {} ({})", child, owner, attribute);
        if let Err(e) = self.remove_edge(owner, child, &EdgeAttrs::named(attribute)) {
            tracing::warn!("Failed to unlink {} from {}: {}", owner, child, e);
        }
    }

    /// Direct assignment that also links nested entity values
    ///
    /// Children held by the replaced value lose their `{name}` edge unless
    /// the new value still holds them, or they refer back to `id` under the
    /// same attribute themselves.
    pub(crate) fn assign(&mut self, id: EntityId, name: String, value: PropertyValue) {
        let Some(previous) = self
            .entities
            .get(id.0)
            .map(|e| e.value_or_null(&name).entity_ids())
        else {
            return;
        };
        let kept = value.entity_ids();
        for old in previous.into_iter().filter(|old| !kept.contains(old)) {
            self.unlink(id, old, &name);
        }
        for child in kept {
            self.link(id, child, &name);
        }
        if let Some(entity) = self.entities.get_mut(id.0) {
            entity.set(name, value);
        }
    }

    /// Assign a property on a stored entity, linking any nested entities
    pub fn set_property(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        self.entity(id)?;
        self.assign(id, name.into(), value.into());
        Ok(())
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_host() {
        let mut store = EntityStore::new();
        let raw = json!({"Type": "host", "HostName": "web01", "AdditionalData": {}});
        let id = store
            .instantiate(&raw, Some(EntityKind::Host))
            .unwrap()
            .entity()
            .unwrap();

        let host = store.entity(id).unwrap();
        assert_eq!(host.type_name(), "host");
        assert_eq!(host.get_str("HostName").unwrap(), Some("web01"));
        assert!(host.additional_data().is_empty());
    }

    #[test]
    fn test_passthrough_without_tag() {
        let mut store = EntityStore::new();
        let raw = json!({"Foo": "bar"});
        let result = store.instantiate(&raw, None).unwrap();
        assert_eq!(result, Instantiated::Raw(raw));
        assert!(store.is_empty());
    }

    #[test]
    fn test_tag_lookup() {
        let mut store = EntityStore::new();
        let result = store
            .instantiate(&json!({"Type": "ipaddress", "Address": "10.0.0.1"}), None)
            .unwrap();
        let ip = store.entity(result.entity().unwrap()).unwrap();
        assert_eq!(ip.kind(), EntityKind::IpAddress);
    }

    #[test]
    fn test_explicit_kind_wins_over_tag() {
        let mut store = EntityStore::new();
        let result = store
            .instantiate(
                &json!({"Type": "account", "HostName": "web01"}),
                Some(EntityKind::Host),
            )
            .unwrap();
        let entity = store.entity(result.entity().unwrap()).unwrap();
        assert_eq!(entity.kind(), EntityKind::Host);
        assert_eq!(entity.get_str("HostName").unwrap(), Some("web01"));
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let mut store = EntityStore::new();
        let err = store
            .instantiate(&json!({"Type": "starship"}), None)
            .unwrap_err();
        assert!(matches!(err, EntityError::UnknownEntityType { .. }));
    }

    #[test]
    fn test_unknown_explicit_name_is_an_error() {
        let mut store = EntityStore::new();
        let err = store
            .instantiate_named(&json!({"HostName": "web01"}), Some("starship"))
            .unwrap_err();
        assert!(matches!(err, EntityError::UnknownEntityType { .. }));
    }

    #[test]
    fn test_missing_attributes_are_skipped() {
        let mut store = EntityStore::new();
        let id = store.create(EntityKind::Host, &json!({"HostName": "web01"}), Vec::<(String, PropertyValue)>::new());
        let host = store.entity(id).unwrap();
        assert_eq!(host.properties().count(), 1);
        assert!(host.get("DnsDomain").unwrap().is_none());
    }

    #[test]
    fn test_enum_resolution() {
        let mut store = EntityStore::new();
        let id = store
            .instantiate(&json!({"Type": "host", "OSFamily": "Windows"}), None)
            .unwrap()
            .entity()
            .unwrap();
        let host = store.entity(id).unwrap();
        match host.get("OSFamily").unwrap() {
            Some(PropertyValue::Enum(member)) => {
                assert_eq!(member.label, "Windows");
                assert_eq!(member.code, 1);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_enum_degrades_to_null() {
        let mut store = EntityStore::new();
        let id = store
            .instantiate(
                &json!({"Type": "filehash", "Algorithm": "CRC32", "Value": "abc"}),
                None,
            )
            .unwrap()
            .entity()
            .unwrap();
        let hash = store.entity(id).unwrap();
        assert_eq!(hash.get("Algorithm").unwrap(), Some(&PropertyValue::Null));
        assert_eq!(hash.get_str("Value").unwrap(), Some("abc"));
    }

    #[test]
    fn test_nested_entity_and_edge() {
        let mut store = EntityStore::new();
        let raw = json!({
            "Type": "account",
            "Name": "alice",
            "Host": {"HostName": "web01"}
        });
        let account = store.instantiate(&raw, None).unwrap().entity().unwrap();
        let host = store.get_entity(account, "Host").unwrap().unwrap();

        assert_eq!(store.entity(host).unwrap().kind(), EntityKind::Host);
        let edges = store.entity(account).unwrap().edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].name(), Some("Host"));
        assert_eq!(store.entity(host).unwrap().edges().len(), 1);
    }

    #[test]
    fn test_collection_with_declared_kind() {
        let mut store = EntityStore::new();
        let raw = json!({
            "Type": "dns",
            "DomainName": "example.com",
            "IpAddresses": [{"Address": "10.0.0.1"}, {"Address": "10.0.0.2"}]
        });
        let dns = store.instantiate(&raw, None).unwrap().entity().unwrap();
        let entity = store.entity(dns).unwrap();

        let Some(PropertyValue::List(items)) = entity.get("IpAddresses").unwrap() else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(entity.edges().len(), 2);
    }

    #[test]
    fn test_self_describing_collection() {
        let mut store = EntityStore::new();
        let raw = json!({
            "Type": "alert",
            "DisplayName": "Suspicious logon",
            "Entities": [
                {"Type": "host", "HostName": "web01"},
                {"Type": "account", "Name": "alice"},
                {"Foo": "bar"},
                {"Type": "starship"}
            ]
        });
        let alert = store.instantiate(&raw, None).unwrap().entity().unwrap();
        let entity = store.entity(alert).unwrap();

        let Some(PropertyValue::List(items)) = entity.get("Entities").unwrap() else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 4);
        assert!(items[0].as_entity().is_some());
        assert!(items[1].as_entity().is_some());
        assert_eq!(items[2], PropertyValue::from(json!({"Foo": "bar"})));
        assert_eq!(items[3], PropertyValue::from(json!({"Type": "starship"})));
        assert_eq!(entity.edges().len(), 2);
    }

    #[test]
    fn test_non_sequence_collection_is_null() {
        let mut store = EntityStore::new();
        let dns = store.create(
            EntityKind::Dns,
            &json!({"IpAddresses": "10.0.0.1"}),
            Vec::<(String, PropertyValue)>::new(),
        );
        assert_eq!(
            store.entity(dns).unwrap().get("IpAddresses").unwrap(),
            Some(&PropertyValue::Null)
        );
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut store = EntityStore::new();
        let id = store.create(
            EntityKind::Host,
            &json!({"HostName": "web01"}),
            vec![
                ("HostName", PropertyValue::from("web02")),
                ("Owner", PropertyValue::from("ops")),
            ],
        );
        let host = store.entity(id).unwrap();
        assert_eq!(host.get_str("HostName").unwrap(), Some("web02"));
        assert_eq!(host.get_str("Owner").unwrap(), Some("ops"));
    }

    #[test]
    fn test_additional_data_copied() {
        let mut store = EntityStore::new();
        let id = store.create(
            EntityKind::Host,
            &json!({"HostName": "web01", "AdditionalData": {"Source": "MDE"}}),
            Vec::<(String, PropertyValue)>::new(),
        );
        assert_eq!(store.entity(id).unwrap().additional_data()["Source"], "MDE");
    }

    #[test]
    fn test_depth_bound() {
        let mut store = EntityStore::with_max_depth(2);
        let raw = json!({
            "Type": "process",
            "ProcessId": "1",
            "ParentProcess": {
                "ProcessId": "2",
                "ParentProcess": {
                    "ProcessId": "3",
                    "ParentProcess": {"ProcessId": "4"}
                }
            }
        });
        let root = store.instantiate(&raw, None).unwrap().entity().unwrap();
        let parent = store.get_entity(root, "ParentProcess").unwrap().unwrap();
        let grandparent = store.get_entity(parent, "ParentProcess").unwrap().unwrap();

        assert_eq!(store.len(), 3);
        let cut = store
            .entity(grandparent)
            .unwrap()
            .get("ParentProcess")
            .unwrap()
            .unwrap();
        assert_eq!(cut, &PropertyValue::from(json!({"ProcessId": "4"})));
    }

    #[test]
    fn test_ids_of_kind() {
        let mut store = EntityStore::new();
        store.create_empty(EntityKind::Host);
        store.create_empty(EntityKind::Account);
        store.create_empty(EntityKind::Host);
        assert_eq!(store.ids_of_kind(EntityKind::Host).len(), 2);
    }

    #[test]
    fn test_non_string_tag_is_an_error() {
        let mut store = EntityStore::new();
        let err = store
            .instantiate(&json!({"Type": 5, "HostName": "web01"}), None)
            .unwrap_err();
        match err {
            EntityError::UnknownEntityType { name } => assert_eq!(name, "5"),
            other => panic!("expected unknown type, got {:?}", other),
        }
        assert!(store.is_empty());

        // an explicit kind still wins, and a null tag means no tag
        let result = store
            .instantiate(&json!({"Type": 5, "HostName": "web01"}), Some(EntityKind::Host))
            .unwrap();
        assert!(result.is_entity());
        let raw = json!({"Type": null, "Foo": "bar"});
        assert_eq!(store.instantiate(&raw, None).unwrap(), Instantiated::Raw(raw));
    }

    #[test]
    fn test_nested_non_string_tag_is_absorbed() {
        let mut store = EntityStore::new();
        let raw = json!({
            "Type": "alert",
            "DisplayName": "x",
            "Entities": [{"Type": ["host"], "HostName": "web01"}]
        });
        let alert = store.instantiate(&raw, None).unwrap().entity().unwrap();
        let Some(PropertyValue::List(items)) = store.entity(alert).unwrap().get("Entities").unwrap()
        else {
            panic!("expected list");
        };
        assert_eq!(
            items[0],
            PropertyValue::from(json!({"Type": ["host"], "HostName": "web01"}))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_non_mapping_additional_data_is_ignored() {
        let mut store = EntityStore::new();
        let id = store.create(
            EntityKind::Host,
            &json!({"HostName": "web01", "AdditionalData": "MDE"}),
            Vec::<(String, PropertyValue)>::new(),
        );
        let host = store.entity(id).unwrap();
        assert!(host.additional_data().is_empty());
        assert_eq!(host.get_str("HostName").unwrap(), Some("web01"));
    }

    #[test]
    fn test_reassignment_drops_old_edge() {
        let mut store = EntityStore::new();
        let account = store.create_empty(EntityKind::Account);
        let old_host = store.create_empty(EntityKind::Host);
        let new_host = store.create_empty(EntityKind::Host);

        store.set_property(account, "Host", old_host).unwrap();
        store.set_property(account, "Host", new_host).unwrap();

        let edges = store.entity(account).unwrap().edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].other(account), new_host);
        assert!(store.entity(old_host).unwrap().edges().is_empty());

        // clearing the property removes the remaining edge
        store.set_property(account, "Host", PropertyValue::Null).unwrap();
        assert!(store.entity(account).unwrap().edges().is_empty());
        assert!(store.entity(new_host).unwrap().edges().is_empty());
    }

    #[test]
    fn test_reassignment_keeps_shared_edges() {
        let mut store = EntityStore::new();
        let a = store.create_empty(EntityKind::Process);
        let b = store.create_empty(EntityKind::Process);
        let c = store.create_empty(EntityKind::Process);
        store.set_property(a, "ParentProcess", b).unwrap();
        store.set_property(b, "ParentProcess", a).unwrap();

        // b still names a as its parent, so the edge between them stays
        store.set_property(a, "ParentProcess", c).unwrap();
        assert_eq!(store.entity(b).unwrap().edges().len(), 1);
        assert_eq!(store.entity(a).unwrap().edges().len(), 2);

        // list values keep edges to elements that survive the reassignment
        let dns = store.create_empty(EntityKind::Dns);
        let ip1 = store.create_empty(EntityKind::IpAddress);
        let ip2 = store.create_empty(EntityKind::IpAddress);
        store
            .set_property(dns, "IpAddresses", PropertyValue::List(vec![ip1.into(), ip2.into()]))
            .unwrap();
        store
            .set_property(dns, "IpAddresses", PropertyValue::List(vec![ip2.into()]))
            .unwrap();
        let edges = store.entity(dns).unwrap().edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].other(dns), ip2);
    }
}
