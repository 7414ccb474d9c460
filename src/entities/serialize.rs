//! Entity to plain nested map conversion

use crate::entities::entity::{ADDITIONAL_DATA_KEY, TYPE_KEY};
use crate::entities::{EntityId, EntityStore, PropertyValue};
use crate::error::{EntityError, Result};
use serde_json::{Map, Value};

impl EntityStore {
    /// Plain nested map of an entity
    ///
    /// Empty values are omitted, nested entities become nested maps and enum
    /// values their labels. A reference back to an entity already being
    /// serialized on the current path is omitted, and so is anything nested
    /// deeper than the store's depth bound.
    pub fn to_plain_map(&self, id: EntityId) -> Result<Map<String, Value>> {
        let mut path = Vec::new();
        self.plain_map(id, &mut path)
    }

    /// JSON text of [`to_plain_map`](Self::to_plain_map)
    pub fn to_json_string(&self, id: EntityId, pretty: bool) -> Result<String> {
        let map = Value::Object(self.to_plain_map(id)?);
        let rendered = if pretty {
            serde_json::to_string_pretty(&map)
        } else {
            serde_json::to_string(&map)
        };
        rendered.map_err(|e| EntityError::Json {
            source: e,
            context: format!("Failed to render entity {}", id),
        })
    }

    fn plain_map(&self, id: EntityId, path: &mut Vec<EntityId>) -> Result<Map<String, Value>> {
        let entity = self.entity(id)?;
        path.push(id);

        let mut map = Map::new();
        map.insert(
            TYPE_KEY.to_string(),
            Value::String(entity.type_name().to_string()),
        );

        let mut names: Vec<&str> = entity
            .kind()
            .schema()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        names.extend(
            entity
                .properties()
                .map(|(name, _)| name)
                .filter(|name| !entity.kind().declares(name)),
        );

        for name in names {
            let value = entity.value_or_null(name);
            if value.is_empty() {
                continue;
            }
            if let Some(plain) = self.plain_value(value, path)? {
                map.insert(name.to_string(), plain);
            }
        }

        if !entity.additional_data().is_empty() {
            map.insert(
                ADDITIONAL_DATA_KEY.to_string(),
                Value::Object(entity.additional_data().clone()),
            );
        }

        path.pop();
        Ok(map)
    }

    fn plain_value(&self, value: &PropertyValue, path: &mut Vec<EntityId>) -> Result<Option<Value>> {
        let plain = match value {
            PropertyValue::Null => None,
            PropertyValue::Value(v) => Some(v.clone()),
            PropertyValue::Enum(e) => Some(Value::String(e.label.to_string())),
            PropertyValue::Entity(child) => {
                if path.contains(child) {
                    tracing::trace!("Omitting back-reference to {}", child);
                    None
                } else if path.len() > self.max_depth() {
                    tracing::warn!(
                        "Nested entity depth {} exceeds limit {}, omitting {}",
                        path.len(),
                        self.max_depth(),
                        child
                    );
                    None
                } else {
                    Some(Value::Object(self.plain_map(*child, path)?))
                }
            }
            PropertyValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_empty() {
                        continue;
                    }
                    if let Some(plain) = self.plain_value(item, path)? {
                        out.push(plain);
                    }
                }
                (!out.is_empty()).then_some(Value::Array(out))
            }
        };
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityKind;
    use serde_json::json;

    #[test]
    fn test_empty_values_are_omitted() {
        let mut store = EntityStore::new();
        let id = store.create(
            EntityKind::Host,
            &json!({"HostName": "web01", "DnsDomain": "", "IsDomainJoined": false}),
            Vec::<(String, PropertyValue)>::new(),
        );
        let map = store.to_plain_map(id).unwrap();
        assert_eq!(
            Value::Object(map),
            json!({"Type": "host", "HostName": "web01"})
        );
    }

    #[test]
    fn test_nested_entities_become_maps() {
        let mut store = EntityStore::new();
        let raw = json!({
            "Type": "dns",
            "DomainName": "example.com",
            "IpAddresses": [{"Address": "10.0.0.1"}],
            "DnsServerIp": {"Address": "8.8.8.8"}
        });
        let id = store.instantiate(&raw, None).unwrap().entity().unwrap();
        let map = Value::Object(store.to_plain_map(id).unwrap());

        assert_eq!(
            map,
            json!({
                "Type": "dns",
                "DomainName": "example.com",
                "IpAddresses": [{"Type": "ipaddress", "Address": "10.0.0.1"}],
                "DnsServerIp": {"Type": "ipaddress", "Address": "8.8.8.8"}
            })
        );
    }

    #[test]
    fn test_enum_rendered_as_label() {
        let mut store = EntityStore::new();
        let id = store
            .instantiate(
                &json!({"Type": "filehash", "Algorithm": 3, "Value": "ab12"}),
                None,
            )
            .unwrap()
            .entity()
            .unwrap();
        let map = store.to_plain_map(id).unwrap();
        assert_eq!(map["Algorithm"], "SHA256");
    }

    #[test]
    fn test_cycle_back_reference_omitted() {
        let mut store = EntityStore::new();
        let account = store.create_empty(EntityKind::Account);
        let host = store.create_empty(EntityKind::Host);
        store.set_property(account, "Name", "alice").unwrap();
        store.set_property(account, "Host", host).unwrap();
        store.set_property(host, "HostName", "web01").unwrap();
        store.set_property(host, "Owner", account).unwrap();

        let map = Value::Object(store.to_plain_map(account).unwrap());
        assert_eq!(
            map,
            json!({
                "Type": "account",
                "Name": "alice",
                "Host": {"Type": "host", "HostName": "web01"}
            })
        );
    }

    #[test]
    fn test_additional_data_and_extras() {
        let mut store = EntityStore::new();
        let id = store.create(
            EntityKind::Url,
            &json!({"Url": "https://contoso.com", "AdditionalData": {"Verdict": "clean"}}),
            vec![("Tag", PropertyValue::from("phish-sim"))],
        );

        let json = store.to_json_string(id, false).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed,
            json!({
                "Type": "url",
                "Url": "https://contoso.com",
                "Tag": "phish-sim",
                "AdditionalData": {"Verdict": "clean"}
            })
        );
    }

    #[test]
    fn test_deep_chain_is_cut_at_depth_bound() {
        let mut store = EntityStore::new();
        let root = store.create_empty(EntityKind::Process);
        let mut current = root;
        for i in 0..5_000 {
            let parent = store.create_empty(EntityKind::Process);
            store.set_property(current, "ProcessId", i.to_string()).unwrap();
            store.set_property(current, "ParentProcess", parent).unwrap();
            current = parent;
        }

        let map = store.to_plain_map(root).unwrap();
        let mut levels = 0;
        let mut node = &map;
        while let Some(Value::Object(next)) = node.get("ParentProcess") {
            levels += 1;
            node = next;
        }
        assert_eq!(levels, store.max_depth());

        // the cut chain rebuilds within the same bound
        let rebuilt = store
            .instantiate(&Value::Object(map), None)
            .unwrap()
            .entity()
            .unwrap();
        assert_eq!(
            store.entity(rebuilt).unwrap().get_str("ProcessId").unwrap(),
            Some("0")
        );
    }
}
