//! Attribute descriptors and enum tables
//!
//! A schema is an ordered table of `(attribute, Descriptor)` pairs. The
//! descriptor decides how the extractor interprets the raw value found under
//! that attribute.

use crate::entities::EntityKind;

/// How a raw attribute value is interpreted during extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// Value is stored as-is
    Primitive,
    /// Value must map through a finite label/code table
    Enum(EnumRef),
    /// Value is a single nested entity of the given kind
    Entity(EntityKind),
    /// Value is an ordered sequence of nested entities; elements describe
    /// themselves when no kind is declared
    Collection(Option<EntityKind>),
}

/// Reference to an enum table, either direct or keyed into [`enum_table`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumRef {
    Direct(&'static EnumTable),
    Keyed(&'static str),
}

impl EnumRef {
    /// Resolve to the concrete table, if the key is known
    pub fn table(&self) -> Option<&'static EnumTable> {
        match self {
            EnumRef::Direct(table) => Some(*table),
            EnumRef::Keyed(key) => enum_table(key),
        }
    }
}

/// Finite mapping between human labels and internal codes
#[derive(Debug, PartialEq, Eq)]
pub struct EnumTable {
    pub name: &'static str,
    pub members: &'static [(&'static str, i64)],
}

impl EnumTable {
    /// Look up a member by label or, for numeric input, by code
    pub fn lookup(&'static self, raw: &serde_json::Value) -> Option<EnumValue> {
        let member = match raw {
            serde_json::Value::String(label) => self
                .members
                .iter()
                .find(|(name, _)| *name == label.as_str()),
            serde_json::Value::Number(num) => {
                let code = num.as_i64()?;
                self.members.iter().find(|(_, c)| *c == code)
            }
            _ => None,
        }?;

        Some(EnumValue {
            table: self.name,
            label: member.0,
            code: member.1,
        })
    }

    /// Look up a member by exact label
    pub fn by_label(&'static self, label: &str) -> Option<EnumValue> {
        self.lookup(&serde_json::Value::String(label.to_string()))
    }
}

/// A resolved enum member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub table: &'static str,
    pub label: &'static str,
    pub code: i64,
}

pub static ELEVATION_TOKEN: EnumTable = EnumTable {
    name: "ElevationToken",
    members: &[("Default", 0), ("Full", 1), ("Limited", 2)],
};

pub static OS_FAMILY: EnumTable = EnumTable {
    name: "OSFamily",
    members: &[
        ("Linux", 0),
        ("Windows", 1),
        ("Android", 2),
        ("IOS", 3),
        ("Mac", 4),
    ],
};

pub static ALGORITHM: EnumTable = EnumTable {
    name: "Algorithm",
    members: &[
        ("Unknown", 0),
        ("MD5", 1),
        ("SHA1", 2),
        ("SHA256", 3),
        ("SHA256AC", 4),
    ],
};

pub static REGISTRY_HIVE: EnumTable = EnumTable {
    name: "RegistryHive",
    members: &[
        ("HKEY_LOCAL_MACHINE", 0),
        ("HKEY_CLASSES_ROOT", 1),
        ("HKEY_CURRENT_CONFIG", 2),
        ("HKEY_USERS", 3),
        ("HKEY_CURRENT_USER_LOCAL_SETTINGS", 4),
        ("HKEY_PERFORMANCE_DATA", 5),
        ("HKEY_PERFORMANCE_NLSTEXT", 6),
        ("HKEY_PERFORMANCE_TEXT", 7),
        ("HKEY_A", 8),
        ("HKEY_CURRENT_USER", 9),
    ],
};

pub static REGISTRY_VALUE_TYPE: EnumTable = EnumTable {
    name: "RegistryValueType",
    members: &[
        ("None", 0),
        ("Unknown", 1),
        ("String", 2),
        ("ExpandString", 3),
        ("Binary", 4),
        ("DWord", 5),
        ("MultiString", 6),
        ("QWord", 7),
    ],
};

static ENUM_TABLES: [&EnumTable; 5] = [
    &ELEVATION_TOKEN,
    &OS_FAMILY,
    &ALGORITHM,
    &REGISTRY_HIVE,
    &REGISTRY_VALUE_TYPE,
];

/// Table-of-tables lookup used by [`EnumRef::Keyed`]
pub fn enum_table(key: &str) -> Option<&'static EnumTable> {
    ENUM_TABLES.iter().copied().find(|t| t.name == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_lookup_by_label() {
        let value = ALGORITHM.lookup(&json!("SHA256")).unwrap();
        assert_eq!(value.label, "SHA256");
        assert_eq!(value.code, 3);
        assert_eq!(value.table, "Algorithm");
        assert_eq!(ALGORITHM.by_label("MD5").map(|v| v.code), Some(1));
    }

    #[test]
    fn test_lookup_by_code() {
        let value = ELEVATION_TOKEN.lookup(&json!(2)).unwrap();
        assert_eq!(value.label, "Limited");
    }

    #[test]
    fn test_invalid_member() {
        assert!(OS_FAMILY.lookup(&json!("BeOS")).is_none());
        assert!(OS_FAMILY.lookup(&json!(true)).is_none());
        assert!(OS_FAMILY.lookup(&json!(99)).is_none());
    }

    #[test]
    fn test_keyed_table() {
        assert_eq!(EnumRef::Keyed("OSFamily").table(), Some(&OS_FAMILY));
        assert!(EnumRef::Keyed("NoSuchTable").table().is_none());
        assert_eq!(EnumRef::Direct(&ALGORITHM).table(), Some(&ALGORITHM));
    }
}
