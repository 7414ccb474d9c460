//! Equality, equivalence and merge of entities
//!
//! - `equals`: same kind and equal non-empty properties
//! - `is_equivalent`: no property that is set on both sides differs
//! - `merge`: fill the gaps of one entity from another, refusing when their
//!   identifying properties disagree
//!
//! Nested entities are compared structurally through the arena with an
//! explicit work stack. A pair that is already being compared is assumed
//! equal, which keeps comparison of cyclic graphs finite.

use crate::entities::{EntityId, EntityStore, PropertyValue, TYPE_KEY};
use crate::error::{EntityError, Result};
use ahash::{HashSet, HashSetExt};
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

type Seen = HashSet<(EntityId, EntityId)>;

impl EntityStore {
    /// Strict equality: same kind and identical non-empty property maps
    pub fn equals(&self, a: EntityId, b: EntityId) -> Result<bool> {
        let mut seen = Seen::new();
        self.pairs_equal(vec![(a, b)], &mut seen)
    }

    /// Compare entity pairs with an explicit work stack
    ///
    /// Nested entity values push their pair onto the stack instead of
    /// recursing, so chain length is bounded only by the arena.
    fn pairs_equal(&self, mut pending: Vec<(EntityId, EntityId)>, seen: &mut Seen) -> Result<bool> {
        while let Some((a, b)) = pending.pop() {
            if a == b {
                self.entity(a)?;
                continue;
            }
            let (left, right) = (self.entity(a)?, self.entity(b)?);
            if left.kind() != right.kind() {
                return Ok(false);
            }
            if !seen.insert((a, b)) {
                continue;
            }

            let (lp, rp) = (left.non_empty_properties(), right.non_empty_properties());
            if lp.len() != rp.len() || lp.keys().ne(rp.keys()) {
                return Ok(false);
            }
            for (name, lv) in &lp {
                if !shallow_equal(lv, rp[name], &mut pending) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn values_equal(&self, a: &PropertyValue, b: &PropertyValue, seen: &mut Seen) -> Result<bool> {
        let mut pending = Vec::new();
        if !shallow_equal(a, b, &mut pending) {
            return Ok(false);
        }
        self.pairs_equal(pending, seen)
    }

    /// Equality tolerant of values missing on either side
    pub fn is_equivalent(&self, a: EntityId, b: EntityId) -> Result<bool> {
        if self.equals(a, b)? {
            return Ok(true);
        }
        let (left, right) = (self.entity(a)?, self.entity(b)?);
        if left.kind() != right.kind() {
            return Ok(false);
        }

        let mut seen = Seen::new();
        for (name, lv) in left.non_empty_properties() {
            let rv = right.value_or_null(name);
            if rv.is_empty() {
                continue;
            }
            if !self.values_equal(lv, rv, &mut seen)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Identifying properties that are set on both sides but differ
    fn conflicting_id_properties(&self, a: EntityId, b: EntityId) -> Result<Vec<String>> {
        let (left, right) = (self.entity(a)?, self.entity(b)?);
        let mut conflicts = Vec::new();

        for prop in left.kind().id_properties() {
            let (lv, rv) = (left.value_or_null(prop), right.value_or_null(prop));
            if lv.is_empty() || rv.is_empty() {
                continue;
            }
            // pairs assumed equal under one property prove nothing for the next
            let mut seen = Seen::new();
            if !self.values_equal(lv, rv, &mut seen)? {
                conflicts.push(prop.to_string());
            }
        }
        Ok(conflicts)
    }

    /// Whether `b` can be merged into `a`
    ///
    /// Entities of different kinds never merge. No identifying property
    /// asserted by `a` may contradict a value that `b` also asserts.
    pub fn can_merge(&self, a: EntityId, b: EntityId) -> Result<bool> {
        if self.entity(a)?.kind() != self.entity(b)?.kind() {
            return Ok(false);
        }
        Ok(self.conflicting_id_properties(a, b)?.is_empty())
    }

    /// Merge `b` into a copy of `a`
    ///
    /// Returns `a` itself when the two are equal. Otherwise a new entity is
    /// created from `a`, and every property empty there is filled from a
    /// non-empty property of `b`.
    pub fn merge(&mut self, a: EntityId, b: EntityId) -> Result<EntityId> {
        if self.equals(a, b)? {
            return Ok(a);
        }
        if !self.can_merge(a, b)? {
            let kind = self.entity(a)?.kind();
            let mut properties = self.conflicting_id_properties(a, b)?;
            if properties.is_empty() && kind != self.entity(b)?.kind() {
                properties.push(TYPE_KEY.to_string());
            }
            return Err(EntityError::EntityMergeConflict {
                kind: kind.name().to_string(),
                properties,
            });
        }

        let left = self.entity(a)?.clone();
        let right = self.entity(b)?;

        let fills: Vec<(String, PropertyValue)> = right
            .properties()
            .filter(|(name, value)| !value.is_empty() && left.value_or_null(name).is_empty())
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let fill_additional = left.additional_data().is_empty() && !right.additional_data().is_empty();
        let right_additional = right.additional_data().clone();

        let merged = self.create_empty(left.kind());
        self.entity_mut(merged)?.set_additional_data(if fill_additional {
            right_additional
        } else {
            left.additional_data().clone()
        });

        // edges follow the property values, not the edge lists of `a`
        for (name, value) in left.properties() {
            self.assign(merged, name.to_string(), value.clone());
        }

        for (name, value) in fills {
            tracing::debug!("Merge fills {}.{} from {}", left.kind(), name, b);
            self.assign(merged, name, value);
        }

        Ok(merged)
    }

    /// Canonical text of the non-empty properties, sorted by name
    ///
    /// Nested entities contribute their kind only, so the text depends on
    /// nothing that [`equals`](Self::equals) ignores.
    pub fn canonical_text(&self, id: EntityId) -> Result<String> {
        let entity = self.entity(id)?;
        let mut text = String::new();
        for (name, value) in entity.non_empty_properties() {
            let _ = write!(text, "{}={};", name, self.value_text(value));
        }
        Ok(text)
    }

    fn value_text(&self, value: &PropertyValue) -> String {
        match value {
            PropertyValue::Null => String::new(),
            PropertyValue::Value(v) => v.to_string(),
            PropertyValue::Enum(e) => e.label.to_string(),
            PropertyValue::Entity(id) => match self.entity(*id) {
                Ok(nested) => format!("<{}>", nested.type_name()),
                Err(_) => "<?>".to_string(),
            },
            PropertyValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| self.value_text(v)).collect();
                format!("[{}]", inner.join(","))
            }
        }
    }

    /// Stable content fingerprint (blake3 of the canonical text)
    pub fn fingerprint(&self, id: EntityId) -> Result<String> {
        let text = self.canonical_text(id)?;
        Ok(blake3::hash(text.as_bytes()).to_hex().to_string())
    }

    /// Hashable handle implementing the entity equality relation
    pub fn key(&self, id: EntityId) -> EntityKey<'_> {
        EntityKey { store: self, id }
    }
}

/// Compare two values without following entity references
///
/// Entity pairs met along the way are pushed onto `pending`.
fn shallow_equal(
    a: &PropertyValue,
    b: &PropertyValue,
    pending: &mut Vec<(EntityId, EntityId)>,
) -> bool {
    match (a, b) {
        (PropertyValue::Entity(x), PropertyValue::Entity(y)) => {
            pending.push((*x, *y));
            true
        }
        (PropertyValue::List(xs), PropertyValue::List(ys)) => {
            xs.len() == ys.len()
                && xs.iter().zip(ys).all(|(x, y)| shallow_equal(x, y, pending))
        }
        _ => a == b,
    }
}

/// Entity reference usable as a `HashMap`/`HashSet` key
///
/// Two keys are equal when [`EntityStore::equals`] holds, and equal keys hash
/// identically.
#[derive(Debug, Clone, Copy)]
pub struct EntityKey<'a> {
    store: &'a EntityStore,
    id: EntityId,
}

impl EntityKey<'_> {
    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl PartialEq for EntityKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.store, other.store)
            && self.store.equals(self.id, other.id).unwrap_or(false)
    }
}

impl Eq for EntityKey<'_> {}

impl Hash for EntityKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.store.canonical_text(self.id).unwrap_or_default().hash(state);
    }
}
