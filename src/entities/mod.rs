//! Typed security entities and their reference graph
//!
//! This module provides:
//! - A closed registry of entity kinds with ordered, typed schemas
//! - Schema-driven extraction of entities from raw JSON records
//! - An arena store with edges registered on both endpoints
//! - Graph materialization, structural equality, merge and serialization

mod compare;
mod describe;
mod entity;
mod event;
mod graph;
mod registry;
mod schema;
mod serialize;
mod store;
mod value;

pub use compare::EntityKey;
pub use entity::{Entity, EntityId, ADDITIONAL_DATA_KEY, TYPE_KEY};
pub use event::ProcessRole;
pub use graph::{Edge, EdgeAttrs, EntityGraph, GraphSink, NodeData};
pub use registry::EntityKind;
pub use schema::{enum_table, Descriptor, EnumRef, EnumTable, EnumValue};
pub use store::{EntityStore, Instantiated, DEFAULT_MAX_DEPTH};
pub use value::{json_is_empty, PropertyValue};
