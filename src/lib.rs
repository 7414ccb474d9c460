//! entgraph - Typed security entities with reference graphs
//!
//! Builds typed entities (hosts, accounts, processes, files, IP addresses and
//! more) from loosely structured alert and event records, links nested
//! entities into an undirected reference graph, and compares, merges and
//! serializes them back to plain JSON.

pub mod cli;
pub mod config;
pub mod entities;
pub mod error;

pub use error::{EntityError, Result};
