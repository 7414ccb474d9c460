//! Entity reference graph
//!
//! Every entity is a node. Nested-entity relationships become undirected
//! edges carrying an attribute bag with at least the producing attribute
//! name. Edges are registered on both endpoints so traversal can start from
//! either side.
//!
//! [`EntityStore::materialize_graph`] walks the reachable subgraph with an
//! explicit worklist and visited set, adding one edge per unordered node
//! pair. Cycles terminate because an edge is recorded in the output before
//! its endpoints are queued.

use crate::entities::{EntityId, EntityStore};
use crate::error::Result;
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::BTreeMap;

/// Attribute bag attached to an edge
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EdgeAttrs(BTreeMap<String, String>);

impl EdgeAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute bag carrying only `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with("name", name)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Edge between two entities, registered on both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: EntityId,
    pub target: EntityId,
    pub attrs: EdgeAttrs,
}

impl Edge {
    /// Endpoints in canonical order, identifying the unordered pair
    pub fn pair(&self) -> (EntityId, EntityId) {
        if self.source <= self.target {
            (self.source, self.target)
        } else {
            (self.target, self.source)
        }
    }

    /// Value of the `name` attribute
    pub fn name(&self) -> Option<&str> {
        self.attrs.get("name")
    }

    /// The endpoint that is not `id`
    pub fn other(&self, id: EntityId) -> EntityId {
        if self.source == id {
            self.target
        } else {
            self.source
        }
    }

    fn same_as(&self, other: &Edge) -> bool {
        self.pair() == other.pair() && self.attrs == other.attrs
    }
}

/// Node payload in a materialized graph
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub entity: EntityId,
    pub kind: &'static str,
    pub description: String,
}

/// Operations a graph backend must support for materialization
pub trait GraphSink {
    /// Insert a node for `id` unless present
    fn add_node(&mut self, id: EntityId, data: NodeData);

    /// Whether an edge exists between the two endpoints, in either direction
    fn has_edge(&self, a: EntityId, b: EntityId) -> bool;

    /// Insert an edge; both endpoints must already be nodes
    fn add_edge(&mut self, a: EntityId, b: EntityId, attrs: EdgeAttrs);

    /// Nodes adjacent to `id`
    fn neighbors(&self, id: EntityId) -> Vec<EntityId>;
}

/// Undirected graph of entities backed by petgraph
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    graph: UnGraph<NodeData, EdgeAttrs>,
    index: HashMap<EntityId, NodeIndex>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            index: HashMap::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: EntityId) -> Option<&NodeData> {
        self.index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Node payloads in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_weights()
    }

    /// Edges as `(a, b, attrs)` in insertion order
    pub fn edges(&self) -> Vec<(EntityId, EntityId, &EdgeAttrs)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((self.graph[a].entity, self.graph[b].entity, &self.graph[e]))
            })
            .collect()
    }

    pub fn edge_attrs(&self, a: EntityId, b: EntityId) -> Option<&EdgeAttrs> {
        let (ia, ib) = (self.index.get(&a)?, self.index.get(&b)?);
        let edge = self.graph.find_edge(*ia, *ib)?;
        self.graph.edge_weight(edge)
    }

    /// Borrow the underlying petgraph graph
    pub fn inner(&self) -> &UnGraph<NodeData, EdgeAttrs> {
        &self.graph
    }
}

impl GraphSink for EntityGraph {
    fn add_node(&mut self, id: EntityId, data: NodeData) {
        if !self.index.contains_key(&id) {
            let idx = self.graph.add_node(data);
            self.index.insert(id, idx);
        }
    }

    fn has_edge(&self, a: EntityId, b: EntityId) -> bool {
        match (self.index.get(&a), self.index.get(&b)) {
            (Some(ia), Some(ib)) => self.graph.find_edge(*ia, *ib).is_some(),
            _ => false,
        }
    }

    fn add_edge(&mut self, a: EntityId, b: EntityId, attrs: EdgeAttrs) {
        if let (Some(ia), Some(ib)) = (self.index.get(&a), self.index.get(&b)) {
            self.graph.add_edge(*ia, *ib, attrs);
        }
    }

    fn neighbors(&self, id: EntityId) -> Vec<EntityId> {
        self.index
            .get(&id)
            .map(|idx| {
                self.graph
                    .neighbors(*idx)
                    .map(|n| self.graph[n].entity)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl EntityStore {
    /// Register an edge on both endpoints
    ///
    /// An edge identical to one already registered (same unordered pair and
    /// attributes) is ignored.
    pub fn add_edge(&mut self, source: EntityId, target: EntityId, attrs: EdgeAttrs) -> Result<()> {
        self.entity(source)?;
        self.entity(target)?;

        let edge = Edge {
            source,
            target,
            attrs,
        };

        let endpoints = if source == target {
            vec![source]
        } else {
            vec![source, target]
        };
        for id in endpoints {
            let entity = self.entity_mut(id)?;
            if !entity.edges.iter().any(|e| e.same_as(&edge)) {
                entity.edges.push(edge.clone());
            }
        }
        Ok(())
    }

    /// Drop an edge from both endpoints
    pub(crate) fn remove_edge(
        &mut self,
        source: EntityId,
        target: EntityId,
        attrs: &EdgeAttrs,
    ) -> Result<()> {
        let edge = Edge {
            source,
            target,
            attrs: attrs.clone(),
        };
        for id in [source, target] {
            self.entity_mut(id)?.edges.retain(|e| !e.same_as(&edge));
        }
        Ok(())
    }

    /// Local edges of an entity
    pub fn edges(&self, id: EntityId) -> Result<&[Edge]> {
        Ok(self.entity(id)?.edges())
    }

    /// Build the graph reachable from `root`, extending `existing` if given
    pub fn materialize_graph(
        &self,
        root: EntityId,
        existing: Option<EntityGraph>,
    ) -> Result<EntityGraph> {
        let mut graph = existing.unwrap_or_default();
        self.materialize_into(root, &mut graph)?;
        Ok(graph)
    }

    /// Materialize into any [`GraphSink`]
    pub fn materialize_into<G: GraphSink>(&self, root: EntityId, graph: &mut G) -> Result<()> {
        graph.add_node(root, self.node_data(root)?);

        let mut frontier = vec![root];
        let mut visited: HashSet<EntityId> = HashSet::new();

        while let Some(current) = frontier.pop() {
            if !visited.insert(current) {
                continue;
            }

            for edge in self.edges(current)? {
                let (a, b) = (edge.source, edge.target);
                if graph.has_edge(a, b) {
                    continue;
                }

                graph.add_node(a, self.node_data(a)?);
                graph.add_node(b, self.node_data(b)?);
                graph.add_edge(a, b, edge.attrs.clone());
                tracing::trace!("Added edge {} - {} ({:?})", a, b, edge.name());

                for endpoint in [a, b] {
                    if !visited.contains(&endpoint) && self.has_unrepresented_edges(endpoint, graph)? {
                        frontier.push(endpoint);
                    }
                }
            }
        }
        Ok(())
    }

    fn has_unrepresented_edges<G: GraphSink>(&self, id: EntityId, graph: &G) -> Result<bool> {
        Ok(self
            .edges(id)?
            .iter()
            .any(|e| !graph.has_edge(e.source, e.target)))
    }

    fn node_data(&self, id: EntityId) -> Result<NodeData> {
        Ok(NodeData {
            entity: id,
            kind: self.entity(id)?.type_name(),
            description: self.description(id)?,
        })
    }
}
