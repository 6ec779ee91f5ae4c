//! In-process property graph backend.
//!
//! A transaction holds the graph lock from `begin` until it ends, so
//! transactions run one at a time. It works on a copy that `commit` writes
//! back and `rollback` drops. Used for ephemeral inventories and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{GraphStore, GraphTransaction, ResourceRecord, StoreError};
use crate::graph::{Direction, EdgeLabel, PropertyMap, Vertex, VertexKey, VertexKind};

#[derive(Debug, Clone)]
struct StoredVertex {
    internal_id: u64,
    properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq)]
struct StoredEdge {
    from: VertexKey,
    label: EdgeLabel,
    to: VertexKey,
}

/// The graph itself. Cloning takes a full snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    next_id: u64,
    vertices: HashMap<VertexKey, StoredVertex>,
    edges: Vec<StoredEdge>,
}

impl MemoryGraph {
    /// Fetch a vertex by natural key.
    pub fn vertex(&self, key: &VertexKey) -> Option<Vertex> {
        self.vertices.get(key).map(|v| to_vertex(key, v))
    }

    pub fn contains(&self, key: &VertexKey) -> bool {
        self.vertices.contains_key(key)
    }

    /// Number of vertices with the given label.
    pub fn vertex_count(&self, kind: VertexKind) -> usize {
        self.vertices.keys().filter(|k| k.kind == kind).count()
    }

    /// Number of edges with the given label.
    pub fn edge_count(&self, label: EdgeLabel) -> usize {
        self.edges.iter().filter(|e| e.label == label).count()
    }

    /// Targets of outgoing `label` edges, sorted, duplicates kept.
    pub fn targets(&self, from: &VertexKey, label: EdgeLabel) -> Vec<VertexKey> {
        let mut keys: Vec<VertexKey> = self
            .edges
            .iter()
            .filter(|e| e.label == label && &e.from == from)
            .map(|e| e.to.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Sources of incoming `label` edges, sorted, duplicates kept.
    pub fn sources(&self, to: &VertexKey, label: EdgeLabel) -> Vec<VertexKey> {
        let mut keys: Vec<VertexKey> = self
            .edges
            .iter()
            .filter(|e| e.label == label && &e.to == to)
            .map(|e| e.from.clone())
            .collect();
        keys.sort();
        keys
    }

    fn merge(&mut self, key: &VertexKey, properties: &PropertyMap) {
        match self.vertices.get_mut(key) {
            Some(existing) => existing.properties = properties.clone(),
            None => {
                self.next_id += 1;
                self.vertices.insert(
                    key.clone(),
                    StoredVertex {
                        internal_id: self.next_id,
                        properties: properties.clone(),
                    },
                );
            }
        }
    }

    fn remove(&mut self, key: &VertexKey) {
        if self.vertices.remove(key).is_some() {
            self.edges.retain(|e| &e.from != key && &e.to != key);
        }
    }

    fn relate(&mut self, from: &VertexKey, label: EdgeLabel, to: &VertexKey) -> Result<(), StoreError> {
        for end in [from, to] {
            if !self.vertices.contains_key(end) {
                return Err(StoreError::MissingVertex(end.to_string()));
            }
        }
        self.edges.push(StoredEdge {
            from: from.clone(),
            label,
            to: to.clone(),
        });
        Ok(())
    }

    fn adjacent(&self, key: &VertexKey, label: EdgeLabel, direction: Direction) -> Vec<Vertex> {
        self.edges
            .iter()
            .filter(|e| e.label == label)
            .filter_map(|e| match direction {
                Direction::Out if &e.from == key => Some(&e.to),
                Direction::In if &e.to == key => Some(&e.from),
                _ => None,
            })
            .filter_map(|k| self.vertex(k))
            .collect()
    }

    fn id_props(&self, keys: Vec<VertexKey>) -> Vec<String> {
        keys.iter()
            .filter_map(|k| self.vertex(k))
            .filter_map(|v| v.identity().map(str::to_string))
            .collect()
    }

    fn record(&self, key: &VertexKey, stored: &StoredVertex) -> ResourceRecord {
        let annotation = self
            .targets(key, EdgeLabel::Have)
            .first()
            .and_then(|k| self.vertices.get(k))
            .map(|v| v.properties.clone())
            .unwrap_or_default();

        ResourceRecord {
            vertex: to_vertex(key, stored),
            annotation,
            group_ids: self.id_props(self.sources(key, EdgeLabel::Include)),
            node_ids: self.id_props(self.sources(key, EdgeLabel::Compose)),
            not_detected: !self.targets(key, EdgeLabel::NotDetected).is_empty(),
        }
    }
}

fn to_vertex(key: &VertexKey, stored: &StoredVertex) -> Vertex {
    Vertex::new(
        key.kind,
        format!("{}:{:08}", key.kind.table(), stored.internal_id),
        stored.properties.clone(),
    )
}

/// Shared in-memory graph store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    graph: Arc<Mutex<MemoryGraph>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the committed graph, for inspection.
    pub async fn graph(&self) -> MemoryGraph {
        self.graph.lock().await.clone()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let shared = Arc::clone(&self.graph).lock_owned().await;
        let working = (*shared).clone();
        Ok(MemoryTransaction { shared, working })
    }
}

/// Exclusive transaction over a private copy of the graph.
pub struct MemoryTransaction {
    shared: OwnedMutexGuard<MemoryGraph>,
    working: MemoryGraph,
}

#[async_trait]
impl GraphTransaction for MemoryTransaction {
    async fn merge_vertex(&mut self, key: &VertexKey, properties: &PropertyMap) -> Result<(), StoreError> {
        self.working.merge(key, properties);
        Ok(())
    }

    async fn find_vertex(&mut self, key: &VertexKey) -> Result<Option<Vertex>, StoreError> {
        Ok(self.working.vertex(key))
    }

    async fn list_vertices(&mut self, kind: VertexKind) -> Result<Vec<Vertex>, StoreError> {
        Ok(self
            .working
            .vertices
            .iter()
            .filter(|(k, _)| k.kind == kind)
            .map(|(k, v)| to_vertex(k, v))
            .collect())
    }

    async fn delete_vertex(&mut self, key: &VertexKey) -> Result<(), StoreError> {
        self.working.remove(key);
        Ok(())
    }

    async fn create_edge(&mut self, from: &VertexKey, label: EdgeLabel, to: &VertexKey) -> Result<(), StoreError> {
        self.working.relate(from, label, to)
    }

    async fn delete_edges(&mut self, from: &VertexKey, label: EdgeLabel) -> Result<(), StoreError> {
        self.working
            .edges
            .retain(|e| !(e.label == label && &e.from == from));
        Ok(())
    }

    async fn delete_edges_to(&mut self, to: &VertexKey, label: EdgeLabel) -> Result<(), StoreError> {
        self.working.edges.retain(|e| !(e.label == label && &e.to == to));
        Ok(())
    }

    async fn neighbors(
        &mut self,
        key: &VertexKey,
        label: EdgeLabel,
        direction: Direction,
    ) -> Result<Vec<Vertex>, StoreError> {
        Ok(self.working.adjacent(key, label, direction))
    }

    async fn resource_records(&mut self, device_id: Option<&str>) -> Result<Vec<ResourceRecord>, StoreError> {
        let graph = &self.working;
        Ok(graph
            .vertices
            .iter()
            .filter(|(k, _)| k.kind.is_resource())
            .filter(|(_, v)| match device_id {
                Some(id) => v.properties.get("deviceID").and_then(|p| p.as_str()) == Some(id),
                None => true,
            })
            .map(|(k, v)| graph.record(k, v))
            .collect())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTransaction { mut shared, working } = self;
        *shared = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
