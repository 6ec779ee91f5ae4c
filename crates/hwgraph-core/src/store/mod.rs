//! Graph store seam.
//!
//! All inventory logic is written against [`GraphStore`] and
//! [`GraphTransaction`]. Two backends implement them:
//!
//! - [`SurrealStore`] - SurrealDB embedded (RocksDB on disk, or the in-memory
//!   engine), writes buffered into one `BEGIN ... COMMIT` block
//! - [`MemoryStore`] - an in-process property graph with copy-on-begin
//!   transactions
//!
//! [`rows`] holds the query shapes the composer consumes.

mod error;
mod memory;
pub mod rows;
mod surreal;

pub use error::StoreError;
pub use memory::{MemoryGraph, MemoryStore, MemoryTransaction};
pub use surreal::{SurrealStore, SurrealTransaction};

use async_trait::async_trait;

use crate::graph::{Direction, EdgeLabel, PropertyMap, Vertex, VertexKey, VertexKind};

/// Denormalized view of one resource vertex and its immediate surroundings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub vertex: Vertex,
    /// Properties of the `Have` annotation (empty when absent).
    pub annotation: PropertyMap,
    /// Ids of groups including the resource.
    pub group_ids: Vec<String>,
    /// Ids of nodes composing the resource.
    pub node_ids: Vec<String>,
    /// Whether the resource carries a `NotDetected` edge.
    pub not_detected: bool,
}

impl ResourceRecord {
    pub fn device_id(&self) -> Option<&str> {
        self.vertex.str_prop("deviceID")
    }
}

/// A graph database that hands out transactions.
#[async_trait]
pub trait GraphStore: Send + Sync {
    type Transaction: GraphTransaction;

    /// Create whatever schema the backend needs. Must be idempotent.
    async fn prepare(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Begin a transaction.
    async fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

/// A transactional handle over the graph.
///
/// Reads observe at least the state as of `begin`; whether they observe
/// earlier writes of the same transaction is backend-specific, so callers
/// load everything they need before mutating. Writes become visible to other
/// transactions only after [`commit`](GraphTransaction::commit).
#[async_trait]
pub trait GraphTransaction: Send {
    /// Create the vertex, or replace its property set if it exists.
    async fn merge_vertex(&mut self, key: &VertexKey, properties: &PropertyMap) -> Result<(), StoreError>;

    /// Fetch a vertex by natural key.
    async fn find_vertex(&mut self, key: &VertexKey) -> Result<Option<Vertex>, StoreError>;

    /// All vertices of one label, in no particular order.
    async fn list_vertices(&mut self, kind: VertexKind) -> Result<Vec<Vertex>, StoreError>;

    /// Delete a vertex together with every edge touching it.
    async fn delete_vertex(&mut self, key: &VertexKey) -> Result<(), StoreError>;

    /// Create a directed edge.
    async fn create_edge(&mut self, from: &VertexKey, label: EdgeLabel, to: &VertexKey) -> Result<(), StoreError>;

    /// Delete every outgoing edge of `label` from `from`.
    async fn delete_edges(&mut self, from: &VertexKey, label: EdgeLabel) -> Result<(), StoreError>;

    /// Delete every incoming edge of `label` into `to`.
    async fn delete_edges_to(&mut self, to: &VertexKey, label: EdgeLabel) -> Result<(), StoreError>;

    /// Vertices adjacent to `key` over `label` edges.
    async fn neighbors(
        &mut self,
        key: &VertexKey,
        label: EdgeLabel,
        direction: Direction,
    ) -> Result<Vec<Vertex>, StoreError>;

    /// Resource vertices with annotation, memberships and detection state,
    /// optionally restricted to one `deviceID`.
    async fn resource_records(&mut self, device_id: Option<&str>) -> Result<Vec<ResourceRecord>, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
