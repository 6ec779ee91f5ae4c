//! Shared fixtures for the integration suites.
//!
//! Inventory checks are written once, generic over the store, and run on
//! both backends through [`on_both_backends!`].

#![allow(dead_code)]

use hwgraph_core::graph::{Direction, EdgeLabel, Vertex, VertexKey, VertexKind};
use hwgraph_core::{GraphStore, GraphTransaction, Inventory, InventorySettings, MemoryStore, SurrealStore};

pub async fn memory_inventory_with(settings: InventorySettings) -> Inventory<MemoryStore> {
    let inventory = Inventory::new(MemoryStore::new(), settings);
    inventory.initialize().await.unwrap();
    inventory
}

pub async fn surreal_inventory_with(settings: InventorySettings) -> Inventory<SurrealStore> {
    let store = SurrealStore::in_memory("hwgraph", "test").await.unwrap();
    let inventory = Inventory::new(store, settings);
    inventory.initialize().await.unwrap();
    inventory
}

pub async fn memory_inventory() -> Inventory<MemoryStore> {
    memory_inventory_with(InventorySettings::default()).await
}

pub async fn surreal_inventory() -> Inventory<SurrealStore> {
    surreal_inventory_with(InventorySettings::default()).await
}

/// Expands each named `async fn check<S: GraphStore>(Inventory<S>)` into one
/// test per backend.
macro_rules! on_both_backends {
    ($($check:ident),* $(,)?) => {
        mod memory_backend {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check(crate::common::memory_inventory().await).await;
                }
            )*
        }

        mod surreal_backend {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check(crate::common::surreal_inventory().await).await;
                }
            )*
        }
    };
}

/// `deviceID` for resources, `id` for everything else.
fn natural_id(vertex: &Vertex) -> String {
    vertex
        .str_prop("deviceID")
        .or_else(|| vertex.identity())
        .unwrap_or_default()
        .to_string()
}

async fn adjacent<S: GraphStore>(
    inventory: &Inventory<S>,
    key: &VertexKey,
    label: EdgeLabel,
    direction: Direction,
) -> Vec<String> {
    let mut tx = inventory.store().begin().await.unwrap();
    let vertices = tx.neighbors(key, label, direction).await.unwrap();
    tx.rollback().await.unwrap();

    let mut ids: Vec<String> = vertices.iter().map(natural_id).collect();
    ids.sort();
    ids
}

/// Natural ids at the far end of outgoing `label` edges, sorted.
pub async fn targets<S: GraphStore>(inventory: &Inventory<S>, key: &VertexKey, label: EdgeLabel) -> Vec<String> {
    adjacent(inventory, key, label, Direction::Out).await
}

/// Natural ids at the near end of incoming `label` edges, sorted.
pub async fn sources<S: GraphStore>(inventory: &Inventory<S>, key: &VertexKey, label: EdgeLabel) -> Vec<String> {
    adjacent(inventory, key, label, Direction::In).await
}

pub async fn contains<S: GraphStore>(inventory: &Inventory<S>, key: &VertexKey) -> bool {
    let mut tx = inventory.store().begin().await.unwrap();
    let found = tx.find_vertex(key).await.unwrap().is_some();
    tx.rollback().await.unwrap();
    found
}

pub async fn count<S: GraphStore>(inventory: &Inventory<S>, kind: VertexKind) -> usize {
    let mut tx = inventory.store().begin().await.unwrap();
    let vertices = tx.list_vertices(kind).await.unwrap();
    tx.rollback().await.unwrap();
    vertices.len()
}

/// Resources currently marked not detected, sorted.
pub async fn not_detected<S: GraphStore>(inventory: &Inventory<S>) -> Vec<String> {
    sources(inventory, &VertexKey::not_detected(), EdgeLabel::NotDetected).await
}
