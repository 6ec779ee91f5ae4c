#[macro_use]
mod common;

use async_trait::async_trait;
use common::{contains, count, not_detected, sources, targets};
use hwgraph_core::config::DEFAULT_GROUP_ID;
use hwgraph_core::graph::{
    Direction, EdgeLabel, PropertyMap, ResourceType, Vertex, VertexKey, VertexKind,
};
use hwgraph_core::store::{MemoryTransaction, ResourceRecord};
use hwgraph_core::{
    GraphStore, GraphTransaction, Inventory, InventoryError, InventorySettings, MemoryStore, NoFilter,
    StoreError,
};
use serde_json::{json, Value};

fn cpu(id: &str) -> Value {
    json!({ "deviceID": id, "type": "CPU", "status": { "state": "Enabled", "health": "OK" } })
}

fn memory(id: &str, node: &str) -> Value {
    json!({ "deviceID": id, "type": "memory", "links": [{ "deviceID": node }] })
}

fn cpu_key(id: &str) -> VertexKey {
    VertexKey::resource(ResourceType::Cpu, id)
}

fn mem_key(id: &str) -> VertexKey {
    VertexKey::resource(ResourceType::Memory, id)
}

/// Node ids with their members' deviceIDs, as listed.
async fn node_members<S: GraphStore>(inventory: &Inventory<S>) -> Vec<(String, Vec<String>)> {
    inventory
        .list_nodes()
        .await
        .unwrap()
        .into_iter()
        .map(|node| {
            let members = node
                .resources
                .iter()
                .filter_map(|r| r.device_id().map(str::to_string))
                .collect();
            (node.id, members)
        })
        .collect()
}

on_both_backends!(
    two_device_scenario,
    registration_is_idempotent,
    reattachment_keeps_annotation_and_groups,
    absent_resource_marked_once,
    absent_member_keeps_its_node,
    replaced_cpu_keeps_old_node,
    node_follows_first_link,
    linkless_resource_keeps_its_node,
    empty_node_deleted_empty_switch_kept,
    invalid_batch_leaves_store_untouched,
    quoted_device_id,
    initialize_is_idempotent,
);

async fn two_device_scenario<S: GraphStore>(inventory: Inventory<S>) {
    let registration = inventory
        .register_devices(vec![
            json!({ "deviceID": "cpu1", "type": "CPU" }),
            json!({ "deviceID": "mem1", "type": "memory", "links": [{ "deviceID": "cpu1" }] }),
        ])
        .await
        .unwrap();
    assert_eq!(registration.registered_device_ids, vec!["cpu1", "mem1"]);

    assert_eq!(
        targets(&inventory, &VertexKey::node("cpu1"), EdgeLabel::Compose).await,
        vec!["cpu1", "mem1"]
    );
    for key in [cpu_key("cpu1"), mem_key("mem1")] {
        assert_eq!(sources(&inventory, &key, EdgeLabel::Include).await, vec![DEFAULT_GROUP_ID]);
        assert_eq!(targets(&inventory, &key, EdgeLabel::Have).await.len(), 1);
    }
    assert!(not_detected(&inventory).await.is_empty());
}

async fn registration_is_idempotent<S: GraphStore>(inventory: Inventory<S>) {
    let batch = vec![
        cpu("cpu1"),
        memory("mem1", "cpu1"),
        json!({ "deviceID": "mem2", "type": "memory", "deviceSwitchInfo": "sw0" }),
    ];

    inventory.register_devices(batch.clone()).await.unwrap();
    let resources_once = inventory.list_resources(Default::default(), &NoFilter).await.unwrap();
    let nodes_once = inventory.list_nodes().await.unwrap();
    let switches_once = inventory.list_switches().await.unwrap();
    let groups_once = inventory.list_groups(true).await.unwrap();

    inventory.register_devices(batch).await.unwrap();
    assert_eq!(inventory.list_resources(Default::default(), &NoFilter).await.unwrap(), resources_once);
    assert_eq!(inventory.list_nodes().await.unwrap(), nodes_once);
    assert_eq!(inventory.list_switches().await.unwrap(), switches_once);
    assert_eq!(inventory.list_groups(true).await.unwrap(), groups_once);

    assert_eq!(count(&inventory, VertexKind::Annotation).await, 3);
    assert_eq!(
        sources(&inventory, &VertexKey::group(DEFAULT_GROUP_ID), EdgeLabel::Include).await,
        vec!["cpu1", "mem1", "mem2"]
    );
    for key in [cpu_key("cpu1"), mem_key("mem1"), mem_key("mem2")] {
        assert_eq!(targets(&inventory, &key, EdgeLabel::Have).await.len(), 1);
    }
    assert!(not_detected(&inventory).await.is_empty());
}

async fn reattachment_keeps_annotation_and_groups<S: GraphStore>(inventory: Inventory<S>) {
    let group = inventory.create_group("gpu-pool", "").await.unwrap();

    inventory
        .register_devices(vec![cpu("cpu1"), memory("mem1", "cpu1")])
        .await
        .unwrap();
    inventory
        .set_resource_groups("mem1", &[group.id.clone()])
        .await
        .unwrap();
    inventory.set_annotation("mem1", false).await.unwrap();

    inventory.register_devices(vec![cpu("cpu1")]).await.unwrap();
    let missing = inventory.find_resource("mem1", &NoFilter).await.unwrap().unwrap();
    assert!(!missing.detected);
    assert_eq!(not_detected(&inventory).await, vec!["mem1"]);

    inventory
        .register_devices(vec![cpu("cpu1"), memory("mem1", "cpu1")])
        .await
        .unwrap();
    let back = inventory.find_resource("mem1", &NoFilter).await.unwrap().unwrap();
    assert!(back.detected);
    assert!(!back.annotation.available);
    assert_eq!(back.resource_group_ids, vec![group.id]);

    assert!(not_detected(&inventory).await.is_empty());
    assert_eq!(count(&inventory, VertexKind::Annotation).await, 2);
}

async fn absent_resource_marked_once<S: GraphStore>(inventory: Inventory<S>) {
    inventory
        .register_devices(vec![cpu("cpu1"), memory("mem1", "cpu1")])
        .await
        .unwrap();

    inventory.register_devices(vec![cpu("cpu1")]).await.unwrap();
    inventory.register_devices(vec![cpu("cpu1")]).await.unwrap();

    assert_eq!(not_detected(&inventory).await, vec!["mem1"]);
    assert_eq!(targets(&inventory, &mem_key("mem1"), EdgeLabel::NotDetected).await.len(), 1);
}

async fn absent_member_keeps_its_node<S: GraphStore>(inventory: Inventory<S>) {
    inventory
        .register_devices(vec![cpu("cpu1"), memory("mem1", "cpu1")])
        .await
        .unwrap();
    inventory.register_devices(vec![cpu("cpu1")]).await.unwrap();

    assert_eq!(
        node_members(&inventory).await,
        vec![("cpu1".to_string(), vec!["cpu1".to_string(), "mem1".to_string()])]
    );
    assert!(contains(&inventory, &VertexKey::node("cpu1")).await);
}

async fn replaced_cpu_keeps_old_node<S: GraphStore>(inventory: Inventory<S>) {
    inventory.register_devices(vec![cpu("cpu1")]).await.unwrap();
    inventory.register_devices(vec![cpu("cpu2")]).await.unwrap();

    assert_eq!(
        node_members(&inventory).await,
        vec![
            ("cpu1".to_string(), vec!["cpu1".to_string()]),
            ("cpu2".to_string(), vec!["cpu2".to_string()]),
        ]
    );
    assert_eq!(not_detected(&inventory).await, vec!["cpu1"]);
}

async fn node_follows_first_link<S: GraphStore>(inventory: Inventory<S>) {
    inventory
        .register_devices(vec![cpu("cpuA"), cpu("cpuB"), memory("mem1", "cpuA")])
        .await
        .unwrap();
    assert!(targets(&inventory, &VertexKey::node("cpuA"), EdgeLabel::Compose)
        .await
        .contains(&"mem1".to_string()));

    inventory
        .register_devices(vec![cpu("cpuA"), cpu("cpuB"), memory("mem1", "cpuB")])
        .await
        .unwrap();
    assert_eq!(targets(&inventory, &VertexKey::node("cpuA"), EdgeLabel::Compose).await, vec!["cpuA"]);
    assert_eq!(
        targets(&inventory, &VertexKey::node("cpuB"), EdgeLabel::Compose).await,
        vec!["cpuB", "mem1"]
    );
    assert_eq!(sources(&inventory, &mem_key("mem1"), EdgeLabel::Compose).await, vec!["cpuB"]);
}

async fn linkless_resource_keeps_its_node<S: GraphStore>(inventory: Inventory<S>) {
    inventory
        .register_devices(vec![cpu("cpu1"), memory("mem1", "cpu1")])
        .await
        .unwrap();

    inventory
        .register_devices(vec![cpu("cpu1"), json!({ "deviceID": "mem1", "type": "memory", "links": [] })])
        .await
        .unwrap();

    assert!(targets(&inventory, &VertexKey::node("cpu1"), EdgeLabel::Compose)
        .await
        .contains(&"mem1".to_string()));
}

async fn empty_node_deleted_empty_switch_kept<S: GraphStore>(inventory: Inventory<S>) {
    inventory
        .register_devices(vec![json!({
            "deviceID": "mem1",
            "type": "memory",
            "links": [{ "deviceID": "cpuX" }],
            "deviceSwitchInfo": "sw0"
        })])
        .await
        .unwrap();
    assert!(contains(&inventory, &VertexKey::node("cpuX")).await);
    assert!(contains(&inventory, &VertexKey::switch("sw0")).await);

    inventory
        .register_devices(vec![json!({
            "deviceID": "mem1",
            "type": "memory",
            "links": [{ "deviceID": "cpuY" }],
            "deviceSwitchInfo": "sw1"
        })])
        .await
        .unwrap();
    assert!(!contains(&inventory, &VertexKey::node("cpuX")).await);
    assert!(contains(&inventory, &VertexKey::node("cpuY")).await);
    assert!(contains(&inventory, &VertexKey::switch("sw0")).await);
    assert!(targets(&inventory, &VertexKey::switch("sw0"), EdgeLabel::Connect).await.is_empty());
    assert_eq!(targets(&inventory, &VertexKey::switch("sw1"), EdgeLabel::Connect).await, vec!["mem1"]);
    assert_eq!(sources(&inventory, &mem_key("mem1"), EdgeLabel::Compose).await, vec!["cpuY"]);

    let sw0 = inventory.find_switch("sw0").await.unwrap().unwrap();
    assert!(sw0.resources.is_empty());
}

async fn invalid_batch_leaves_store_untouched<S: GraphStore>(inventory: Inventory<S>) {
    inventory.register_devices(vec![cpu("cpu1")]).await.unwrap();

    let err = inventory
        .register_devices(vec![cpu("cpu2"), json!({ "deviceID": "x", "type": "toaster" })])
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidRecord { index: 1, .. }));

    assert!(!contains(&inventory, &cpu_key("cpu2")).await);
    assert!(not_detected(&inventory).await.is_empty());
}

async fn quoted_device_id<S: GraphStore>(inventory: Inventory<S>) {
    let id = r#"mem "a"\1"#;
    inventory
        .register_devices(vec![cpu("cpu1"), memory(id, "cpu1")])
        .await
        .unwrap();

    let found = inventory.find_resource(id, &NoFilter).await.unwrap().unwrap();
    assert_eq!(found.device_id(), Some(id));
    assert_eq!(found.node_ids, Some(vec!["cpu1".to_string()]));
    assert_eq!(
        targets(&inventory, &VertexKey::node("cpu1"), EdgeLabel::Compose).await,
        vec!["cpu1".to_string(), id.to_string()]
    );
}

async fn initialize_is_idempotent<S: GraphStore>(inventory: Inventory<S>) {
    inventory.initialize().await.unwrap();

    assert_eq!(count(&inventory, VertexKind::Group).await, 1);
    assert_eq!(count(&inventory, VertexKind::NotDetected).await, 1);
}

#[tokio::test]
async fn test_registration_without_initialize() {
    let inventory = Inventory::new(MemoryStore::new(), InventorySettings::default());
    inventory.register_devices(vec![cpu("cpu1")]).await.unwrap();

    let graph = inventory.store().graph().await;
    assert!(graph.contains(&VertexKey::not_detected()));
    assert!(graph.contains(&VertexKey::group(DEFAULT_GROUP_ID)));
}

/// Memory store whose transactions fail when writing `Compose` edges.
struct FailingStore {
    inner: MemoryStore,
}

struct FailingTransaction {
    inner: MemoryTransaction,
}

#[async_trait]
impl GraphStore for FailingStore {
    type Transaction = FailingTransaction;

    async fn begin(&self) -> Result<FailingTransaction, StoreError> {
        Ok(FailingTransaction {
            inner: self.inner.begin().await?,
        })
    }
}

#[async_trait]
impl GraphTransaction for FailingTransaction {
    async fn merge_vertex(&mut self, key: &VertexKey, properties: &PropertyMap) -> Result<(), StoreError> {
        self.inner.merge_vertex(key, properties).await
    }

    async fn find_vertex(&mut self, key: &VertexKey) -> Result<Option<Vertex>, StoreError> {
        self.inner.find_vertex(key).await
    }

    async fn list_vertices(&mut self, kind: VertexKind) -> Result<Vec<Vertex>, StoreError> {
        self.inner.list_vertices(kind).await
    }

    async fn delete_vertex(&mut self, key: &VertexKey) -> Result<(), StoreError> {
        self.inner.delete_vertex(key).await
    }

    async fn create_edge(&mut self, from: &VertexKey, label: EdgeLabel, to: &VertexKey) -> Result<(), StoreError> {
        if label == EdgeLabel::Compose {
            return Err(StoreError::Database("injected failure".to_string()));
        }
        self.inner.create_edge(from, label, to).await
    }

    async fn delete_edges(&mut self, from: &VertexKey, label: EdgeLabel) -> Result<(), StoreError> {
        self.inner.delete_edges(from, label).await
    }

    async fn delete_edges_to(&mut self, to: &VertexKey, label: EdgeLabel) -> Result<(), StoreError> {
        self.inner.delete_edges_to(to, label).await
    }

    async fn neighbors(
        &mut self,
        key: &VertexKey,
        label: EdgeLabel,
        direction: Direction,
    ) -> Result<Vec<Vertex>, StoreError> {
        self.inner.neighbors(key, label, direction).await
    }

    async fn resource_records(&mut self, device_id: Option<&str>) -> Result<Vec<ResourceRecord>, StoreError> {
        self.inner.resource_records(device_id).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn test_failed_mutation_rolls_back_batch() {
    let shared = MemoryStore::new();
    let inventory = Inventory::new(
        FailingStore {
            inner: shared.clone(),
        },
        InventorySettings::default(),
    );
    inventory.initialize().await.unwrap();

    let err = inventory
        .register_devices(vec![cpu("cpu1"), memory("mem1", "cpu1")])
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::Store(StoreError::Database(_))));

    let graph = shared.graph().await;
    assert_eq!(graph.vertex_count(VertexKind::Resource(ResourceType::Cpu)), 0);
    assert_eq!(graph.vertex_count(VertexKind::Annotation), 0);
    assert_eq!(graph.edge_count(EdgeLabel::Include), 0);
}
