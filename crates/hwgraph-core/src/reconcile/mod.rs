//! Inventory reconciliation.
//!
//! [`Reconciler::run`] converges the graph onto one discovery batch inside a
//! single transaction:
//!
//! 1. load a [`Snapshot`] of resources, nodes and switches
//! 2. upsert every incoming resource, creating its annotation and default
//!    group membership on first sighting, clearing its `NotDetected` mark,
//!    and attributing it to a node and a switch
//! 3. mark every resource missing from the batch as not detected
//! 4. rebuild each node's `Compose` edges, then drop nodes left empty
//! 5. rebuild each switch's `Connect` edges; empty switches are kept
//!
//! The caller owns the transaction and decides between commit and rollback.

mod record;
mod snapshot;

pub use record::DeviceRecord;
pub use snapshot::{Members, ResourceEntry, Snapshot};

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::DefaultGroup;
use crate::graph::{EdgeLabel, PropertyMap, PropertyValue, VertexKey, VertexKind};
use crate::store::{GraphTransaction, StoreError};

/// Runs the registration algorithm against a transaction.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    default_group: &'a DefaultGroup,
}

impl<'a> Reconciler<'a> {
    pub fn new(default_group: &'a DefaultGroup) -> Self {
        Self { default_group }
    }

    /// Register `records`, returning their `deviceID`s in input order.
    ///
    /// The sentinel and the default group must already exist.
    pub async fn run<T: GraphTransaction>(
        &self,
        tx: &mut T,
        records: &[DeviceRecord],
    ) -> Result<Vec<String>, StoreError> {
        let mut snapshot = Snapshot::load(tx).await?;
        let sentinel = VertexKey::not_detected();
        let default_group = VertexKey::group(self.default_group.id.as_str());

        for record in records {
            let key = VertexKey::resource(record.kind, record.device_id.as_str());
            tx.merge_vertex(&key, &record.properties).await?;

            match snapshot.resources.get_mut(&record.device_id) {
                Some(entry) => entry.confirmed = true,
                None => {
                    let annotation = VertexKey::annotation(record.kind, &record.device_id);
                    tx.merge_vertex(&annotation, &new_annotation()).await?;
                    tx.create_edge(&key, EdgeLabel::Have, &annotation).await?;
                    tx.create_edge(&default_group, EdgeLabel::Include, &key).await?;

                    snapshot.resources.insert(
                        record.device_id.clone(),
                        ResourceEntry {
                            kind: record.kind,
                            group_ids: vec![self.default_group.id.clone()],
                            confirmed: true,
                        },
                    );
                    debug!(device_id = %record.device_id, kind = %record.kind, "New resource");
                }
            }
            tx.delete_edges(&key, EdgeLabel::NotDetected).await?;

            if let Some(node_id) = record.node_id() {
                snapshot.attach_to_node(node_id, &record.device_id, record.kind);
            }
            if let Some(switch_id) = record.switch_id() {
                snapshot.attach_to_switch(switch_id, &record.device_id, record.kind);
            }
        }

        for (device_id, entry) in snapshot.resources.iter().filter(|(_, e)| !e.confirmed) {
            let key = VertexKey::resource(entry.kind, device_id.as_str());
            tx.delete_edges(&key, EdgeLabel::NotDetected).await?;
            tx.create_edge(&key, EdgeLabel::NotDetected, &sentinel).await?;
            debug!(device_id = %device_id, "Resource not detected");
        }

        rebuild(tx, &snapshot.nodes, VertexKind::Node, EdgeLabel::Compose).await?;
        delete_empty_nodes(tx, &snapshot.nodes).await?;
        rebuild(tx, &snapshot.switches, VertexKind::Switch, EdgeLabel::Connect).await?;

        Ok(records.iter().map(|r| r.device_id.clone()).collect())
    }
}

fn new_annotation() -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert("available".to_string(), PropertyValue::Bool(true));
    properties
}

/// Replace the `label` edges of every parent with exactly its members.
async fn rebuild<T: GraphTransaction>(
    tx: &mut T,
    parents: &BTreeMap<String, Members>,
    kind: VertexKind,
    label: EdgeLabel,
) -> Result<(), StoreError> {
    for (id, members) in parents {
        let key = VertexKey::new(kind, id.as_str());
        tx.delete_edges(&key, EdgeLabel::NotDetected).await?;
        ensure_vertex(tx, &key).await?;
        tx.delete_edges(&key, label).await?;

        for (device_id, member_kind) in members {
            tx.create_edge(&key, label, &VertexKey::resource(*member_kind, device_id.as_str()))
                .await?;
        }
    }
    Ok(())
}

/// Delete every node left without members.
///
/// The snapshot holds every node vertex, so this covers nodes emptied in
/// earlier passes as well as the current one.
async fn delete_empty_nodes<T: GraphTransaction>(
    tx: &mut T,
    nodes: &BTreeMap<String, Members>,
) -> Result<(), StoreError> {
    let mut deleted = 0;
    for (id, _) in nodes.iter().filter(|(_, members)| members.is_empty()) {
        tx.delete_vertex(&VertexKey::node(id.as_str())).await?;
        deleted += 1;
    }
    if deleted > 0 {
        debug!(count = deleted, "Deleted empty nodes");
    }
    Ok(())
}

/// Create a parent vertex carrying only its id, keeping an existing one as is.
async fn ensure_vertex<T: GraphTransaction>(tx: &mut T, key: &VertexKey) -> Result<(), StoreError> {
    if tx.find_vertex(key).await?.is_none() {
        let mut properties = PropertyMap::new();
        properties.insert("id".to_string(), PropertyValue::from(key.id.as_str()));
        tx.merge_vertex(key, &properties).await?;
    }
    Ok(())
}
