//! Pre-registration view of the inventory.

use std::collections::BTreeMap;
use tracing::warn;

use crate::graph::{Direction, EdgeLabel, ResourceType, VertexKey, VertexKind};
use crate::store::{GraphTransaction, StoreError};

/// Members of one node or switch: `deviceID` to category.
pub type Members = BTreeMap<String, ResourceType>;

/// A known resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    pub kind: ResourceType,
    pub group_ids: Vec<String>,
    /// Seen in the batch being registered.
    pub confirmed: bool,
}

/// Three independent maps keyed by natural id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub resources: BTreeMap<String, ResourceEntry>,
    pub nodes: BTreeMap<String, Members>,
    pub switches: BTreeMap<String, Members>,
}

impl Snapshot {
    /// Load the current state from the store.
    pub async fn load<T: GraphTransaction>(tx: &mut T) -> Result<Self, StoreError> {
        let mut snapshot = Self::default();

        for record in tx.resource_records(None).await? {
            let Some(device_id) = record.device_id() else {
                warn!(internal_id = %record.vertex.internal_id, "Skipping resource without deviceID");
                continue;
            };
            let kind = match record.vertex.str_prop("type").map(str::parse::<ResourceType>) {
                Some(Ok(kind)) => kind,
                _ => {
                    warn!(device_id, "Skipping resource with unknown type");
                    continue;
                }
            };
            snapshot.resources.insert(
                device_id.to_string(),
                ResourceEntry {
                    kind,
                    group_ids: record.group_ids.clone(),
                    confirmed: false,
                },
            );
        }

        snapshot.nodes = members(tx, VertexKind::Node, EdgeLabel::Compose).await?;
        snapshot.switches = members(tx, VertexKind::Switch, EdgeLabel::Connect).await?;

        Ok(snapshot)
    }

    /// Record `device_id` under node `owner`, detaching it from every other node.
    pub fn attach_to_node(&mut self, owner: &str, device_id: &str, kind: ResourceType) {
        attach(&mut self.nodes, owner, device_id, kind);
    }

    /// Record `device_id` under switch `owner`, detaching it from every other switch.
    pub fn attach_to_switch(&mut self, owner: &str, device_id: &str, kind: ResourceType) {
        attach(&mut self.switches, owner, device_id, kind);
    }
}

fn attach(owners: &mut BTreeMap<String, Members>, owner: &str, device_id: &str, kind: ResourceType) {
    for (id, members) in owners.iter_mut() {
        if id != owner {
            members.remove(device_id);
        }
    }
    owners
        .entry(owner.to_string())
        .or_default()
        .insert(device_id.to_string(), kind);
}

/// Every parent of `kind`, including those without members.
async fn members<T: GraphTransaction>(
    tx: &mut T,
    kind: VertexKind,
    label: EdgeLabel,
) -> Result<BTreeMap<String, Members>, StoreError> {
    let mut out = BTreeMap::new();

    for parent in tx.list_vertices(kind).await? {
        let Some(id) = parent.identity().map(str::to_string) else {
            warn!(internal_id = %parent.internal_id, table = kind.table(), "Skipping vertex without id");
            continue;
        };

        let mut entry = Members::new();
        for child in tx.neighbors(&VertexKey::new(kind, id.as_str()), label, Direction::Out).await? {
            if let (Some(VertexKind::Resource(t)), Some(device_id)) = (child.kind, child.str_prop("deviceID")) {
                entry.insert(device_id.to_string(), t);
            }
        }
        out.insert(id, entry);
    }

    Ok(out)
}
