//! The inventory facade.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compose::{Composer, CxlSwitch, Detail, Node, Rack, Resource, ResourceGroup};
use crate::config::InventorySettings;
use crate::error::InventoryError;
use crate::filter::{NoFilter, Predicate};
use crate::graph::{
    Direction, EdgeLabel, PropertyMap, PropertyValue, ResourceType, VertexKey, VertexKind,
    NOT_DETECTED_ID,
};
use crate::layout::RackLayout;
use crate::reconcile::{DeviceRecord, Reconciler};
use crate::store::{rows, GraphStore, GraphTransaction, ResourceRecord};

/// Result of a registration batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "registeredDeviceIDs")]
    pub registered_device_ids: Vec<String>,
}

/// Hardware inventory over a graph store.
///
/// Reads run in their own transaction and roll it back. Writes commit on
/// success and roll back on any error. Registrations are serialized.
pub struct Inventory<S: GraphStore> {
    store: S,
    settings: InventorySettings,
    composer: Composer,
    registration: Mutex<()>,
}

impl<S: GraphStore> Inventory<S> {
    pub fn new(store: S, settings: InventorySettings) -> Self {
        let composer = Composer::new(
            settings.default_group.id.clone(),
            settings.list_properties.clone(),
        );
        Self {
            store,
            settings,
            composer,
            registration: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    /// Prepare the store and create the sentinel and default group.
    ///
    /// Safe to call on an initialized store.
    pub async fn initialize(&self) -> Result<(), InventoryError> {
        self.store.prepare().await?;

        let mut tx = self.store.begin().await?;
        let result = self.ensure_fixtures(&mut tx).await;
        finish_write(tx, result).await?;

        info!(default_group = %self.settings.default_group.id, "Inventory initialized");
        Ok(())
    }

    async fn ensure_fixtures(&self, tx: &mut S::Transaction) -> Result<(), InventoryError> {
        let sentinel = VertexKey::not_detected();
        if tx.find_vertex(&sentinel).await?.is_none() {
            let mut properties = PropertyMap::new();
            properties.insert("id".to_string(), PropertyValue::from(NOT_DETECTED_ID));
            tx.merge_vertex(&sentinel, &properties).await?;
        }

        let group = &self.settings.default_group;
        let key = VertexKey::group(group.id.as_str());
        if tx.find_vertex(&key).await?.is_none() {
            let now = timestamp();
            let properties = group_properties(&group.id, &group.name, &group.description, &now, &now);
            tx.merge_vertex(&key, &properties).await?;
            debug!(group_id = %group.id, "Created default group");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Synchronize the graph with one discovery batch.
    ///
    /// The whole batch is validated before the store is touched.
    pub async fn register_devices(
        &self,
        batch: Vec<serde_json::Value>,
    ) -> Result<Registration, InventoryError> {
        let records = DeviceRecord::parse_batch(batch)?;
        let _guard = self.registration.lock().await;

        let mut tx = self.store.begin().await?;
        let result: Result<Vec<String>, InventoryError> = async {
            self.ensure_fixtures(&mut tx).await?;
            let reconciler = Reconciler::new(&self.settings.default_group);
            Ok(reconciler.run(&mut tx, &records).await?)
        }
        .await;
        let registered_device_ids = finish_write(tx, result).await?;

        info!(devices = registered_device_ids.len(), "Registered devices");
        Ok(Registration {
            registered_device_ids,
        })
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// One resource by `deviceID`, if it exists and passes `filter`.
    pub async fn find_resource(
        &self,
        device_id: &str,
        filter: &dyn Predicate<Resource>,
    ) -> Result<Option<Resource>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = rows::resource_rows(&mut tx, Some(device_id)).await;
        let rows = finish_read(tx, result).await?;

        Ok(self
            .composer
            .resources(rows, Detail::Full, filter)
            .into_iter()
            .next())
    }

    /// All resources passing `filter`, ordered by `deviceID`.
    pub async fn list_resources(
        &self,
        detail: Detail,
        filter: &dyn Predicate<Resource>,
    ) -> Result<Vec<Resource>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = rows::resource_rows(&mut tx, None).await;
        let rows = finish_read(tx, result).await?;

        Ok(self.composer.resources(rows, detail, filter))
    }

    // ------------------------------------------------------------------
    // Nodes and switches
    // ------------------------------------------------------------------

    pub async fn find_node(&self, id: &str) -> Result<Option<Node>, InventoryError> {
        Ok(self.nodes(Some(id)).await?.into_iter().next())
    }

    pub async fn list_nodes(&self) -> Result<Vec<Node>, InventoryError> {
        self.nodes(None).await
    }

    async fn nodes(&self, id: Option<&str>) -> Result<Vec<Node>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = rows::member_rows(&mut tx, VertexKind::Node, EdgeLabel::Compose, id, true).await;
        let rows = finish_read(tx, result).await?;

        Ok(self.composer.nodes(rows, &NoFilter))
    }

    pub async fn find_switch(&self, id: &str) -> Result<Option<CxlSwitch>, InventoryError> {
        Ok(self.switches(Some(id)).await?.into_iter().next())
    }

    pub async fn list_switches(&self) -> Result<Vec<CxlSwitch>, InventoryError> {
        self.switches(None).await
    }

    async fn switches(&self, id: Option<&str>) -> Result<Vec<CxlSwitch>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = rows::member_rows(&mut tx, VertexKind::Switch, EdgeLabel::Connect, id, true).await;
        let rows = finish_read(tx, result).await?;

        Ok(self.composer.switches(rows, &NoFilter))
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub async fn find_group(
        &self,
        id: &str,
        with_resources: bool,
    ) -> Result<Option<ResourceGroup>, InventoryError> {
        Ok(self.groups(Some(id), with_resources).await?.into_iter().next())
    }

    /// All groups, default group first.
    pub async fn list_groups(&self, with_resources: bool) -> Result<Vec<ResourceGroup>, InventoryError> {
        self.groups(None, with_resources).await
    }

    async fn groups(
        &self,
        id: Option<&str>,
        with_resources: bool,
    ) -> Result<Vec<ResourceGroup>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result =
            rows::member_rows(&mut tx, VertexKind::Group, EdgeLabel::Include, id, with_resources).await;
        let rows = finish_read(tx, result).await?;

        Ok(self.composer.groups(rows, with_resources, &NoFilter))
    }

    pub async fn create_group(&self, name: &str, description: &str) -> Result<ResourceGroup, InventoryError> {
        let name = validate_group_name(name)?;
        let id = Uuid::now_v7().to_string();
        let now = timestamp();
        let properties = group_properties(&id, name, description, &now, &now);

        let mut tx = self.store.begin().await?;
        let result = tx
            .merge_vertex(&VertexKey::group(id.as_str()), &properties)
            .await
            .map_err(InventoryError::from);
        finish_write(tx, result).await?;

        info!(group_id = %id, name, "Created resource group");
        Ok(ResourceGroup {
            id,
            name: name.to_string(),
            description: description.to_string(),
            created_at: now.clone(),
            updated_at: now,
            resources: None,
        })
    }

    /// Rename or re-describe a group. The default group is fixed.
    pub async fn update_group(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Result<ResourceGroup, InventoryError> {
        self.reject_default_group(id, "updated")?;
        let name = validate_group_name(name)?;

        let mut tx = self.store.begin().await?;
        let result: Result<ResourceGroup, InventoryError> = async {
            let key = VertexKey::group(id);
            let existing = tx
                .find_vertex(&key)
                .await?
                .ok_or_else(|| InventoryError::not_found("Resource group", id))?;

            let created_at = existing.str_prop("createdAt").unwrap_or_default().to_string();
            let updated_at = timestamp();
            let properties = group_properties(id, name, description, &created_at, &updated_at);
            tx.merge_vertex(&key, &properties).await?;

            Ok(ResourceGroup {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                created_at,
                updated_at,
                resources: None,
            })
        }
        .await;
        let group = finish_write(tx, result).await?;

        info!(group_id = %id, "Updated resource group");
        Ok(group)
    }

    /// Delete an empty, non-default group.
    pub async fn delete_group(&self, id: &str) -> Result<(), InventoryError> {
        self.reject_default_group(id, "deleted")?;

        let mut tx = self.store.begin().await?;
        let result: Result<(), InventoryError> = async {
            let key = VertexKey::group(id);
            if tx.find_vertex(&key).await?.is_none() {
                return Err(InventoryError::not_found("Resource group", id));
            }
            let members = tx.neighbors(&key, EdgeLabel::Include, Direction::Out).await?;
            if !members.is_empty() {
                return Err(InventoryError::Conflict(format!(
                    "resource group {} still includes {} resources",
                    id,
                    members.len()
                )));
            }
            tx.delete_vertex(&key).await?;
            Ok(())
        }
        .await;
        finish_write(tx, result).await?;

        info!(group_id = %id, "Deleted resource group");
        Ok(())
    }

    /// Replace the groups a resource belongs to. Returns the sorted group ids.
    pub async fn set_resource_groups(
        &self,
        device_id: &str,
        group_ids: &[String],
    ) -> Result<Vec<String>, InventoryError> {
        let group_ids: Vec<String> = group_ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if group_ids.is_empty() {
            return Err(InventoryError::Validation(
                "a resource must belong to at least one group".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let result: Result<(), InventoryError> = async {
            let (kind, _) = find_record(&mut tx, device_id).await?;
            for group_id in &group_ids {
                if tx.find_vertex(&VertexKey::group(group_id.as_str())).await?.is_none() {
                    return Err(InventoryError::not_found("Resource group", group_id.as_str()));
                }
            }

            let key = VertexKey::resource(kind, device_id);
            tx.delete_edges_to(&key, EdgeLabel::Include).await?;
            for group_id in &group_ids {
                tx.create_edge(&VertexKey::group(group_id.as_str()), EdgeLabel::Include, &key)
                    .await?;
            }
            Ok(())
        }
        .await;
        finish_write(tx, result).await?;

        info!(device_id, groups = group_ids.len(), "Assigned resource groups");
        Ok(group_ids)
    }

    fn reject_default_group(&self, id: &str, action: &str) -> Result<(), InventoryError> {
        if id == self.settings.default_group.id {
            return Err(InventoryError::Conflict(format!(
                "the default group cannot be {}",
                action
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    /// Set the `available` flag of a resource's annotation.
    pub async fn set_annotation(&self, device_id: &str, available: bool) -> Result<Resource, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result: Result<ResourceRecord, InventoryError> = async {
            let (kind, mut record) = find_record(&mut tx, device_id).await?;
            let key = VertexKey::annotation(kind, device_id);
            let exists = tx.find_vertex(&key).await?.is_some();

            record
                .annotation
                .insert("available".to_string(), PropertyValue::Bool(available));
            tx.merge_vertex(&key, &record.annotation).await?;
            if !exists {
                warn!(device_id, "Resource had no annotation, creating one");
                tx.create_edge(&VertexKey::resource(kind, device_id), EdgeLabel::Have, &key)
                    .await?;
            }
            Ok(record)
        }
        .await;
        let record = finish_write(tx, result).await?;

        info!(device_id, available, "Updated annotation");
        self.composer
            .compose_resource(&rows::cells(&record), true)
            .ok_or_else(|| InventoryError::not_found("Resource", device_id))
    }

    // ------------------------------------------------------------------
    // Racks
    // ------------------------------------------------------------------

    pub async fn find_rack(&self, id: &str, detail: Detail) -> Result<Option<Rack>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = rows::rack_rows(&mut tx, id).await;
        let rows = finish_read(tx, result).await?;

        Ok(self.composer.rack(rows, detail))
    }

    /// Replace a rack's layout.
    ///
    /// Chassis dropped from the layout are deleted. A device or switch
    /// mounted elsewhere moves to the chassis listing it.
    pub async fn register_rack(&self, layout: RackLayout) -> Result<Rack, InventoryError> {
        layout.validate()?;
        let _guard = self.registration.lock().await;

        let mut tx = self.store.begin().await?;
        let result = self.apply_layout(&mut tx, &layout).await;
        finish_write(tx, result).await?;
        info!(rack_id = %layout.id, chassis = layout.chassis.len(), "Registered rack");

        self.find_rack(&layout.id, Detail::Full)
            .await?
            .ok_or_else(|| InventoryError::not_found("Rack", layout.id.as_str()))
    }

    async fn apply_layout(&self, tx: &mut S::Transaction, layout: &RackLayout) -> Result<(), InventoryError> {
        // Resolve everything before the first write.
        let kinds: HashMap<String, ResourceType> = tx
            .resource_records(None)
            .await?
            .into_iter()
            .filter_map(|r| match r.vertex.kind {
                Some(VertexKind::Resource(kind)) => r.device_id().map(|id| (id.to_string(), kind)),
                _ => None,
            })
            .collect();
        for chassis in &layout.chassis {
            for device_id in &chassis.device_ids {
                if !kinds.contains_key(device_id) {
                    return Err(InventoryError::not_found("Resource", device_id.as_str()));
                }
            }
            for switch_id in &chassis.switch_ids {
                if tx.find_vertex(&VertexKey::switch(switch_id.as_str())).await?.is_none() {
                    return Err(InventoryError::not_found("CXL switch", switch_id.as_str()));
                }
            }
        }

        let rack = VertexKey::rack(layout.id.as_str());
        let listed: HashSet<&str> = layout.chassis.iter().map(|c| c.id.as_str()).collect();
        for old in tx.neighbors(&rack, EdgeLabel::Mount, Direction::Out).await? {
            if let Some(id) = old.identity().filter(|id| !listed.contains(id)) {
                debug!(rack_id = %layout.id, chassis_id = id, "Removing chassis");
                tx.delete_vertex(&VertexKey::chassis(id)).await?;
            }
        }

        tx.merge_vertex(&rack, &layout.vertex_properties()).await?;
        tx.delete_edges(&rack, EdgeLabel::Mount).await?;

        for chassis in &layout.chassis {
            let key = VertexKey::chassis(chassis.id.as_str());
            tx.merge_vertex(&key, &chassis.vertex_properties()).await?;
            tx.delete_edges_to(&key, EdgeLabel::Mount).await?;
            tx.create_edge(&rack, EdgeLabel::Mount, &key).await?;
            tx.delete_edges(&key, EdgeLabel::Mount).await?;

            let devices = chassis
                .device_ids
                .iter()
                .filter_map(|id| kinds.get(id).map(|kind| VertexKey::resource(*kind, id.as_str())));
            let switches = chassis.switch_ids.iter().map(|id| VertexKey::switch(id.as_str()));
            for mounted in devices.chain(switches) {
                tx.delete_edges_to(&mounted, EdgeLabel::Mount).await?;
                tx.create_edge(&key, EdgeLabel::Mount, &mounted).await?;
            }
        }
        Ok(())
    }
}

/// Look up a resource by `deviceID`.
async fn find_record<T: GraphTransaction>(
    tx: &mut T,
    device_id: &str,
) -> Result<(ResourceType, ResourceRecord), InventoryError> {
    let record = tx
        .resource_records(Some(device_id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| InventoryError::not_found("Resource", device_id))?;

    match record.vertex.kind {
        Some(VertexKind::Resource(kind)) => Ok((kind, record)),
        _ => Err(InventoryError::not_found("Resource", device_id)),
    }
}

/// Commit on success, roll back on failure.
async fn finish_write<T: GraphTransaction, R>(
    tx: T,
    result: Result<R, InventoryError>,
) -> Result<R, InventoryError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Close a read-only transaction.
async fn finish_read<T: GraphTransaction, R>(
    tx: T,
    result: Result<R, crate::store::StoreError>,
) -> Result<R, InventoryError> {
    tx.rollback().await?;
    Ok(result?)
}

fn validate_group_name(name: &str) -> Result<&str, InventoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InventoryError::Validation(
            "group name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

fn group_properties(
    id: &str,
    name: &str,
    description: &str,
    created_at: &str,
    updated_at: &str,
) -> PropertyMap {
    [
        ("id", id),
        ("name", name),
        ("description", description),
        ("createdAt", created_at),
        ("updatedAt", updated_at),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), PropertyValue::from(v)))
    .collect()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}
