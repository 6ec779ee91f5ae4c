//! Composed records returned to callers.

use serde::{Deserialize, Serialize};

use crate::graph::PropertyMap;

/// User- and system-settable metadata of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub available: bool,
}

impl Default for Annotation {
    fn default() -> Self {
        Self { available: true }
    }
}

/// A composed resource record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Device properties as reported by discovery (trimmed in summary mode).
    pub device: PropertyMap,
    pub annotation: Annotation,
    #[serde(rename = "resourceGroupIDs")]
    pub resource_group_ids: Vec<String>,
    /// Omitted in node listings, where the parent already is the node.
    #[serde(rename = "nodeIDs", default, skip_serializing_if = "Option::is_none")]
    pub node_ids: Option<Vec<String>>,
    /// False when the resource was absent from the latest discovery batch.
    pub detected: bool,
}

impl Resource {
    pub fn device_id(&self) -> Option<&str> {
        self.device.get("deviceID").and_then(|v| v.as_str())
    }
}

/// A node (composed unit) with the resources composing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub resources: Vec<Resource>,
}

/// A CXL switch with the resources connected to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CxlSwitch {
    pub id: String,
    pub resources: Vec<Resource>,
}

/// A resource group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    /// Present only when resources were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
}

/// A switch mounted in a chassis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchSummary {
    pub id: String,
    pub properties: PropertyMap,
}

/// A chassis and what is mounted in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chassis {
    pub id: String,
    pub unit_position: Option<i64>,
    pub properties: PropertyMap,
    pub resources: Vec<Resource>,
    pub switches: Vec<SwitchSummary>,
}

/// A rack and its chassis, ordered by unit position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rack {
    pub id: String,
    pub properties: PropertyMap,
    pub chassis: Vec<Chassis>,
}

/// Amount of device detail in composed resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detail {
    /// Only `deviceID`, `type` and `status`.
    Summary,
    #[default]
    Full,
}
