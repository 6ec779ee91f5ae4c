//! Rack layouts submitted by operators.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::InventoryError;
use crate::graph::{PropertyMap, PropertyValue};

/// Physical placement of chassis in one rack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RackLayout {
    pub id: String,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub chassis: Vec<ChassisLayout>,
}

/// One chassis and what is mounted in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChassisLayout {
    pub id: String,
    #[serde(default)]
    pub unit_position: Option<i64>,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(rename = "deviceIDs", default)]
    pub device_ids: Vec<String>,
    #[serde(rename = "switchIDs", default)]
    pub switch_ids: Vec<String>,
}

impl RackLayout {
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.id.trim().is_empty() {
            return Err(InventoryError::Validation("rack id must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for chassis in &self.chassis {
            if chassis.id.trim().is_empty() {
                return Err(InventoryError::Validation(format!(
                    "chassis id in rack {} must not be empty",
                    self.id
                )));
            }
            if !seen.insert(chassis.id.as_str()) {
                return Err(InventoryError::Validation(format!(
                    "chassis {} listed twice in rack {}",
                    chassis.id, self.id
                )));
            }
        }
        Ok(())
    }

    /// Vertex properties of the rack.
    pub fn vertex_properties(&self) -> PropertyMap {
        let mut properties = self.properties.clone();
        properties.insert("id".to_string(), PropertyValue::from(self.id.as_str()));
        properties
    }
}

impl ChassisLayout {
    /// Vertex properties of the chassis.
    pub fn vertex_properties(&self) -> PropertyMap {
        let mut properties = self.properties.clone();
        properties.insert("id".to_string(), PropertyValue::from(self.id.as_str()));
        match self.unit_position {
            Some(unit) => properties.insert("unitPosition".to_string(), PropertyValue::Integer(unit)),
            None => properties.remove("unitPosition"),
        };
        properties
    }
}
