//! Incoming device records.

use serde_json::Value;

use crate::error::InventoryError;
use crate::graph::value::map_from_json;
use crate::graph::{PropertyMap, PropertyValue, ResourceType};

/// A validated device record from a discovery batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device_id: String,
    pub kind: ResourceType,
    /// The full incoming property set, `deviceID` and `type` included.
    pub properties: PropertyMap,
}

impl DeviceRecord {
    /// Validate the record at `index` of a batch.
    pub fn parse(index: usize, value: Value) -> Result<Self, InventoryError> {
        let invalid = |reason: String| InventoryError::InvalidRecord { index, reason };

        let Value::Object(object) = value else {
            return Err(invalid("record is not an object".to_string()));
        };
        let properties = map_from_json(object);

        let device_id = properties
            .get("deviceID")
            .and_then(PropertyValue::as_non_empty_str)
            .ok_or_else(|| invalid("deviceID must be a non-empty string".to_string()))?
            .to_string();

        let kind = properties
            .get("type")
            .and_then(PropertyValue::as_str)
            .ok_or_else(|| invalid("type must be a string".to_string()))?
            .parse::<ResourceType>()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            device_id,
            kind,
            properties,
        })
    }

    /// Validate a whole batch, failing on the first bad record.
    pub fn parse_batch(batch: Vec<Value>) -> Result<Vec<Self>, InventoryError> {
        batch
            .into_iter()
            .enumerate()
            .map(|(index, value)| Self::parse(index, value))
            .collect()
    }

    /// The node this resource belongs to.
    ///
    /// A CPU is its own node. Anything else follows the first link.
    pub fn node_id(&self) -> Option<&str> {
        if self.kind == ResourceType::Cpu {
            return Some(self.device_id.as_str());
        }

        self.properties
            .get("links")
            .and_then(PropertyValue::as_list)
            .and_then(|links| links.first())
            .and_then(PropertyValue::as_map)
            .and_then(|link| link.get("deviceID"))
            .and_then(PropertyValue::as_non_empty_str)
    }

    /// The CXL switch this resource hangs off.
    pub fn switch_id(&self) -> Option<&str> {
        self.properties
            .get("deviceSwitchInfo")
            .and_then(PropertyValue::as_non_empty_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_accepts_any_case() {
        let record = DeviceRecord::parse(0, json!({ "deviceID": "nic0", "type": "NETWORKINTERFACE" })).unwrap();
        assert_eq!(record.kind, ResourceType::NetworkInterface);
        assert_eq!(record.properties["type"], PropertyValue::from("NETWORKINTERFACE"));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        let cases = [
            json!("cpu0"),
            json!({ "type": "CPU" }),
            json!({ "deviceID": "", "type": "CPU" }),
            json!({ "deviceID": 7, "type": "CPU" }),
            json!({ "deviceID": "x" }),
            json!({ "deviceID": "x", "type": "toaster" }),
        ];
        for case in cases {
            let err = DeviceRecord::parse(3, case).unwrap_err();
            assert!(matches!(err, InventoryError::InvalidRecord { index: 3, .. }));
        }
    }

    #[test]
    fn test_parse_batch_names_failing_index() {
        let batch = vec![
            json!({ "deviceID": "cpu0", "type": "CPU" }),
            json!({ "deviceID": "mem0", "type": "memory" }),
            json!({ "deviceID": "mem1" }),
        ];
        let err = DeviceRecord::parse_batch(batch).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidRecord { index: 2, .. }));
    }

    #[test]
    fn test_node_id() {
        let cpu = DeviceRecord::parse(0, json!({ "deviceID": "cpu0", "type": "cpu" })).unwrap();
        assert_eq!(cpu.node_id(), Some("cpu0"));

        let linked = DeviceRecord::parse(
            0,
            json!({ "deviceID": "mem0", "type": "memory", "links": [{ "deviceID": "cpu0" }, { "deviceID": "cpu1" }] }),
        )
        .unwrap();
        assert_eq!(linked.node_id(), Some("cpu0"));

        for links in [json!([]), json!(null), json!(["cpu0"]), json!([{ "deviceID": "" }]), json!({ "deviceID": "cpu0" })] {
            let record =
                DeviceRecord::parse(0, json!({ "deviceID": "mem0", "type": "memory", "links": links })).unwrap();
            assert_eq!(record.node_id(), None);
        }
    }

    #[test]
    fn test_switch_id() {
        let record =
            DeviceRecord::parse(0, json!({ "deviceID": "mem0", "type": "memory", "deviceSwitchInfo": "sw0" })).unwrap();
        assert_eq!(record.switch_id(), Some("sw0"));

        let record =
            DeviceRecord::parse(0, json!({ "deviceID": "mem0", "type": "memory", "deviceSwitchInfo": "" })).unwrap();
        assert_eq!(record.switch_id(), None);
    }
}
