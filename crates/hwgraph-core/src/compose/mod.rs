//! Result composition.
//!
//! Turns the flat rows of [`crate::store::rows`] into nested, ordered
//! records. Every listing follows the same three steps: sort rows by a
//! listing-specific key, walk them grouping on parent boundaries, and build
//! each child through [`Composer::compose_resource`].

mod models;

pub use models::{
    Annotation, Chassis, CxlSwitch, Detail, Node, Rack, Resource, ResourceGroup, SwitchSummary,
};

use std::cmp::Ordering;
use tracing::warn;

use crate::filter::Predicate;
use crate::graph::{ChildCells, GraphRow, PropertyMap, PropertyValue, RackRow, Vertex, VertexKind};

/// Device keys kept in summary mode.
const SUMMARY_KEYS: [&str; 3] = ["deviceID", "type", "status"];

/// Builds composed records from listing rows.
#[derive(Debug, Clone)]
pub struct Composer {
    default_group_id: String,
    list_properties: Vec<String>,
}

impl Composer {
    /// `list_properties` name the device fields that are normalized to an
    /// empty list when null or absent.
    pub fn new(default_group_id: impl Into<String>, list_properties: Vec<String>) -> Self {
        Self {
            default_group_id: default_group_id.into(),
            list_properties,
        }
    }

    /// Compose one child into a full resource record.
    ///
    /// Returns `None` for the placeholder child.
    pub fn compose_resource(&self, cells: &ChildCells, with_node_ids: bool) -> Option<Resource> {
        if cells.vertex.is_placeholder() {
            return None;
        }

        let available = cells
            .annotation
            .get("available")
            .and_then(PropertyValue::as_bool)
            .unwrap_or(true);

        let mut device = cells.vertex.properties.clone();
        for name in &self.list_properties {
            let missing = device.get(name).map_or(true, PropertyValue::is_null);
            if missing {
                device.insert(name.clone(), PropertyValue::List(Vec::new()));
            }
        }

        Some(Resource {
            device,
            annotation: Annotation { available },
            resource_group_ids: cells.resource_group_ids.clone(),
            node_ids: with_node_ids.then(|| cells.node_ids.clone()),
            detected: !cells.not_detected,
        })
    }

    /// Flat resource listing, ordered by `deviceID`.
    ///
    /// The filter sees the full record; trimming to `detail` happens after.
    pub fn resources(
        &self,
        mut rows: Vec<GraphRow>,
        detail: Detail,
        filter: &dyn Predicate<Resource>,
    ) -> Vec<Resource> {
        rows.sort_by(|a, b| {
            child_device_id(&a.child)
                .cmp(child_device_id(&b.child))
                .then_with(|| a.child.vertex.internal_id.cmp(&b.child.vertex.internal_id))
        });

        rows.iter()
            .filter_map(|row| self.compose_resource(&row.child, true))
            .filter(|resource| filter.test(resource))
            .map(|resource| trim(resource, detail))
            .collect()
    }

    pub fn nodes(&self, rows: Vec<GraphRow>, filter: &dyn Predicate<Node>) -> Vec<Node> {
        self.nest(rows, false, false, filter, |id, _, resources| Node {
            id: id.to_string(),
            resources,
        })
    }

    pub fn switches(&self, rows: Vec<GraphRow>, filter: &dyn Predicate<CxlSwitch>) -> Vec<CxlSwitch> {
        self.nest(rows, false, true, filter, |id, _, resources| CxlSwitch {
            id: id.to_string(),
            resources,
        })
    }

    /// Group listing; the default group always comes first.
    pub fn groups(
        &self,
        rows: Vec<GraphRow>,
        with_resources: bool,
        filter: &dyn Predicate<ResourceGroup>,
    ) -> Vec<ResourceGroup> {
        self.nest(rows, true, true, filter, |id, parent, resources| {
            let text = |key: &str| parent.str_prop(key).unwrap_or_default().to_string();
            ResourceGroup {
                id: id.to_string(),
                name: text("name"),
                description: text("description"),
                created_at: text("createdAt"),
                updated_at: text("updatedAt"),
                resources: with_resources.then_some(resources),
            }
        })
    }

    /// Sort, then fold rows into parents on each parent-key boundary.
    fn nest<P, F>(
        &self,
        mut rows: Vec<GraphRow>,
        default_first: bool,
        with_node_ids: bool,
        filter: &dyn Predicate<P>,
        build: F,
    ) -> Vec<P>
    where
        F: Fn(&str, &Vertex, Vec<Resource>) -> P,
    {
        rows.sort_by(|a, b| {
            let rank = |row: &GraphRow| {
                default_first && row.parent.identity() == Some(self.default_group_id.as_str())
            };
            // `true` sorts after `false`, so compare the default flags reversed
            rank(b)
                .cmp(&rank(a))
                .then_with(|| parent_id(&a.parent).cmp(parent_id(&b.parent)))
                .then_with(|| a.parent.internal_id.cmp(&b.parent.internal_id))
                .then_with(|| child_device_id(&a.child).cmp(child_device_id(&b.child)))
        });

        let mut out = Vec::new();
        let mut current: Option<(&Vertex, Vec<Resource>)> = None;

        for row in &rows {
            let boundary = match &current {
                Some((parent, _)) => parent.internal_id != row.parent.internal_id,
                None => true,
            };
            if boundary {
                if let Some((parent, children)) = current.take() {
                    self.finish(parent, children, filter, &build, &mut out);
                }
                current = Some((&row.parent, Vec::new()));
            }

            if let (Some((_, children)), Some(resource)) =
                (current.as_mut(), self.compose_resource(&row.child, with_node_ids))
            {
                children.push(resource);
            }
        }
        if let Some((parent, children)) = current {
            self.finish(parent, children, filter, &build, &mut out);
        }

        out
    }

    fn finish<P, F>(
        &self,
        parent: &Vertex,
        children: Vec<Resource>,
        filter: &dyn Predicate<P>,
        build: &F,
        out: &mut Vec<P>,
    ) where
        F: Fn(&str, &Vertex, Vec<Resource>) -> P,
    {
        let Some(id) = parent.identity() else {
            warn!(
                internal_id = %parent.internal_id,
                "Dropping parent without a string id"
            );
            return;
        };

        let composed = build(id, parent, children);
        if filter.test(&composed) {
            out.push(composed);
        }
    }

    /// Compose a rack from its rows. `None` when there are no rows.
    ///
    /// Chassis come out ordered by unit position (missing sorts as -1) and
    /// then id; their contents by type, `deviceID` and internal id.
    pub fn rack(&self, mut rows: Vec<RackRow>, detail: Detail) -> Option<Rack> {
        let first = rows.first()?;
        let Some(rack_id) = first.rack.identity().map(str::to_string) else {
            warn!(internal_id = %first.rack.internal_id, "Dropping rack without a string id");
            return None;
        };
        let rack_properties = without(&first.rack.properties, &["id"]);

        rows.sort_by(rack_order);

        let mut chassis: Vec<Chassis> = Vec::new();
        for row in &rows {
            if row.chassis.is_placeholder() {
                continue;
            }
            let Some(chassis_id) = row.chassis.identity() else {
                warn!(
                    rack_id = %rack_id,
                    internal_id = %row.chassis.internal_id,
                    "Dropping chassis without a string id"
                );
                continue;
            };

            let index = match chassis.iter().position(|c| c.id == chassis_id) {
                Some(index) => index,
                None => {
                    chassis.push(Chassis {
                        id: chassis_id.to_string(),
                        unit_position: unit_position(&row.chassis),
                        properties: without(&row.chassis.properties, &["id", "unitPosition"]),
                        resources: Vec::new(),
                        switches: Vec::new(),
                    });
                    chassis.len() - 1
                }
            };
            let entry = &mut chassis[index];

            match row.child.vertex.kind {
                Some(VertexKind::Switch) => match row.child.vertex.identity() {
                    Some(id) => entry.switches.push(SwitchSummary {
                        id: id.to_string(),
                        properties: row.child.vertex.properties.clone(),
                    }),
                    None => warn!(chassis_id = %entry.id, "Dropping switch without a string id"),
                },
                _ => {
                    if let Some(resource) = self.compose_resource(&row.child, true) {
                        entry.resources.push(trim(resource, detail));
                    }
                }
            }
        }

        chassis.sort_by(|a, b| {
            a.unit_position
                .unwrap_or(-1)
                .cmp(&b.unit_position.unwrap_or(-1))
                .then_with(|| a.id.cmp(&b.id))
        });

        Some(Rack {
            id: rack_id,
            properties: rack_properties,
            chassis,
        })
    }
}

/// Reduce a composed resource to the requested detail.
pub fn trim(mut resource: Resource, detail: Detail) -> Resource {
    if detail == Detail::Summary {
        resource.device.retain(|k, _| SUMMARY_KEYS.contains(&k.as_str()));
    }
    resource
}

fn parent_id(vertex: &Vertex) -> &str {
    vertex.identity().unwrap_or_default()
}

/// Sort identity of a child: `deviceID` for resources, `id` for switches.
fn child_device_id(cells: &ChildCells) -> &str {
    cells
        .vertex
        .str_prop("deviceID")
        .or_else(|| cells.vertex.str_prop("id"))
        .unwrap_or_default()
}

fn child_type(cells: &ChildCells) -> &str {
    cells.vertex.str_prop("type").unwrap_or_default()
}

fn unit_position(chassis: &Vertex) -> Option<i64> {
    chassis.properties.get("unitPosition").and_then(PropertyValue::as_i64)
}

fn rack_order(a: &RackRow, b: &RackRow) -> Ordering {
    unit_position(&a.chassis)
        .unwrap_or(-1)
        .cmp(&unit_position(&b.chassis).unwrap_or(-1))
        .then_with(|| child_type(&a.child).cmp(child_type(&b.child)))
        .then_with(|| child_device_id(&a.child).cmp(child_device_id(&b.child)))
        .then_with(|| a.child.vertex.internal_id.cmp(&b.child.vertex.internal_id))
}

fn without(properties: &PropertyMap, keys: &[&str]) -> PropertyMap {
    properties
        .iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
