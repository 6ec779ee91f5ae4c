//! Property graph vocabulary for the hardware inventory.
//!
//! The inventory is stored as a property graph:
//!
//! - **Vertices**: resources (one label per [`ResourceType`]), annotations,
//!   nodes, CXL switches, resource groups, racks, chassis, and the
//!   not-detected sentinel
//! - **Edges**: `Compose` (node → resource), `Connect` (switch → resource),
//!   `Include` (group → resource), `Have` (resource → annotation),
//!   `NotDetected` (resource/node/switch → sentinel), `Mount`
//!   (rack → chassis, chassis → resource/switch)
//!
//! Vertices are addressed by natural key through [`VertexKey`]; the graph
//! assigns each vertex an opaque internal id, surfaced in [`Vertex`].

pub mod literal;
mod resource_type;
pub mod value;

pub use literal::{to_literal, LiteralError};
pub use resource_type::{ResourceType, UnknownResourceType};
pub use value::{lookup, PropertyMap, PropertyValue};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the not-detected sentinel vertex.
pub const NOT_DETECTED_ID: &str = "sentinel";

/// Vertex labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexKind {
    Resource(ResourceType),
    Annotation,
    Node,
    Switch,
    Group,
    Rack,
    Chassis,
    NotDetected,
}

impl VertexKind {
    /// Table (label) name in the store.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Resource(t) => t.label(),
            Self::Annotation => "annotation",
            Self::Node => "node",
            Self::Switch => "cxl_switch",
            Self::Group => "resource_group",
            Self::Rack => "rack",
            Self::Chassis => "chassis",
            Self::NotDetected => "not_detected_device",
        }
    }

    pub fn from_table(table: &str) -> Option<Self> {
        match table {
            "annotation" => Some(Self::Annotation),
            "node" => Some(Self::Node),
            "cxl_switch" => Some(Self::Switch),
            "resource_group" => Some(Self::Group),
            "rack" => Some(Self::Rack),
            "chassis" => Some(Self::Chassis),
            "not_detected_device" => Some(Self::NotDetected),
            other => ResourceType::from_label(other).map(Self::Resource),
        }
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}

/// Natural key of a vertex: its label plus its identity within that label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey {
    pub kind: VertexKind,
    pub id: String,
}

impl VertexKey {
    pub fn new(kind: VertexKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn resource(kind: ResourceType, device_id: impl Into<String>) -> Self {
        Self::new(VertexKind::Resource(kind), device_id)
    }

    /// Annotations are keyed by the resource they describe.
    pub fn annotation(kind: ResourceType, device_id: &str) -> Self {
        Self::new(VertexKind::Annotation, format!("{}/{}", kind.label(), device_id))
    }

    pub fn node(id: impl Into<String>) -> Self {
        Self::new(VertexKind::Node, id)
    }

    pub fn switch(id: impl Into<String>) -> Self {
        Self::new(VertexKind::Switch, id)
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::new(VertexKind::Group, id)
    }

    pub fn rack(id: impl Into<String>) -> Self {
        Self::new(VertexKind::Rack, id)
    }

    pub fn chassis(id: impl Into<String>) -> Self {
        Self::new(VertexKind::Chassis, id)
    }

    pub fn not_detected() -> Self {
        Self::new(VertexKind::NotDetected, NOT_DETECTED_ID)
    }
}

impl fmt::Display for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.table(), self.id)
    }
}

/// Edge labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeLabel {
    Compose,
    Connect,
    Include,
    Have,
    NotDetected,
    Mount,
}

impl EdgeLabel {
    pub const ALL: [EdgeLabel; 6] = [
        Self::Compose,
        Self::Connect,
        Self::Include,
        Self::Have,
        Self::NotDetected,
        Self::Mount,
    ];

    /// Relation table name in the store.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Compose => "compose",
            Self::Connect => "connect",
            Self::Include => "include",
            Self::Have => "have",
            Self::NotDetected => "not_detected",
            Self::Mount => "mount",
        }
    }
}

/// Traversal direction relative to the anchor vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

/// A vertex as read back from the store.
///
/// The placeholder vertex (no kind, no properties) stands in for "no child"
/// in listing rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vertex {
    pub kind: Option<VertexKind>,
    pub internal_id: String,
    pub properties: PropertyMap,
}

impl Vertex {
    pub fn new(kind: VertexKind, internal_id: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            kind: Some(kind),
            internal_id: internal_id.into(),
            properties,
        }
    }

    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.properties.is_empty()
    }

    /// String property accessor; `None` when absent or not a string.
    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_str)
    }

    /// The `id` property, when it is a non-empty string.
    pub fn identity(&self) -> Option<&str> {
        self.properties
            .get("id")
            .and_then(PropertyValue::as_non_empty_str)
    }
}

/// The per-child columns of a listing row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChildCells {
    /// Child vertex, or the placeholder.
    pub vertex: Vertex,
    /// Properties of the child's annotation (empty when absent).
    pub annotation: PropertyMap,
    pub resource_group_ids: Vec<String>,
    pub node_ids: Vec<String>,
    pub not_detected: bool,
}

impl ChildCells {
    pub fn placeholder() -> Self {
        Self::default()
    }
}

/// One flat row of a node, switch, group, or resource listing.
///
/// For flat resource listings the parent is the placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRow {
    pub parent: Vertex,
    pub child: ChildCells,
}

/// One flat row of a rack listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RackRow {
    pub rack: Vertex,
    /// Chassis vertex, or the placeholder for a rack without chassis.
    pub chassis: Vertex,
    pub child: ChildCells,
}
