//! Hardware categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of hardware categories a resource may belong to.
///
/// Each category is stored under its own vertex label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Cpu,
    Accelerator,
    Dsp,
    Fpga,
    Gpu,
    UnknownProcessor,
    Memory,
    Storage,
    NetworkInterface,
    GraphicController,
    VirtualMedia,
}

impl ResourceType {
    pub const ALL: [ResourceType; 11] = [
        Self::Cpu,
        Self::Accelerator,
        Self::Dsp,
        Self::Fpga,
        Self::Gpu,
        Self::UnknownProcessor,
        Self::Memory,
        Self::Storage,
        Self::NetworkInterface,
        Self::GraphicController,
        Self::VirtualMedia,
    ];

    /// The `type` value discovery sources report for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Accelerator => "Accelerator",
            Self::Dsp => "DSP",
            Self::Fpga => "FPGA",
            Self::Gpu => "GPU",
            Self::UnknownProcessor => "UnknownProcessor",
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::NetworkInterface => "networkInterface",
            Self::GraphicController => "graphicController",
            Self::VirtualMedia => "virtualMedia",
        }
    }

    /// The vertex label (SurrealDB table) resources of this category live in.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Accelerator => "accelerator",
            Self::Dsp => "dsp",
            Self::Fpga => "fpga",
            Self::Gpu => "gpu",
            Self::UnknownProcessor => "unknown_processor",
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::NetworkInterface => "network_interface",
            Self::GraphicController => "graphic_controller",
            Self::VirtualMedia => "virtual_media",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a `type` outside the known categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resource type: {0}")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    /// Case-insensitive; `"Memory"`, `"memory"` and `"MEMORY"` are the same.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownResourceType(s.to_string()))
    }
}
