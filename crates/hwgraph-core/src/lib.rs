pub mod compose;
pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
pub mod inventory;
pub mod layout;
pub mod reconcile;
pub mod store;

pub use compose::{Chassis, CxlSwitch, Detail, Node, Rack, Resource, ResourceGroup};
pub use config::{Config, ConfigError, DefaultGroup, InventorySettings};
pub use error::InventoryError;
pub use filter::{AvailableFilter, NoFilter, Predicate, UnusedFilter};
pub use graph::{PropertyMap, PropertyValue, ResourceType};
pub use inventory::{Inventory, Registration};
pub use layout::{ChassisLayout, RackLayout};
pub use store::{GraphStore, GraphTransaction, MemoryStore, StoreError, SurrealStore};
