//! Filter predicates over composed records.

use tracing::warn;

use crate::compose::Resource;
use crate::graph::{lookup, PropertyValue};

/// A pure yes/no decision over a composed record.
pub trait Predicate<T>: Send + Sync {
    fn test(&self, record: &T) -> bool;
}

impl<T, F> Predicate<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn test(&self, record: &T) -> bool {
        self(record)
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl<T> Predicate<T> for NoFilter {
    fn test(&self, _record: &T) -> bool {
        true
    }
}

/// Accepts detected, enabled, healthy resources marked available, optionally
/// restricted to members of any of `group_ids`.
#[derive(Debug, Clone, Default)]
pub struct AvailableFilter {
    pub group_ids: Vec<String>,
}

impl AvailableFilter {
    pub fn new(group_ids: Vec<String>) -> Self {
        Self { group_ids }
    }
}

impl Predicate<Resource> for AvailableFilter {
    fn test(&self, resource: &Resource) -> bool {
        available(resource, &self.group_ids)
    }
}

/// [`AvailableFilter`] plus: not linked into any node.
#[derive(Debug, Clone, Default)]
pub struct UnusedFilter {
    pub group_ids: Vec<String>,
}

impl UnusedFilter {
    pub fn new(group_ids: Vec<String>) -> Self {
        Self { group_ids }
    }
}

impl Predicate<Resource> for UnusedFilter {
    fn test(&self, resource: &Resource) -> bool {
        available(resource, &self.group_ids) && links_empty(resource)
    }
}

fn available(resource: &Resource, group_ids: &[String]) -> bool {
    if !resource.detected {
        return false;
    }

    let state = lookup(&resource.device, &["status", "state"]).and_then(PropertyValue::as_str);
    let health = lookup(&resource.device, &["status", "health"]).and_then(PropertyValue::as_str);
    let (Some(state), Some(health)) = (state, health) else {
        warn!(
            device_id = resource.device_id().unwrap_or(""),
            "Resource has no status.state/status.health, treating as unavailable"
        );
        return false;
    };

    if state != "Enabled" || health != "OK" || !resource.annotation.available {
        return false;
    }

    group_ids.is_empty()
        || resource
            .resource_group_ids
            .iter()
            .any(|id| group_ids.contains(id))
}

fn links_empty(resource: &Resource) -> bool {
    match resource.device.get("links") {
        None | Some(PropertyValue::Null) => true,
        Some(PropertyValue::List(items)) => items.is_empty(),
        Some(other) => {
            warn!(
                device_id = resource.device_id().unwrap_or(""),
                kind = other.kind_name(),
                "Resource links is not a list, treating as used"
            );
            false
        }
    }
}
