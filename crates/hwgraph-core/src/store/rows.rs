//! Listing query shapes.
//!
//! Each function returns flat, denormalized rows: one per (parent, child)
//! pair, plus a placeholder-child row for every parent without children.
//! Row order is whatever the backend produced; the composer sorts.

use std::collections::HashMap;

use super::{GraphTransaction, ResourceRecord, StoreError};
use crate::graph::{
    ChildCells, Direction, EdgeLabel, GraphRow, RackRow, Vertex, VertexKey, VertexKind,
};

/// Child cells for a resource record. Id lists are sorted for stable output.
pub fn cells(record: &ResourceRecord) -> ChildCells {
    let mut resource_group_ids = record.group_ids.clone();
    resource_group_ids.sort();
    resource_group_ids.dedup();
    let mut node_ids = record.node_ids.clone();
    node_ids.sort();
    node_ids.dedup();

    ChildCells {
        vertex: record.vertex.clone(),
        annotation: record.annotation.clone(),
        resource_group_ids,
        node_ids,
        not_detected: record.not_detected,
    }
}

async fn records_by_internal_id<T: GraphTransaction>(
    tx: &mut T,
) -> Result<HashMap<String, ResourceRecord>, StoreError> {
    Ok(tx
        .resource_records(None)
        .await?
        .into_iter()
        .map(|r| (r.vertex.internal_id.clone(), r))
        .collect())
}

fn resource_cells(vertex: Vertex, records: &HashMap<String, ResourceRecord>) -> ChildCells {
    match records.get(&vertex.internal_id) {
        Some(record) => cells(record),
        None => ChildCells {
            vertex,
            ..ChildCells::default()
        },
    }
}

/// Rows of a flat resource listing (placeholder parent).
pub async fn resource_rows<T: GraphTransaction>(
    tx: &mut T,
    device_id: Option<&str>,
) -> Result<Vec<GraphRow>, StoreError> {
    Ok(tx
        .resource_records(device_id)
        .await?
        .iter()
        .map(|record| GraphRow {
            parent: Vertex::placeholder(),
            child: cells(record),
        })
        .collect())
}

/// Rows of a parent → resource listing over `label` edges.
///
/// Covers nodes (`Compose`), switches (`Connect`) and groups (`Include`).
/// With `with_children == false` every parent yields only its placeholder
/// row.
pub async fn member_rows<T: GraphTransaction>(
    tx: &mut T,
    parent_kind: VertexKind,
    label: EdgeLabel,
    parent_id: Option<&str>,
    with_children: bool,
) -> Result<Vec<GraphRow>, StoreError> {
    let parents = match parent_id {
        Some(id) => tx
            .find_vertex(&VertexKey::new(parent_kind, id))
            .await?
            .into_iter()
            .collect(),
        None => tx.list_vertices(parent_kind).await?,
    };
    if parents.is_empty() {
        return Ok(Vec::new());
    }

    let records = if with_children {
        records_by_internal_id(tx).await?
    } else {
        HashMap::new()
    };

    let mut rows = Vec::new();
    for parent in parents {
        let children = match (with_children, parent.identity()) {
            (true, Some(id)) => {
                tx.neighbors(&VertexKey::new(parent_kind, id), label, Direction::Out)
                    .await?
            }
            _ => Vec::new(),
        };

        let mut resource_children = children
            .into_iter()
            .filter(|v| v.kind.map(|k| k.is_resource()).unwrap_or(false))
            .peekable();

        if resource_children.peek().is_none() {
            rows.push(GraphRow {
                parent,
                child: ChildCells::placeholder(),
            });
            continue;
        }

        for child in resource_children {
            rows.push(GraphRow {
                parent: parent.clone(),
                child: resource_cells(child, &records),
            });
        }
    }

    Ok(rows)
}

/// Rows of one rack: rack × chassis × mounted resource or switch.
pub async fn rack_rows<T: GraphTransaction>(
    tx: &mut T,
    rack_id: &str,
) -> Result<Vec<RackRow>, StoreError> {
    let rack_key = VertexKey::rack(rack_id);
    let Some(rack) = tx.find_vertex(&rack_key).await? else {
        return Ok(Vec::new());
    };

    let chassis_list = tx.neighbors(&rack_key, EdgeLabel::Mount, Direction::Out).await?;
    if chassis_list.is_empty() {
        return Ok(vec![RackRow {
            rack,
            chassis: Vertex::placeholder(),
            child: ChildCells::placeholder(),
        }]);
    }

    let records = records_by_internal_id(tx).await?;
    let mut rows = Vec::new();

    for chassis in chassis_list {
        let mounted = match chassis.identity() {
            Some(id) => {
                tx.neighbors(&VertexKey::chassis(id), EdgeLabel::Mount, Direction::Out)
                    .await?
            }
            None => Vec::new(),
        };

        let children: Vec<ChildCells> = mounted
            .into_iter()
            .filter_map(|v| match v.kind {
                Some(VertexKind::Resource(_)) => Some(resource_cells(v, &records)),
                Some(VertexKind::Switch) => Some(ChildCells {
                    vertex: v,
                    ..ChildCells::default()
                }),
                _ => None,
            })
            .collect();

        if children.is_empty() {
            rows.push(RackRow {
                rack: rack.clone(),
                chassis,
                child: ChildCells::placeholder(),
            });
            continue;
        }

        for child in children {
            rows.push(RackRow {
                rack: rack.clone(),
                chassis: chassis.clone(),
                child,
            });
        }
    }

    Ok(rows)
}
