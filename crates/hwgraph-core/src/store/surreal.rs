//! SurrealDB embedded backend.
//!
//! Every vertex record keeps its property set under a single `properties`
//! field, so discovery data never collides with record metadata. Vertex
//! labels map to tables, edge labels to `TYPE RELATION` tables.
//!
//! Writes are collected by [`SurrealTransaction`] and sent as one
//! `BEGIN TRANSACTION; ... COMMIT TRANSACTION;` block on commit. Reads run
//! immediately and do not observe the pending writes.
//!
//! Record ids and lookup values travel as bound parameters; only property
//! sets are inlined, as object literals.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::method::Query;
use surrealdb::Surreal;

use super::{GraphStore, GraphTransaction, ResourceRecord, StoreError};
use crate::graph::literal::to_literal;
use crate::graph::{
    Direction, EdgeLabel, PropertyMap, ResourceType, Vertex, VertexKey, VertexKind,
};

const VERTEX_FIELDS: &str = "<string> id AS internal_id, record::tb(id) AS table, properties";

/// Graph store backed by SurrealDB.
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Db>,
}

impl SurrealStore {
    /// Open or create a RocksDB-backed database at the given path.
    pub async fn open(path: &Path, namespace: &str, database: &str) -> Result<Self, StoreError> {
        let db = Surreal::new::<RocksDb>(path).await?;
        db.use_ns(namespace).use_db(database).await?;

        Ok(Self { db })
    }

    /// Open a database held entirely in memory.
    pub async fn in_memory(namespace: &str, database: &str) -> Result<Self, StoreError> {
        let db = Surreal::new::<Mem>(()).await?;
        db.use_ns(namespace).use_db(database).await?;

        Ok(Self { db })
    }

    /// Define vertex and relation tables. Safe to run repeatedly.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let mut schema = String::new();

        // Vertex tables
        let vertex_tables = ResourceType::ALL
            .iter()
            .map(|t| t.label())
            .chain(
                [
                    VertexKind::Annotation,
                    VertexKind::Node,
                    VertexKind::Switch,
                    VertexKind::Group,
                    VertexKind::Rack,
                    VertexKind::Chassis,
                    VertexKind::NotDetected,
                ]
                .iter()
                .map(|k| k.table()),
            );
        for table in vertex_tables {
            schema.push_str(&format!("DEFINE TABLE IF NOT EXISTS {} SCHEMALESS;\n", table));
        }

        // Natural key lookups on resources
        for t in ResourceType::ALL {
            schema.push_str(&format!(
                "DEFINE INDEX IF NOT EXISTS {label}_device_id ON {label} FIELDS properties.deviceID;\n",
                label = t.label()
            ));
        }

        // Edge tables
        for label in EdgeLabel::ALL {
            schema.push_str(&format!(
                "DEFINE TABLE IF NOT EXISTS {} TYPE RELATION;\n",
                label.table()
            ));
        }

        self.db.query(schema).await?.check()?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for SurrealStore {
    type Transaction = SurrealTransaction;

    async fn prepare(&self) -> Result<(), StoreError> {
        self.initialize_schema().await
    }

    async fn begin(&self) -> Result<SurrealTransaction, StoreError> {
        Ok(SurrealTransaction {
            db: self.db.clone(),
            statements: Vec::new(),
            params: Params::default(),
        })
    }
}

/// Buffered SurrealDB transaction.
pub struct SurrealTransaction {
    db: Surreal<Db>,
    statements: Vec<String>,
    /// Parameters of the buffered statements.
    params: Params,
}

impl SurrealTransaction {
    fn push(&mut self, statement: String) {
        self.statements.push(statement);
    }

    /// Run a read query whose rows land in statement `index`.
    async fn read<T>(&self, sql: String, params: Params, index: usize) -> Result<Vec<T>, StoreError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut response = params.apply(self.db.query(sql)).await?;
        let rows: Vec<T> = response.take(index)?;
        Ok(rows)
    }
}

/// Query parameters, named `$p0`, `$p1`, ... in order of use.
#[derive(Debug, Default)]
struct Params {
    values: Vec<(String, String)>,
}

impl Params {
    /// Bind `value` and return its placeholder.
    fn bind(&mut self, value: &str) -> String {
        let name = format!("p{}", self.values.len());
        let placeholder = format!("${}", name);
        self.values.push((name, value.to_string()));
        placeholder
    }

    /// `type::thing($table, $id)` for a natural key.
    fn thing(&mut self, key: &VertexKey) -> String {
        let table = self.bind(key.kind.table());
        let id = self.bind(&key.id);
        format!("type::thing({}, {})", table, id)
    }

    fn apply(self, mut query: Query<'_, Db>) -> Query<'_, Db> {
        for binding in self.values {
            query = query.bind(binding);
        }
        query
    }
}

fn resource_tables() -> String {
    ResourceType::ALL
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Deserialize)]
struct VertexRow {
    internal_id: String,
    table: String,
    #[serde(default)]
    properties: Option<PropertyMap>,
}

impl VertexRow {
    fn into_vertex(self) -> Option<Vertex> {
        let kind = VertexKind::from_table(&self.table)?;
        let properties = self.properties?;
        Some(Vertex::new(kind, self.internal_id, properties))
    }
}

#[derive(Debug, Deserialize)]
struct ResourceRow {
    internal_id: String,
    table: String,
    #[serde(default)]
    properties: Option<PropertyMap>,
    #[serde(default)]
    annotations: Option<Vec<Option<PropertyMap>>>,
    #[serde(default)]
    group_ids: Option<Vec<Option<String>>>,
    #[serde(default)]
    node_ids: Option<Vec<Option<String>>>,
    #[serde(default)]
    not_detected: Option<bool>,
}

impl ResourceRow {
    fn into_record(self) -> Result<ResourceRecord, StoreError> {
        let kind = match VertexKind::from_table(&self.table) {
            Some(kind @ VertexKind::Resource(_)) => kind,
            _ => {
                return Err(StoreError::MalformedRow(format!(
                    "{} is not a resource table",
                    self.table
                )))
            }
        };

        let flatten = |ids: Option<Vec<Option<String>>>| -> Vec<String> {
            ids.unwrap_or_default().into_iter().flatten().collect()
        };

        Ok(ResourceRecord {
            vertex: Vertex::new(kind, self.internal_id, self.properties.unwrap_or_default()),
            annotation: self
                .annotations
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .next()
                .unwrap_or_default(),
            group_ids: flatten(self.group_ids),
            node_ids: flatten(self.node_ids),
            not_detected: self.not_detected.unwrap_or(false),
        })
    }
}

#[async_trait]
impl GraphTransaction for SurrealTransaction {
    async fn merge_vertex(&mut self, key: &VertexKey, properties: &PropertyMap) -> Result<(), StoreError> {
        let literal = to_literal(properties)?;
        let target = self.params.thing(key);
        self.push(format!("LET $v = {}; UPSERT $v SET properties = {};", target, literal));
        Ok(())
    }

    async fn find_vertex(&mut self, key: &VertexKey) -> Result<Option<Vertex>, StoreError> {
        let mut params = Params::default();
        let sql = format!("LET $v = {}; SELECT {} FROM $v;", params.thing(key), VERTEX_FIELDS);
        let rows: Vec<VertexRow> = self.read(sql, params, 1).await?;
        Ok(rows.into_iter().find_map(VertexRow::into_vertex))
    }

    async fn list_vertices(&mut self, kind: VertexKind) -> Result<Vec<Vertex>, StoreError> {
        let sql = format!("SELECT {} FROM {};", VERTEX_FIELDS, kind.table());
        let rows: Vec<VertexRow> = self.read(sql, Params::default(), 0).await?;
        Ok(rows.into_iter().filter_map(VertexRow::into_vertex).collect())
    }

    async fn delete_vertex(&mut self, key: &VertexKey) -> Result<(), StoreError> {
        let mut statement = format!("LET $v = {};", self.params.thing(key));
        for label in EdgeLabel::ALL {
            statement.push_str(&format!(" DELETE {} WHERE in = $v OR out = $v;", label.table()));
        }
        statement.push_str(" DELETE $v;");
        self.push(statement);
        Ok(())
    }

    async fn create_edge(&mut self, from: &VertexKey, label: EdgeLabel, to: &VertexKey) -> Result<(), StoreError> {
        let from = self.params.thing(from);
        let to = self.params.thing(to);
        self.push(format!(
            "LET $from = {}; LET $to = {}; RELATE $from->{}->$to;",
            from,
            to,
            label.table()
        ));
        Ok(())
    }

    async fn delete_edges(&mut self, from: &VertexKey, label: EdgeLabel) -> Result<(), StoreError> {
        let from = self.params.thing(from);
        self.push(format!("DELETE {} WHERE in = {};", label.table(), from));
        Ok(())
    }

    async fn delete_edges_to(&mut self, to: &VertexKey, label: EdgeLabel) -> Result<(), StoreError> {
        let to = self.params.thing(to);
        self.push(format!("DELETE {} WHERE out = {};", label.table(), to));
        Ok(())
    }

    async fn neighbors(
        &mut self,
        key: &VertexKey,
        label: EdgeLabel,
        direction: Direction,
    ) -> Result<Vec<Vertex>, StoreError> {
        let (near, far) = match direction {
            Direction::Out => ("in", "out"),
            Direction::In => ("out", "in"),
        };
        let mut params = Params::default();
        let sql = format!(
            "SELECT <string> {far} AS internal_id, record::tb({far}) AS table, {far}.properties AS properties \
             FROM {edge} WHERE {near} = {anchor};",
            far = far,
            near = near,
            edge = label.table(),
            anchor = params.thing(key),
        );
        let rows: Vec<VertexRow> = self.read(sql, params, 0).await?;
        Ok(rows.into_iter().filter_map(VertexRow::into_vertex).collect())
    }

    async fn resource_records(&mut self, device_id: Option<&str>) -> Result<Vec<ResourceRecord>, StoreError> {
        let mut params = Params::default();
        let filter = device_id
            .map(|id| format!(" WHERE properties.deviceID = {}", params.bind(id)))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {fields}, \
                ->have->annotation.properties AS annotations, \
                <-include<-resource_group.properties.id AS group_ids, \
                <-compose<-node.properties.id AS node_ids, \
                array::len(->not_detected) > 0 AS not_detected \
             FROM {tables}{filter};",
            fields = VERTEX_FIELDS,
            tables = resource_tables(),
            filter = filter,
        );
        let rows: Vec<ResourceRow> = self.read(sql, params, 0).await?;
        rows.into_iter().map(ResourceRow::into_record).collect()
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.statements.is_empty() {
            return Ok(());
        }

        tracing::debug!(statements = self.statements.len(), "Committing transaction");
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for statement in &self.statements {
            sql.push_str(statement);
            sql.push('\n');
        }
        sql.push_str("COMMIT TRANSACTION;");

        self.params.apply(self.db.query(sql)).await?.check()?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        if !self.statements.is_empty() {
            tracing::debug!(statements = self.statements.len(), "Discarding pending statements");
        }
        Ok(())
    }
}
