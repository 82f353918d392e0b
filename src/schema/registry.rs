use crate::schema::types::{FieldType, KeyRole, ScalarType, TableDef};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// One primary-key column with the scalar type key predicates are coerced
/// through. Key fields are validated to be scalar before a layout is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub ty: ScalarType,
}

/// The primary-key shape recorded when a table is registered: partition
/// columns then clustering columns, both in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub partition: Vec<KeyColumn>,
    pub clustering: Vec<KeyColumn>,
}

impl TableLayout {
    pub fn from_table(def: &TableDef) -> Self {
        let mut partition = Vec::new();
        let mut clustering = Vec::new();
        for field in &def.fields {
            let FieldType::Scalar(scalar) = &field.ty else {
                continue;
            };
            let column = KeyColumn {
                name: field.name.clone(),
                ty: *scalar,
            };
            match field.key {
                KeyRole::Partition => partition.push(column),
                KeyRole::Clustering => clustering.push(column),
                KeyRole::None => {}
            }
        }
        Self {
            partition,
            clustering,
        }
    }

    /// Partition columns followed by clustering columns, the order every
    /// generated WHERE clause and parameter list uses.
    pub fn key_columns(&self) -> impl Iterator<Item = &KeyColumn> {
        self.partition.iter().chain(self.clustering.iter())
    }

    /// Renders the PRIMARY KEY clause body: a single partition column bare,
    /// several parenthesized, clustering columns appended after a comma.
    pub fn key_clause(&self) -> String {
        let partition = if self.partition.len() == 1 {
            self.partition[0].name.clone()
        } else {
            let names: Vec<&str> = self.partition.iter().map(|c| c.name.as_str()).collect();
            format!("({})", names.join(", "))
        };
        if self.clustering.is_empty() {
            return partition;
        }
        let clustering: Vec<&str> = self.clustering.iter().map(|c| c.name.as_str()).collect();
        format!("{}, {}", partition, clustering.join(", "))
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Composite type names declared to the store, per keyspace.
    udts: HashMap<String, HashSet<String>>,
    /// Tables declared through this client, with their recorded key layouts.
    tables: HashMap<String, TableLayout>,
}

/// Registration memory shared by every caller of one client. Membership is
/// monotonic: names are only ever added, re-adding is a no-op.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    state: Mutex<RegistryState>,
}

impl SchemaRegistry {
    /// Snapshot of the composite types already registered for `keyspace`.
    pub fn udts_for(&self, keyspace: &str) -> HashSet<String> {
        self.state
            .lock()
            .udts
            .get(keyspace)
            .cloned()
            .unwrap_or_default()
    }

    pub fn mark_udt(&self, keyspace: &str, name: &str) {
        self.state
            .lock()
            .udts
            .entry(keyspace.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn is_table_registered(&self, table: &str) -> bool {
        self.state.lock().tables.contains_key(table)
    }

    pub fn table_layout(&self, table: &str) -> Option<TableLayout> {
        self.state.lock().tables.get(table).cloned()
    }

    pub fn mark_table(&self, table: &str, layout: TableLayout) {
        self.state
            .lock()
            .tables
            .entry(table.to_string())
            .or_insert(layout);
    }
}
