pub mod backend;
pub mod config;
pub mod error;
pub mod schema;
pub mod statements;
pub mod values;

use crate::backend::{ScyllaBackend, StoreBackend};
use crate::config::SteleConfig;
use crate::error::SteleError;
use crate::schema::mapper::{table_declaration, TypeResolver};
use crate::schema::registry::{SchemaRegistry, TableLayout};
use crate::schema::types::TableDef;
use crate::statements::{CachedStatement, StatementCache, StatementKey, StatementKind};
use crate::values::{flatten_value, Record, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// The shared gateway handle: one per application, constructed explicitly
/// and passed by reference to every caller.
///
/// Owns the registration memory (which composite types and tables have been
/// declared to the store) and the prepared-statement cache. All state is
/// internally synchronized; `&SteleClient` can be used from any number of
/// tasks concurrently.
pub struct SteleClient {
    backend: Arc<dyn StoreBackend>,
    config: SteleConfig,
    keyspace: Mutex<Option<String>>,
    registry: SchemaRegistry,
    statements: StatementCache,
    /// Serializes schema registration so a first-time table or type is
    /// declared to the store exactly once.
    ddl_guard: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for SteleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteleClient")
            .field("config", &self.config)
            .field("keyspace", &self.keyspace)
            .finish_non_exhaustive()
    }
}

impl SteleClient {
    /// Builds a client without touching the store. No operation works until
    /// [`init_keyspace`](Self::init_keyspace) has run.
    pub fn new(config: SteleConfig, backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            config,
            keyspace: Mutex::new(None),
            registry: SchemaRegistry::default(),
            statements: StatementCache::default(),
            ddl_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Builds a client and initializes the configured keyspace.
    pub async fn connect(
        config: SteleConfig,
        backend: Arc<dyn StoreBackend>,
    ) -> Result<Self, SteleError> {
        let client = Self::new(config, backend);
        let name = client.config.keyspace.clone();
        client.init_keyspace(&name, "", "").await?;
        Ok(client)
    }

    /// Connects to the store described by `config` over the Scylla driver
    /// and initializes the configured keyspace.
    pub async fn connect_scylla(config: SteleConfig) -> Result<Self, SteleError> {
        let backend = Arc::new(ScyllaBackend::connect(&config).await?);
        Self::connect(config, backend).await
    }

    pub fn config(&self) -> &SteleConfig {
        &self.config
    }

    /// Creates the keyspace if it does not exist and makes it the session's
    /// current keyspace. The composed `{prefix}{name}{suffix}` is validated
    /// before any statement is issued.
    pub async fn init_keyspace(
        &self,
        name: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<String, SteleError> {
        let keyspace = verify_keyspace_name(&format!("{prefix}{name}{suffix}"))?;
        let ddl = format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
             {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
            keyspace, self.config.replication_factor
        );
        debug!(statement = %ddl, "creating keyspace");
        self.backend.execute_ddl(&ddl).await?;
        self.backend.use_keyspace(&keyspace).await?;
        *self.keyspace.lock() = Some(keyspace.clone());
        info!(keyspace = %keyspace, "keyspace ready");
        Ok(keyspace)
    }

    /// Declares a table to the store, creating any composite types it
    /// references first (inner types before the types that use them).
    /// Returns `true` if the table was already registered, in which case
    /// nothing is issued; the shape is not re-validated against an earlier
    /// declaration.
    pub async fn init_table(&self, table: &TableDef) -> Result<bool, SteleError> {
        let keyspace = self.current_keyspace()?;
        if self.registry.is_table_registered(&table.name) {
            return Ok(true);
        }

        let _guard = self.ddl_guard.lock().await;
        if self.registry.is_table_registered(&table.name) {
            return Ok(true);
        }

        // Compile first: a cyclic or unresolvable declaration must fail
        // before any statement reaches the store.
        let registered_udts = self.registry.udts_for(&keyspace);
        let mut resolver = TypeResolver::new(&registered_udts);
        let table_ddl = table_declaration(table, &mut resolver)?;

        for pending in resolver.into_pending() {
            debug!(statement = %pending.ddl, "creating composite type");
            self.backend.execute_ddl(&pending.ddl).await?;
            self.registry.mark_udt(&keyspace, &pending.name);
        }

        debug!(statement = %table_ddl, "creating table");
        self.backend.execute_ddl(&table_ddl).await?;
        self.registry.mark_table(&table.name, TableLayout::from_table(table));
        Ok(false)
    }

    /// Fetches the single row with the given id, or `None` when absent.
    pub async fn fetch(&self, table: &str, id: Uuid) -> Result<Option<Record>, SteleError> {
        self.current_keyspace()?;
        self.require_table(table)?;

        let statement = self
            .statements
            .get_or_prepare(
                StatementKey {
                    table: table.to_string(),
                    kind: StatementKind::SelectById,
                },
                || {
                    let backend = Arc::clone(&self.backend);
                    let cql = format!("SELECT * FROM {table} WHERE id = ?");
                    async move {
                        let prepared = backend.prepare(&cql).await?;
                        Ok(CachedStatement {
                            id: prepared,
                            cql,
                            set_columns: Vec::new(),
                        })
                    }
                },
            )
            .await?;

        let mut rows = self
            .backend
            .execute(statement.id, vec![Value::Uuid(id)])
            .await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.remove(0)))
        }
    }

    /// Inserts the whole record as one self-describing JSON document. There
    /// is no partial-insert variant; use [`update`](Self::update) for that.
    pub async fn insert(&self, table: &str, record: &Record) -> Result<(), SteleError> {
        self.current_keyspace()?;
        self.require_table(table)?;

        let payload = serde_json::to_string(record)
            .map_err(|err| SteleError::Schema(format!("cannot serialize record: {err}")))?;

        let statement = self
            .statements
            .get_or_prepare(
                StatementKey {
                    table: table.to_string(),
                    kind: StatementKind::InsertJson,
                },
                || {
                    let backend = Arc::clone(&self.backend);
                    let cql = format!("INSERT INTO {table} JSON ?");
                    async move {
                        let prepared = backend.prepare(&cql).await?;
                        Ok(CachedStatement {
                            id: prepared,
                            cql,
                            set_columns: Vec::new(),
                        })
                    }
                },
            )
            .await?;

        self.backend
            .execute(statement.id, vec![Value::Text(payload)])
            .await?;
        Ok(())
    }

    /// Applies a partial update. Every primary-key field of the table must
    /// be present in `record`; key fields become the WHERE predicate (in the
    /// recorded partition-then-clustering declaration order, coerced through
    /// their declared types) and the remaining fields become the SET clause.
    /// Nested composite values are flattened into positional literals.
    pub async fn update(&self, table: &str, record: Record) -> Result<(), SteleError> {
        self.current_keyspace()?;
        let layout = self
            .registry
            .table_layout(table)
            .ok_or_else(|| SteleError::Schema(format!("table \"{table}\" is not initialized")))?;

        let mut record = record;
        let mut key_params = Vec::with_capacity(layout.partition.len() + layout.clustering.len());
        for key_column in layout.key_columns() {
            debug!(table, field = %key_column.name, "ejecting primary-key field from update set");
            let value = record.remove(&key_column.name).ok_or_else(|| {
                SteleError::Schema(format!(
                    "missing key from update set: {}",
                    key_column.name
                ))
            })?;
            key_params.push(value.coerce(key_column.ty)?);
        }

        if record.is_empty() {
            return Err(SteleError::Schema(format!(
                "update of table \"{table}\" has no settable fields"
            )));
        }

        let set_fields = record.field_names();
        let statement = self
            .statements
            .get_or_prepare(
                StatementKey {
                    table: table.to_string(),
                    kind: StatementKind::update(set_fields.clone()),
                },
                || {
                    let backend = Arc::clone(&self.backend);
                    let assignments: Vec<String> = set_fields
                        .iter()
                        .map(|name| format!("\"{name}\" = ?"))
                        .collect();
                    let predicates: Vec<String> = layout
                        .key_columns()
                        .map(|column| format!("{} = ?", column.name))
                        .collect();
                    let cql = format!(
                        "UPDATE {table} SET {} WHERE {}",
                        assignments.join(", "),
                        predicates.join(" AND ")
                    );
                    async move {
                        let prepared = backend.prepare(&cql).await?;
                        Ok(CachedStatement {
                            id: prepared,
                            cql,
                            set_columns: set_fields,
                        })
                    }
                },
            )
            .await?;

        // Bind in the statement's recorded SET order, not the caller's
        // field order.
        let mut params = Vec::with_capacity(statement.set_columns.len() + key_params.len());
        for column in &statement.set_columns {
            let value = record.remove(column).ok_or_else(|| {
                SteleError::Schema(format!(
                    "update set is missing field \"{column}\" bound by the prepared statement"
                ))
            })?;
            params.push(flatten_value(value));
        }
        params.extend(key_params);

        self.backend.execute(statement.id, params).await?;
        Ok(())
    }

    /// Closes the store session. The handle is unusable afterwards.
    pub async fn shutdown(&self) -> Result<(), SteleError> {
        info!("shutting down the store session");
        self.backend.close().await
    }

    fn current_keyspace(&self) -> Result<String, SteleError> {
        self.keyspace
            .lock()
            .clone()
            .ok_or(SteleError::UninitializedKeyspace)
    }

    fn require_table(&self, table: &str) -> Result<(), SteleError> {
        if self.registry.is_table_registered(table) {
            Ok(())
        } else {
            Err(SteleError::Schema(format!(
                "table \"{table}\" is not initialized"
            )))
        }
    }
}

fn verify_keyspace_name(name: &str) -> Result<String, SteleError> {
    if name.is_empty() {
        return Err(SteleError::InvalidName {
            name: name.to_string(),
            reason: "empty name".to_string(),
        });
    }
    if let Some(pos) = name.find('.') {
        return Err(SteleError::InvalidName {
            name: name.to_string(),
            reason: format!("'.' at position {pos}"),
        });
    }
    Ok(name.to_string())
}
