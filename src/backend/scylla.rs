use crate::backend::{PreparedId, StoreBackend};
use crate::config::SteleConfig;
use crate::error::SteleError;
use crate::values::{Record, Value};
use async_trait::async_trait;
use parking_lot::Mutex;
use scylla::frame::response::result::CqlValue;
use scylla::frame::value::CqlTimestamp;
use scylla::prepared_statement::PreparedStatement;
use scylla::query::Query;
use scylla::statement::Consistency;
use scylla::{Session, SessionBuilder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// [`StoreBackend`] over a live Scylla/Cassandra session.
///
/// One session is shared by all callers; every statement runs at quorum
/// consistency. Prepared statements are owned here and handed out as
/// opaque ids.
pub struct ScyllaBackend {
    session: Session,
    prepared: Mutex<HashMap<u64, PreparedStatement>>,
    next_id: AtomicU64,
}

impl ScyllaBackend {
    pub async fn connect(config: &SteleConfig) -> Result<Self, SteleError> {
        let mut builder = SessionBuilder::new();
        for node in &config.contact_points {
            builder = builder.known_node(node);
        }
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.user(user, pass);
        }
        let session = builder.build().await.map_err(SteleError::backend)?;
        Ok(Self {
            session,
            prepared: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl StoreBackend for ScyllaBackend {
    async fn execute_ddl(&self, cql: &str) -> Result<(), SteleError> {
        let mut query = Query::new(cql);
        query.set_consistency(Consistency::Quorum);
        debug!(statement = cql, "executing schema statement");
        self.session
            .query_unpaged(query, ())
            .await
            .map_err(SteleError::backend)?;
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), SteleError> {
        self.session
            .use_keyspace(keyspace, false)
            .await
            .map_err(SteleError::backend)
    }

    async fn prepare(&self, cql: &str) -> Result<PreparedId, SteleError> {
        debug!(statement = cql, "preparing statement");
        let mut prepared = self
            .session
            .prepare(cql)
            .await
            .map_err(SteleError::backend)?;
        prepared.set_consistency(Consistency::Quorum);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.prepared.lock().insert(id, prepared);
        Ok(PreparedId(id))
    }

    async fn execute(
        &self,
        statement: PreparedId,
        params: Vec<Value>,
    ) -> Result<Vec<Record>, SteleError> {
        let prepared = self
            .prepared
            .lock()
            .get(&statement.0)
            .cloned()
            .ok_or_else(|| {
                SteleError::Schema(format!("unknown prepared statement id {}", statement.0))
            })?;

        let mut bound = Vec::with_capacity(params.len());
        for param in params {
            bound.push(to_cql(param)?);
        }

        let result = self
            .session
            .execute_unpaged(&prepared, &bound[..])
            .await
            .map_err(SteleError::backend)?;

        let specs = result.col_specs().to_owned();
        let rows = result.rows_or_empty();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = Record::new();
            for (idx, spec) in specs.iter().enumerate() {
                let value = row
                    .columns
                    .get(idx)
                    .and_then(|col| col.as_ref())
                    .map(from_cql)
                    .unwrap_or(Value::Null);
                record.insert(spec.name.clone(), value);
            }
            records.push(record);
        }
        Ok(records)
    }

    async fn close(&self) -> Result<(), SteleError> {
        // The driver tears the session down on drop; nothing to flush.
        Ok(())
    }
}

fn to_cql(value: Value) -> Result<CqlValue, SteleError> {
    Ok(match value {
        Value::Int(v) => CqlValue::Int(i32::try_from(v).map_err(|_| {
            SteleError::Schema(format!("integer {v} is out of range for an int column"))
        })?),
        Value::Float(v) => CqlValue::Float(v as f32),
        Value::Text(v) => CqlValue::Text(v),
        Value::Uuid(v) => CqlValue::Uuid(v),
        Value::Boolean(v) => CqlValue::Boolean(v),
        Value::Timestamp(v) => CqlValue::Timestamp(CqlTimestamp(v)),
        Value::List(items) => CqlValue::List(
            items
                .into_iter()
                .map(to_cql)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        // Flattened composite literals bind positionally, as tuples.
        Value::Tuple(items) => CqlValue::Tuple(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Null => Ok(None),
                    other => to_cql(other).map(Some),
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Record(record) => CqlValue::Tuple(
            record
                .into_fields()
                .into_iter()
                .map(|(_, field)| match field {
                    Value::Null => Ok(None),
                    other => to_cql(other).map(Some),
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Null => CqlValue::Empty,
    })
}

fn from_cql(value: &CqlValue) -> Value {
    match value {
        CqlValue::Boolean(v) => Value::Boolean(*v),
        CqlValue::Int(v) => Value::Int(i64::from(*v)),
        CqlValue::BigInt(v) => Value::Int(*v),
        CqlValue::Float(v) => Value::Float(f64::from(*v)),
        CqlValue::Double(v) => Value::Float(*v),
        CqlValue::Ascii(v) | CqlValue::Text(v) => Value::Text(v.clone()),
        CqlValue::Uuid(v) => Value::Uuid(*v),
        CqlValue::Timeuuid(v) => Value::Text(v.to_string()),
        CqlValue::Timestamp(v) => Value::Timestamp(v.0),
        CqlValue::List(items) | CqlValue::Set(items) => {
            Value::List(items.iter().map(from_cql).collect())
        }
        CqlValue::Tuple(items) => Value::Tuple(
            items
                .iter()
                .map(|item| item.as_ref().map(from_cql).unwrap_or(Value::Null))
                .collect(),
        ),
        CqlValue::UserDefinedType { fields, .. } => Value::Record(
            fields
                .iter()
                .map(|(name, value)| {
                    (
                        name.clone(),
                        value.as_ref().map(from_cql).unwrap_or(Value::Null),
                    )
                })
                .collect(),
        ),
        CqlValue::Map(entries) => Value::Record(
            entries
                .iter()
                .map(|(key, value)| (map_key_to_string(key), from_cql(value)))
                .collect(),
        ),
        CqlValue::Empty => Value::Null,
        other => Value::Text(format!("{other:?}")),
    }
}

fn map_key_to_string(key: &CqlValue) -> String {
    match key {
        CqlValue::Ascii(s) | CqlValue::Text(s) => s.clone(),
        CqlValue::Uuid(u) => u.to_string(),
        CqlValue::Int(i) => i.to_string(),
        CqlValue::BigInt(i) => i.to_string(),
        other => format!("{other:?}"),
    }
}
