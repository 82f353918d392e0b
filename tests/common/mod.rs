#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use stele::backend::{PreparedId, StoreBackend};
use stele::error::SteleError;
use stele::values::{Record, Value};

/// Test double for the store: records every statement it is handed and
/// serves canned rows keyed by the prepared statement's text.
#[derive(Default)]
pub struct RecordingBackend {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    ddl: Vec<String>,
    prepared: HashMap<u64, String>,
    next_id: u64,
    executions: Vec<(String, Vec<Value>)>,
    rows: HashMap<String, Vec<Record>>,
    keyspace: Option<String>,
    closed: bool,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ddl(&self) -> Vec<String> {
        self.state.lock().ddl.clone()
    }

    pub fn prepared_statements(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut cqls: Vec<(u64, String)> = state
            .prepared
            .iter()
            .map(|(id, cql)| (*id, cql.clone()))
            .collect();
        cqls.sort_by_key(|(id, _)| *id);
        cqls.into_iter().map(|(_, cql)| cql).collect()
    }

    pub fn prepare_count(&self) -> usize {
        self.state.lock().prepared.len()
    }

    pub fn executions(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().executions.clone()
    }

    /// Rows to return whenever the statement with this exact text executes.
    pub fn serve(&self, cql: &str, rows: Vec<Record>) {
        self.state.lock().rows.insert(cql.to_string(), rows);
    }

    pub fn used_keyspace(&self) -> Option<String> {
        self.state.lock().keyspace.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl StoreBackend for RecordingBackend {
    async fn execute_ddl(&self, cql: &str) -> Result<(), SteleError> {
        self.state.lock().ddl.push(cql.to_string());
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), SteleError> {
        self.state.lock().keyspace = Some(keyspace.to_string());
        Ok(())
    }

    async fn prepare(&self, cql: &str) -> Result<PreparedId, SteleError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.prepared.insert(id, cql.to_string());
        Ok(PreparedId(id))
    }

    async fn execute(
        &self,
        statement: PreparedId,
        params: Vec<Value>,
    ) -> Result<Vec<Record>, SteleError> {
        let mut state = self.state.lock();
        let cql = state
            .prepared
            .get(&statement.0)
            .cloned()
            .ok_or_else(|| SteleError::Schema(format!("unknown statement id {}", statement.0)))?;
        state.executions.push((cql.clone(), params));
        Ok(state.rows.get(&cql).cloned().unwrap_or_default())
    }

    async fn close(&self) -> Result<(), SteleError> {
        self.state.lock().closed = true;
        Ok(())
    }
}
