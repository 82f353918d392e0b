pub mod scylla;

use crate::error::SteleError;
use crate::values::{Record, Value};
use async_trait::async_trait;

pub use self::scylla::ScyllaBackend;

/// Opaque handle to a statement prepared by a backend. The backend owns the
/// driver-level prepared object; callers only hold the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreparedId(pub u64);

/// The boundary to the column store. Everything the gateway needs from a
/// store session: one-shot schema statements, keyspace selection, statement
/// preparation and prepared execution with positional parameters.
///
/// Implementations multiplex concurrent requests over one session and fix
/// the consistency level for the client's lifetime. Transient store errors
/// propagate unmodified; no retries happen at this layer.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Executes a one-shot schema statement (CREATE KEYSPACE / TYPE / TABLE).
    async fn execute_ddl(&self, cql: &str) -> Result<(), SteleError>;

    /// Switches the session to `keyspace` for subsequent statements.
    async fn use_keyspace(&self, keyspace: &str) -> Result<(), SteleError>;

    async fn prepare(&self, cql: &str) -> Result<PreparedId, SteleError>;

    /// Executes a prepared statement, returning result rows as name/value
    /// records (empty for writes).
    async fn execute(
        &self,
        statement: PreparedId,
        params: Vec<Value>,
    ) -> Result<Vec<Record>, SteleError>;

    /// Closes the underlying session. Called once by
    /// [`SteleClient::shutdown`](crate::SteleClient::shutdown).
    async fn close(&self) -> Result<(), SteleError>;
}
