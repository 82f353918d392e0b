use crate::backend::PreparedId;
use crate::error::SteleError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// The operation a cached statement serves. Update statements carry the
/// sorted set of non-key fields they assign, so two partial updates with
/// different field subsets never share a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementKind {
    SelectById,
    InsertJson,
    Update { fields: Vec<String> },
}

impl StatementKind {
    pub fn update(mut fields: Vec<String>) -> Self {
        fields.sort();
        StatementKind::Update { fields }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    pub table: String,
    pub kind: StatementKind,
}

/// A prepared statement plus the bind-order metadata recorded when it was
/// built. `set_columns` is the SET-clause column order of an update
/// statement (empty for other kinds); bind values must follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedStatement {
    pub id: PreparedId,
    pub cql: String,
    pub set_columns: Vec<String>,
}

/// Memoizes prepared statements for the client's lifetime. Each key is
/// built at most once; concurrent callers for a key whose build is in
/// flight wait for it instead of preparing again. A failed build leaves the
/// slot empty so a later call can retry. No eviction: the key space is
/// bounded by declared tables times operation kinds.
#[derive(Default)]
pub struct StatementCache {
    entries: Mutex<HashMap<StatementKey, Arc<OnceCell<Arc<CachedStatement>>>>>,
}

impl StatementCache {
    pub async fn get_or_prepare<F, Fut>(
        &self,
        key: StatementKey,
        build: F,
    ) -> Result<Arc<CachedStatement>, SteleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedStatement, SteleError>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            entries.entry(key).or_default().clone()
        };
        let statement = cell
            .get_or_try_init(|| async move { build().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(statement))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
