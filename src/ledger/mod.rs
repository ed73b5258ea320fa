//! Dedup ledger — remembers which messages were already processed.
//!
//! Only membership is tracked. Entries are never removed and carry no
//! parsed content. `has` + `mark` is not atomic: callers that may run
//! overlapping invocations must serialize them.

pub mod libsql_ledger;
mod migrations;

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::DatabaseError;

pub use libsql_ledger::LibSqlLedger;

/// Processed-message store keyed by message ID.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Whether `id` has been marked.
    async fn has(&self, id: &str) -> Result<bool, DatabaseError>;

    /// Mark `id` as processed. Marking twice is the same as once.
    async fn mark(&self, id: &str) -> Result<(), DatabaseError>;
}

/// Process-lifetime ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    seen: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn seen(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.seen().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen().is_empty()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn has(&self, id: &str) -> Result<bool, DatabaseError> {
        Ok(self.seen().contains(id))
    }

    async fn mark(&self, id: &str) -> Result<(), DatabaseError> {
        self.seen().insert(id.to_string());
        Ok(())
    }
}
