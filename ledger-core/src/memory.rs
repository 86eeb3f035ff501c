//! In-memory source and sink
//!
//! Used by tests and by callers that already hold decoded blocks.

use crate::ingestion::{EventSource, RecordSink};
use crate::types::{BlockEvents, Record};
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Event source over a fixed list of blocks
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    blocks: VecDeque<BlockEvents>,
}

impl MemorySource {
    /// Create new source; blocks are yielded in the given order
    pub fn new(blocks: Vec<BlockEvents>) -> Self {
        Self {
            blocks: blocks.into(),
        }
    }

    /// Blocks not yet yielded
    pub fn remaining(&self) -> usize {
        self.blocks.len()
    }
}

#[async_trait]
impl EventSource for MemorySource {
    async fn next_block(&mut self) -> Result<Option<BlockEvents>> {
        Ok(self.blocks.pop_front())
    }
}

/// Record sink collecting into shared memory.
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to the ingestion loop.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
    flushes: Arc<AtomicUsize>,
}

impl MemorySink {
    /// Create new empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared record buffer
    pub fn records_handle(&self) -> Arc<Mutex<Vec<Record>>> {
        Arc::clone(&self.records)
    }

    /// Copy of everything appended so far
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Number of flush calls
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&mut self, record: &Record) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "memory"
    }
}
