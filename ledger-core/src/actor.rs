//! Single-writer ingestion actor
//!
//! One Tokio task owns the [`IngestionLoop`] and therefore the whole ledger.
//! Other tasks talk to it only through a cloneable [`IngestionHandle`]:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │   IngestionHandle (Clone)    │
//! │   status() / shutdown()      │
//! └──────────────┬───────────────┘
//!                │ mpsc::channel (bounded)
//!                ▼
//! ┌──────────────────────────────┐      ┌─────────────┐
//! │  IngestionActor (one task)   │◀─────│ EventSource │
//! │  apply → forward → snapshot  │      └─────────────┘
//! └──────────────┬───────────────┘
//!                ▼
//!          ┌────────────┐
//!          │ RecordSink │
//!          └────────────┘
//! ```
//!
//! Control messages are only observed between blocks, so a shutdown never
//! leaves a block half applied.

use crate::ingestion::{IngestionLoop, IngestionStats};
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Message sent to the ingestion actor
#[derive(Debug)]
pub enum ControlMessage {
    /// Report current counters
    Status {
        /// Reply channel
        response: oneshot::Sender<IngestionStats>,
    },

    /// Stop after the block in progress
    Shutdown,
}

/// Actor that drives one ingestion loop
#[derive(Debug)]
pub struct IngestionActor {
    ingestion: IngestionLoop,
    mailbox: mpsc::Receiver<ControlMessage>,
}

impl IngestionActor {
    /// Create new actor
    pub fn new(ingestion: IngestionLoop, mailbox: mpsc::Receiver<ControlMessage>) -> Self {
        Self { ingestion, mailbox }
    }

    /// Run until the source is exhausted, a shutdown is requested, or a
    /// fatal error occurs
    pub async fn run(mut self) -> Result<IngestionStats> {
        loop {
            tokio::select! {
                biased;

                Some(msg) = self.mailbox.recv() => {
                    match msg {
                        ControlMessage::Status { response } => {
                            let _ = response.send(self.ingestion.stats().clone());
                        }
                        ControlMessage::Shutdown => {
                            tracing::info!("Shutdown requested");
                            return self.ingestion.finish(false).await;
                        }
                    }
                }

                next = self.ingestion.next_block() => {
                    let block = match next {
                        Ok(Some(block)) => block,
                        Ok(None) => return self.ingestion.finish(true).await,
                        Err(e) => {
                            tracing::error!("Event source failed: {}", e);
                            return Err(e);
                        }
                    };

                    let height = block.height;
                    if let Err(e) = self.ingestion.process_block(block).await {
                        tracing::error!("Ingestion halted at block {}: {}", height, e);
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct IngestionHandle {
    sender: mpsc::Sender<ControlMessage>,
}

impl IngestionHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<ControlMessage>) -> Self {
        Self { sender }
    }

    /// Current counters
    pub async fn status(&self) -> Result<IngestionStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControlMessage::Status { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Ask the actor to stop after the block in progress
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ControlMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ingestion actor.
///
/// The join handle resolves to the final counters, or to the fatal error
/// that stopped ingestion.
pub fn spawn_ingestion(
    ingestion: IngestionLoop,
    mailbox_capacity: usize,
) -> (IngestionHandle, JoinHandle<Result<IngestionStats>>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let actor = IngestionActor::new(ingestion, rx);

    let task = tokio::spawn(actor.run());

    (IngestionHandle::new(tx), task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::EventSource;
    use crate::memory::{MemorySink, MemorySource};
    use crate::metrics::Metrics;
    use crate::types::{Address, Asset, BlockEvents, OrderingKey, TransferEvent};
    use crate::value::ExactValue;
    use crate::Config;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Yields its blocks, then stays pending forever
    struct StallingSource {
        blocks: VecDeque<BlockEvents>,
    }

    #[async_trait]
    impl EventSource for StallingSource {
        async fn next_block(&mut self) -> Result<Option<BlockEvents>> {
            match self.blocks.pop_front() {
                Some(block) => Ok(Some(block)),
                None => std::future::pending().await,
            }
        }
    }

    fn token() -> Address {
        Address::repeat_byte(0x7e)
    }

    fn config() -> Config {
        Config {
            snapshot_cadence_blocks: 100,
            assets: vec![Asset::new("X", token(), 0)],
            ..Config::default()
        }
    }

    fn mint_block(height: u64, to: Address) -> BlockEvents {
        BlockEvents::new(
            height,
            height * 1_000,
            vec![TransferEvent {
                key: OrderingKey::new(height, 0, 0),
                timestamp: height * 1_000,
                token: token(),
                from: Address::ZERO,
                to,
                value: ExactValue::from(10i64),
            }],
        )
    }

    fn ingestion(source: Box<dyn EventSource>, sink: MemorySink) -> IngestionLoop {
        IngestionLoop::new(&config(), source, Box::new(sink), Metrics::new().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_actor_runs_to_exhaustion() {
        let a = Address::repeat_byte(0xaa);
        let source = MemorySource::new((1..=5).map(|h| mint_block(h, a)).collect());
        let sink = MemorySink::new();
        let flushes = sink.clone();

        let (_handle, task) = spawn_ingestion(ingestion(Box::new(source), sink), 8);
        let stats = task.await.unwrap().unwrap();

        assert_eq!(stats.blocks, 5);
        assert_eq!(stats.last_block, Some(5));
        assert!(stats.exhausted);
        assert!(flushes.flush_count() >= 1);
    }

    #[tokio::test]
    async fn test_actor_status_and_shutdown() {
        let a = Address::repeat_byte(0xaa);
        let source = StallingSource {
            blocks: (1..=3).map(|h| mint_block(h, a)).collect(),
        };

        let (handle, task) = spawn_ingestion(ingestion(Box::new(source), MemorySink::new()), 8);

        // Wait until the three blocks are in
        let mut stats = handle.status().await.unwrap();
        while stats.blocks < 3 {
            tokio::task::yield_now().await;
            stats = handle.status().await.unwrap();
        }
        assert_eq!(stats.tracked_addresses, 1);

        handle.shutdown().await.unwrap();
        let stats = task.await.unwrap().unwrap();
        assert_eq!(stats.blocks, 3);
        assert!(!stats.exhausted);

        // Actor is gone
        assert!(handle.status().await.is_err());
    }

    #[tokio::test]
    async fn test_actor_surfaces_fatal_error() {
        let a = Address::repeat_byte(0xaa);
        let source = MemorySource::new(vec![mint_block(2, a), mint_block(1, a)]);

        let (_handle, task) = spawn_ingestion(ingestion(Box::new(source), MemorySink::new()), 8);
        let err = task.await.unwrap().unwrap_err();

        assert!(matches!(err, Error::OutOfOrder { .. }));
    }
}
