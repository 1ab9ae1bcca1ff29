use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// StateSink appends encoded frames to a journal.
#[async_trait]
pub trait StateSink: Send + Sync {
    async fn append(&self, frame: Bytes) -> anyhow::Result<()>;
}

/// StateSource reads encoded frames from a journal, in append order.
#[async_trait]
pub trait StateSource: Send {
    /// Receive the next frame, waiting at most `timeout` for one to arrive.
    /// Returns None if the timeout elapsed, which marks the end of available data.
    async fn receive(&mut self, timeout: Duration) -> anyhow::Result<Option<Bytes>>;

    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

