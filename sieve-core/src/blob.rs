//! Blob I/O adapter: append/stream file bytes to and from the shared
//! store keyed by an opaque pointer, with a deadline.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::deadline::Deadline;
use crate::error::Result;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Appends `chunk` to `pointer`'s byte queue and sets its TTL to
    /// `deadline`. Atomic append + TTL set.
    async fn append(&self, pointer: &str, chunk: &[u8], deadline: Deadline) -> Result<()>;

    /// Pops chunks in FIFO order until empty and returns the concatenation.
    /// Reading is destructive.
    async fn drain(&self, pointer: &str) -> Result<Vec<u8>>;
}

/// In-process store for tests and single-worker deployments without a
/// shared Redis backend.
#[derive(Default)]
pub struct InMemoryBlobStore {
    queues: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn append(&self, pointer: &str, chunk: &[u8], _deadline: Deadline) -> Result<()> {
        let mut queues = self.queues.lock().unwrap();
        queues
            .entry(pointer.to_string())
            .or_default()
            .push(chunk.to_vec());
        Ok(())
    }

    async fn drain(&self, pointer: &str) -> Result<Vec<u8>> {
        let mut queues = self.queues.lock().unwrap();
        let chunks = queues.remove(pointer).unwrap_or_default();
        Ok(chunks.concat())
    }
}

#[cfg(feature = "redis-backend")]
pub mod redis_backend {
    use super::*;
    use redis::AsyncCommands;

    /// Blob store backed by Redis append-only keyed byte queues with TTL:
    /// `APPEND data:<pointer> <bytes>` / `EXPIREAT data:<pointer> <deadline>`,
    /// `POP data:<pointer>`.
    pub struct RedisBlobStore {
        client: redis::Client,
    }

    impl RedisBlobStore {
        pub fn new(client: redis::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl BlobStore for RedisBlobStore {
        async fn append(&self, pointer: &str, chunk: &[u8], deadline: Deadline) -> Result<()> {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let key = format!("data:{pointer}");
            let expire_at = deadline.epoch_secs().ceil() as i64;
            redis::pipe()
                .atomic()
                .rpush(&key, chunk)
                .expire_at(&key, expire_at)
                .query_async::<()>(&mut conn)
                .await?;
            Ok(())
        }

        async fn drain(&self, pointer: &str) -> Result<Vec<u8>> {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let key = format!("data:{pointer}");
            let mut out = Vec::new();
            loop {
                let popped: Option<Vec<u8>> = conn.lpop(&key, None).await?;
                match popped {
                    Some(chunk) => out.extend(chunk),
                    None => break,
                }
            }
            Ok(out)
        }
    }
}

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisBlobStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_concatenates_fifo_chunks() {
        let store = InMemoryBlobStore::new();
        let d = Deadline::from_now(60.0);
        store.append("p1", b"hel", d).await.unwrap();
        store.append("p1", b"lo", d).await.unwrap();
        assert_eq!(store.drain("p1").await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn drain_is_destructive() {
        let store = InMemoryBlobStore::new();
        store.append("p1", b"x", Deadline::from_now(60.0)).await.unwrap();
        store.drain("p1").await.unwrap();
        assert!(store.drain("p1").await.unwrap().is_empty());
    }
}
