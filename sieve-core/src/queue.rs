//! Queue adapter: pop the next due request (id + deadline) from a
//! priority-ordered pending set.

use async_trait::async_trait;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use crate::deadline::Deadline;
use crate::error::Result;

#[async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Removes and returns the earliest-deadline pending entry, or `None`.
    /// Non-blocking.
    async fn pop_next(&self) -> Result<Option<(String, Deadline)>>;

    /// Places a root pointer on the pending set with an absolute deadline.
    /// Producers are out of scope for the dispatch engine itself, but every
    /// adapter needs this for test fixtures and operator tooling.
    async fn enqueue(&self, pointer: &str, deadline: Deadline) -> Result<()>;
}

#[derive(PartialEq)]
struct Entry {
    deadline: f64,
    pointer: String,
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so the BinaryHeap (a max-heap) pops the smallest deadline.
        other
            .deadline
            .partial_cmp(&self.deadline)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// In-process priority queue for tests and single-worker deployments.
#[derive(Default)]
pub struct InMemoryQueue {
    pending: Mutex<BinaryHeap<Entry>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueAdapter for InMemoryQueue {
    async fn pop_next(&self) -> Result<Option<(String, Deadline)>> {
        let mut pending = self.pending.lock().unwrap();
        Ok(pending
            .pop()
            .map(|e| (e.pointer, Deadline::at_epoch_secs(e.deadline))))
    }

    async fn enqueue(&self, pointer: &str, deadline: Deadline) -> Result<()> {
        let mut pending = self.pending.lock().unwrap();
        pending.push(Entry {
            deadline: deadline.epoch_secs(),
            pointer: pointer.to_string(),
        });
        Ok(())
    }
}

#[cfg(feature = "redis-backend")]
pub mod redis_backend {
    use super::*;
    use redis::AsyncCommands;

    /// Queue backed by a Redis sorted set (`tasks`), scored by expiry epoch
    /// second.
    pub struct RedisQueue {
        client: redis::Client,
        key: String,
    }

    impl RedisQueue {
        pub fn new(client: redis::Client, key: impl Into<String>) -> Self {
            Self {
                client,
                key: key.into(),
            }
        }
    }

    #[async_trait]
    impl QueueAdapter for RedisQueue {
        async fn pop_next(&self) -> Result<Option<(String, Deadline)>> {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let popped: Vec<(String, f64)> = conn.zpopmin(&self.key, 1).await?;
            Ok(popped
                .into_iter()
                .next()
                .map(|(pointer, score)| (pointer, Deadline::at_epoch_secs(score))))
        }

        async fn enqueue(&self, pointer: &str, deadline: Deadline) -> Result<()> {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.zadd::<_, _, _, ()>(&self.key, pointer, deadline.epoch_secs())
                .await?;
            Ok(())
        }
    }
}

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisQueue;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_next_returns_earliest_deadline_first() {
        let q = InMemoryQueue::new();
        q.enqueue("late", Deadline::at_epoch_secs(200.0)).await.unwrap();
        q.enqueue("early", Deadline::at_epoch_secs(100.0)).await.unwrap();
        let (p, d) = q.pop_next().await.unwrap().unwrap();
        assert_eq!(p, "early");
        assert_eq!(d.epoch_secs(), 100.0);
    }

    #[tokio::test]
    async fn pop_next_on_empty_queue_is_none() {
        let q = InMemoryQueue::new();
        assert!(q.pop_next().await.unwrap().is_none());
    }
}
