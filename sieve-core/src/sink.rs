//! Event sink: append per-file events to a per-request ordered stream,
//! mark the stream terminated, apply a deadline to the stream.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::deadline::Deadline;
use crate::error::Result;
use crate::model::FileEvent;

pub const FIN: &str = "FIN";

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Appends a serialized record to `request_id`'s stream and sets the
    /// stream's TTL to `deadline`.
    async fn append_event(
        &self,
        request_id: &str,
        event: &FileEvent,
        deadline: Deadline,
    ) -> Result<()>;

    /// Appends the `FIN` sentinel and sets TTL. Must be called exactly once
    /// per handled request.
    async fn finalize(&self, request_id: &str, deadline: Deadline) -> Result<()>;
}

/// In-process sink for tests: records raw JSON lines per request, in order,
/// so test assertions can inspect the exact emitted stream.
#[derive(Default)]
pub struct InMemorySink {
    streams: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a request's stream for test assertions.
    pub fn stream(&self, request_id: &str) -> Vec<String> {
        self.streams
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for InMemorySink {
    async fn append_event(
        &self,
        request_id: &str,
        event: &FileEvent,
        _deadline: Deadline,
    ) -> Result<()> {
        let serialized = crate::format::format_event(event)?;
        self.streams
            .lock()
            .unwrap()
            .entry(request_id.to_string())
            .or_default()
            .push(serialized);
        Ok(())
    }

    async fn finalize(&self, request_id: &str, _deadline: Deadline) -> Result<()> {
        self.streams
            .lock()
            .unwrap()
            .entry(request_id.to_string())
            .or_default()
            .push(FIN.to_string());
        Ok(())
    }
}

#[cfg(feature = "redis-backend")]
pub mod redis_backend {
    use super::*;
    use redis::AsyncCommands;

    /// Sink backed by a Redis append-only list per request (`event:<root>`).
    pub struct RedisEventSink {
        client: redis::Client,
    }

    impl RedisEventSink {
        pub fn new(client: redis::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl EventSink for RedisEventSink {
        async fn append_event(
            &self,
            request_id: &str,
            event: &FileEvent,
            deadline: Deadline,
        ) -> Result<()> {
            let serialized = crate::format::format_event(event)?;
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let key = format!("event:{request_id}");
            let expire_at = deadline.epoch_secs().ceil() as i64;
            redis::pipe()
                .atomic()
                .rpush(&key, serialized)
                .expire_at(&key, expire_at)
                .query_async::<()>(&mut conn)
                .await?;
            Ok(())
        }

        async fn finalize(&self, request_id: &str, deadline: Deadline) -> Result<()> {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let key = format!("event:{request_id}");
            let expire_at = deadline.epoch_secs().ceil() as i64;
            redis::pipe()
                .atomic()
                .rpush(&key, FIN)
                .expire_at(&key, expire_at)
                .query_async::<()>(&mut conn)
                .await?;
            Ok(())
        }
    }
}

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisEventSink;
