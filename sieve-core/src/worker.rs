//! Worker loop: repeatedly pops one task off the queue and drives the
//! dispatcher across its whole file tree, guaranteeing `FIN` on every
//! stream it opens.

use std::sync::Arc;

use tracing::{info, warn};

use crate::deadline::Deadline;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::model::File;
use crate::queue::QueueAdapter;
use crate::sink::EventSink;

/// Worker-wide budget (`limits.time_to_live`, `limits.max_files`) plus the
/// idle poll cadence.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Worker time budget, seconds. `0` means unlimited.
    pub time_to_live: u64,
    /// Max requests handled before stopping. `0` means unlimited.
    pub max_files: u64,
    pub poll_interval: std::time::Duration,
}

/// Runs the worker loop until its TTL or `max_files` budget is exhausted.
/// Returns normally on a clean stop; never returns on a fatal error (every
/// per-request failure is caught and logged here).
pub async fn run(
    queue: Arc<dyn QueueAdapter>,
    sink: Arc<dyn EventSink>,
    dispatcher: Arc<Dispatcher>,
    limits: WorkerLimits,
) -> Result<()> {
    let worker_deadline = (limits.time_to_live > 0).then(|| Deadline::from_now(limits.time_to_live as f64));
    let mut handled: u64 = 0;

    loop {
        if let Some(deadline) = worker_deadline {
            if deadline.is_expired() {
                info!("worker time-to-live exhausted, stopping");
                break;
            }
        }
        if limits.max_files > 0 && handled >= limits.max_files {
            info!(max_files = limits.max_files, "worker max_files reached, stopping");
            break;
        }

        let popped = queue.pop_next().await?;
        let Some((root_id, deadline)) = popped else {
            tokio::time::sleep(limits.poll_interval).await;
            continue;
        };

        if deadline.is_expired() {
            warn!(request = %root_id, "popped request already past its deadline, skipping");
            continue;
        }

        info!(request = %root_id, "starting request");
        let root: Arc<str> = Arc::from(root_id.as_str());
        let root_file = File::root(root_id.clone());

        let outcome = dispatcher.dispatch(root_file, root.clone(), deadline).await;
        if let Err(err) = &outcome {
            warn!(request = %root_id, error = %err, "request ended with an error");
        }
        if let Err(err) = sink.finalize(&root_id, deadline).await {
            warn!(request = %root_id, error = %err, "failed to finalize event stream");
        }
        info!(request = %root_id, "finished request");
        handled += 1;
    }

    Ok(())
}
