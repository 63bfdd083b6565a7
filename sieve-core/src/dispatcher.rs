//! Dispatcher: processes exactly one `File` within a request,
//! recursing depth-first into any children its scanners produce.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, debug_span, warn, Instrument};

use crate::assign::{assign, MappingTable};
use crate::blob::BlobStore;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::model::{tree_dict, File, FileDict, FileEvent};
use crate::registry::ScannerRegistry;
use crate::scanner::invoke;
use crate::sink::EventSink;
use crate::taster::Taster;

/// Per-request limits the dispatcher enforces while walking one file tree.
#[derive(Clone, Copy, Debug)]
pub struct DispatchLimits {
    pub distribution_secs: f64,
    pub default_scanner_timeout_secs: u64,
    pub max_depth: u32,
}

/// Owns every collaborator the dispatcher needs to process a file:
/// blob store, event sink, taster, scanner registry, and mapping table.
/// Constructed once per worker and shared (read-only after startup) across
/// every request it handles.
pub struct Dispatcher {
    blob: Arc<dyn BlobStore>,
    sink: Arc<dyn EventSink>,
    taster: Arc<Taster>,
    registry: ScannerRegistry,
    mapping_table: MappingTable,
    limits: DispatchLimits,
}

impl Dispatcher {
    pub fn new(
        blob: Arc<dyn BlobStore>,
        sink: Arc<dyn EventSink>,
        taster: Arc<Taster>,
        registry: ScannerRegistry,
        mapping_table: MappingTable,
        limits: DispatchLimits,
    ) -> Self {
        Self {
            blob,
            sink,
            taster,
            registry,
            mapping_table,
            limits,
        }
    }

    /// Processes `file` and, depth-first, every descendant its scanners
    /// extract. `root_id` identifies the request as a whole (it becomes
    /// `tree.root` on every emitted event); `request_deadline` bounds the
    /// entire call.
    ///
    /// Boxed because this recurses through an `async fn`, which Rust can't
    /// otherwise size.
    pub fn dispatch<'a>(
        &'a self,
        file: File,
        root_id: Arc<str>,
        request_deadline: Deadline,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if request_deadline.is_expired() {
                warn!(file = %file.id, "request deadline already expired, aborting node");
                return Ok(());
            }
            if file.depth > self.limits.max_depth {
                debug!(file = %file.id, depth = file.depth, "depth exceeds max_depth, skipping");
                return Ok(());
            }

            let span = debug_span!("dispatch_file", file_id = %file.id, depth = file.depth);
            self.dispatch_one(file, root_id, request_deadline)
                .instrument(span)
                .await
        })
    }

    async fn dispatch_one(&self, mut file: File, root_id: Arc<str>, request_deadline: Deadline) -> Result<()> {
        let distribution_deadline = Deadline::from_now(self.limits.distribution_secs);

        let data = self.blob.drain(&file.pointer).await?;

        let content_type_tags = self.taster.taste_content_type(&data)?;
        file.add_flavors("content-type", content_type_tags);
        let rule_tags = self.taster.taste_rules(&data);
        file.add_flavors("rule", rule_tags);

        let flavor_set = file.flavor_set();
        let assignments = assign(&flavor_set, file.name.as_deref(), &file.source, &self.mapping_table);

        let mut scan = IndexMap::new();
        let mut children: Vec<File> = Vec::new();
        let mut scanner_names = Vec::with_capacity(assignments.len());

        for assignment in &assignments {
            if distribution_deadline.is_expired() {
                warn!(file = %file.id, "distribution deadline expired mid-scan, truncating scanner list");
                break;
            }
            let Some(scanner) = self.registry.resolve(&assignment.name) else {
                continue;
            };
            scanner_names.push(assignment.name.clone());
            let outcome = invoke(
                scanner.as_ref(),
                &data,
                &file,
                assignment,
                self.limits.default_scanner_timeout_secs,
                self.blob.clone(),
                distribution_deadline,
                request_deadline,
            )
            .await;

            match outcome {
                Ok((key, result, mut produced)) => {
                    scan.insert(key, result);
                    children.append(&mut produced);
                }
                // Owned by this layer: stop scanning this file, but the event
                // composed from what ran so far is still emitted below.
                Err(crate::error::SieveError::DistributionTimeout) => {
                    warn!(file = %file.id, "distribution deadline fired inside a scanner");
                    break;
                }
                // Owned by the worker loop: propagate unchanged.
                Err(crate::error::SieveError::RequestTimeout) => return Err(crate::error::SieveError::RequestTimeout),
                Err(other) => return Err(other),
            }
        }

        let file_dict = FileDict {
            depth: file.depth,
            name: file.name.clone(),
            flavors: file.flavors.clone(),
            scanners: scanner_names,
            size: data.len(),
            source: file.source.clone(),
            tree: tree_dict(file.id, file.parent, file.depth, &root_id),
        };

        let event = FileEvent { file: file_dict, scan };
        self.sink.append_event(&root_id, &event, request_deadline).await?;

        if distribution_deadline.is_expired() || request_deadline.is_expired() {
            return Ok(());
        }

        for mut child in children {
            child.parent = Some(file.id);
            child.depth = file.depth + 1;
            self.dispatch(child, root_id.clone(), request_deadline).await?;
        }

        Ok(())
    }
}
