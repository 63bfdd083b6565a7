//! Scanner contract and base utilities, and the invocation harness
//! that runs one scanner against one file under a per-scan timeout.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde_json::Value;

use crate::blob::BlobStore;
use crate::deadline::Deadline;
use crate::error::{Result, SieveError};
use crate::ioc::{collect, Ioc, IocKind};
use crate::model::{File, FieldValue, ScanResult, ScannerAssignment};

/// Options passed to a scanner for this invocation: the assignment's static
/// `options` mapping.
pub type Options = BTreeMap<String, Value>;

/// Chunk size used when streaming extracted child bytes to the blob store,
/// ported from the reference's `chunk_string`.
pub const CHUNK_SIZE: usize = 1024 * 16;

/// Trait that scanners implement. A scanner's own `scan` body is the only
/// thing plugin authors write; everything else (timeout, failure isolation,
/// reset-between-calls) is the harness's job.
///
/// Scanners are polymorphic only over this one capability set: `scan` plus
/// an optional `init`.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Stable, class-like identifier (e.g. `"ScanStrings"`). The event key
    /// is derived from this by stripping a leading `Scan` and snake-casing.
    fn name(&self) -> &str;

    /// One-time setup hook, run when the registry first constructs the
    /// scanner. Default no-op.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Scans `data`. Implementations write into `ctx` instead of returning
    /// a value directly; returning `Err` other than the two deadline
    /// variants is treated as an uncaught scanner failure, isolated to this
    /// scanner's result.
    async fn scan(&self, data: &[u8], file: &File, options: &Options, ctx: &mut ScanContext) -> Result<()>;
}

/// Derives a scanner's result key from its name: strip a leading `Scan`,
/// then snake_case.
pub fn scanner_key(name: &str) -> String {
    name.strip_prefix("Scan").unwrap_or(name).to_snake_case()
}

/// Fresh per-invocation state handed to a scanner's `scan` call (the
/// "invocation context" variant of the reset pattern, which makes concurrent
/// reuse trivial since nothing on the `Scanner` instance itself is mutated).
pub struct ScanContext {
    pub flags: Vec<String>,
    pub fields: IndexMap<String, FieldValue>,
    pub children: Vec<File>,
    pub iocs: Vec<Ioc>,
    scanner_name: String,
    blob: Arc<dyn BlobStore>,
    child_deadline: Deadline,
}

impl ScanContext {
    pub(crate) fn new(scanner_name: String, blob: Arc<dyn BlobStore>, child_deadline: Deadline) -> Self {
        Self {
            flags: Vec::new(),
            fields: IndexMap::new(),
            children: Vec::new(),
            iocs: Vec::new(),
            scanner_name,
            blob,
            child_deadline,
        }
    }

    /// Writes a result field under an arbitrary key, in call order.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Appends a short flag token.
    pub fn flag(&mut self, flag: impl Into<String>) {
        self.flags.push(flag.into());
    }

    /// Validates and records one or more indicators of compromise. Invalid
    /// kind strings are dropped with a warning, same as an individual
    /// malformed IoC value.
    pub fn add_iocs<I: IntoIocValues>(
        &mut self,
        values: I,
        kind: &str,
        description: &str,
        malicious: bool,
    ) {
        let Ok(kind) = kind.parse::<IocKind>() else {
            tracing::warn!(%kind, "ioc kind not in accepted range");
            return;
        };
        for value in values.into_values() {
            self.iocs.extend(collect(
                &value,
                kind,
                &self.scanner_name,
                description,
                malicious,
            ));
        }
    }

    /// Allocates a child file, streams `data` to the blob store in
    /// [`CHUNK_SIZE`] pieces, and appends it to this invocation's children.
    /// The child's `pointer` defaults to its own identity.
    pub async fn extract_child(&mut self, mut child: File, data: &[u8]) -> Result<File> {
        for chunk in data.chunks(CHUNK_SIZE) {
            self.blob
                .append(&child.pointer, chunk, self.child_deadline)
                .await?;
        }
        child.source = self.scanner_name.clone();
        self.children.push(child.clone());
        Ok(child)
    }
}

/// Accepts either a single IoC value or a list of them, mirroring the
/// reference's `add_iocs(ioc_or_list, ...)`.
pub trait IntoIocValues {
    fn into_values(self) -> Vec<String>;
}

impl IntoIocValues for &str {
    fn into_values(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoIocValues for String {
    fn into_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoIocValues for &[u8] {
    fn into_values(self) -> Vec<String> {
        vec![String::from_utf8_lossy(self).into_owned()]
    }
}

impl<S: Into<String>> IntoIocValues for Vec<S> {
    fn into_values(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

fn one_line_failure(err: &SieveError) -> String {
    err.to_string().lines().next().unwrap_or_default().to_string()
}

/// Resolves the effective per-scan timeout: `options.scanner_timeout ??
/// configured_default ?? 10`. A configured default of `0` is treated the
/// same as "absent" — this one field, unlike the worker's
/// `time_to_live`/`max_files`, never means "unlimited".
pub fn effective_scanner_timeout(options: &Options, configured_default: u64) -> u64 {
    if let Some(v) = options.get("scanner_timeout").and_then(Value::as_u64) {
        if v > 0 {
            return v;
        }
    }
    if configured_default > 0 {
        return configured_default;
    }
    10
}

/// Which of the three nested deadlines is tightest for one invocation.
enum TightestDeadline {
    Scanner,
    Distribution,
    Request,
}

/// Runs one scanner against one file, racing `scan()` against the tightest
/// of the scanner's own timeout, the distribution deadline, and the request
/// deadline — whichever elapses first cancels the scan in flight.
///
/// Returns `(key, result, children)`. The scanner's own deadline firing is
/// recorded as the `timed_out` flag and isolated to this scanner's result;
/// any other scanner failure is recorded as `uncaught_exception` plus a
/// one-line `exception` field, also isolated. The distribution and request
/// deadlines are never isolated this way — when either is the one that
/// fires, `scan()` is cancelled mid-flight and the matching
/// [`SieveError`] is propagated to the caller.
pub async fn invoke(
    scanner: &dyn Scanner,
    data: &[u8],
    file: &File,
    assignment: &ScannerAssignment,
    configured_default_timeout: u64,
    blob: Arc<dyn BlobStore>,
    distribution_deadline: Deadline,
    request_deadline: Deadline,
) -> Result<(String, ScanResult, Vec<File>)> {
    let mut ctx = ScanContext::new(scanner.name().to_string(), blob, request_deadline);
    let timeout_secs = effective_scanner_timeout(&assignment.options, configured_default_timeout);
    let scanner_deadline = Deadline::from_now(timeout_secs as f64);
    let start = Instant::now();

    let mut bound = scanner_deadline;
    let mut tightest = TightestDeadline::Scanner;
    if distribution_deadline.epoch_secs() < bound.epoch_secs() {
        bound = distribution_deadline;
        tightest = TightestDeadline::Distribution;
    }
    if request_deadline.epoch_secs() < bound.epoch_secs() {
        bound = request_deadline;
        tightest = TightestDeadline::Request;
    }

    let mut exception = None;
    tokio::select! {
        outcome = scanner.scan(data, file, &assignment.options, &mut ctx) => {
            match outcome {
                Ok(()) => {}
                Err(SieveError::DistributionTimeout) => return Err(SieveError::DistributionTimeout),
                Err(SieveError::RequestTimeout) => return Err(SieveError::RequestTimeout),
                Err(other) => {
                    tracing::warn!(scanner = scanner.name(), error = %other, "uncaught scanner exception");
                    ctx.flags.push("uncaught_exception".to_string());
                    exception = Some(one_line_failure(&other));
                }
            }
        }
        _ = tokio::time::sleep(bound.remaining()) => {
            match tightest {
                TightestDeadline::Scanner => ctx.flags.push("timed_out".to_string()),
                TightestDeadline::Distribution => return Err(SieveError::DistributionTimeout),
                TightestDeadline::Request => return Err(SieveError::RequestTimeout),
            }
        }
    }

    let result = ScanResult {
        elapsed: (start.elapsed().as_secs_f64() * 1_000_000.0).round() / 1_000_000.0,
        flags: ctx.flags,
        iocs: ctx.iocs,
        exception,
        fields: ctx.fields,
    };

    Ok((scanner_key(scanner.name()), result, ctx.children))
}
