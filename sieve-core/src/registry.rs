//! Scanner registry: resolves a scanner name to a reusable instance,
//! constructed once per worker and cached for its lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::scanner::Scanner;

/// Per-worker cache of constructed scanner instances. Missing scanners are
/// logged and skipped rather than treated as fatal.
#[derive(Default, Clone)]
pub struct ScannerRegistry {
    scanners: HashMap<String, Arc<dyn Scanner>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the scanner's one-time `init()` hook, then registers it under
    /// its own `name()`. A failing `init()` aborts registration; the worker
    /// treats this as fatal to startup.
    pub async fn register(&mut self, scanner: Arc<dyn Scanner>) -> Result<()> {
        scanner.init().await?;
        self.scanners.insert(scanner.name().to_string(), scanner);
        Ok(())
    }

    /// Resolves `name` to its cached instance, or `None` if unregistered.
    /// Callers are expected to log and skip on `None`.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Scanner>> {
        let found = self.scanners.get(name).cloned();
        if found.is_none() {
            warn!(scanner = name, "scanner not registered, skipping");
        }
        found
    }
}
