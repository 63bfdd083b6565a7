//! Content-type tasting: `taste_content_type(bytes) -> [tag]`, exactly one
//! libmagic-style mime string per file.

use std::path::Path;
use std::sync::Mutex;

use magic::cookie::{Cookie, Flags, Load};

use crate::error::{Result, SieveError};

/// Wraps a loaded libmagic cookie. `magic::Cookie` is not `Sync` on its own
/// (the underlying `libmagic` handle is not safe to call from two threads
/// at once), so lookups are serialized behind a `Mutex` — mirroring how the
/// scanner cache in C5 guards other non-`Sync` native handles.
pub struct ContentTyper {
    cookie: Mutex<Cookie<Load>>,
}

impl ContentTyper {
    /// Opens a magic database with `MIME_TYPE` flags, so the returned tag is
    /// a bare mime string (e.g. `text/plain`) rather than the longer
    /// human-readable description libmagic can also produce. `db` is the
    /// configured `tasting.content_type_db` path; `None` loads libmagic's
    /// compiled-in default database.
    pub fn open(db: Option<&Path>) -> Result<Self> {
        let cookie = Cookie::open(Flags::MIME_TYPE)
            .map_err(|e| SieveError::Internal(format!("magic cookie open failed: {e}")))?;
        let cookie = match db {
            Some(path) => cookie.load(&[path]),
            None => cookie.load::<&Path>(&[]),
        }
        .map_err(|e| SieveError::Internal(format!("magic database load failed: {e}")))?;
        Ok(Self {
            cookie: Mutex::new(cookie),
        })
    }

    /// Tastes `data`, returning the single content-type tag.
    pub fn taste(&self, data: &[u8]) -> Result<Vec<String>> {
        let cookie = self.cookie.lock().expect("magic cookie mutex poisoned");
        let mime = cookie
            .buffer(data)
            .map_err(|e| SieveError::Internal(format!("magic buffer scan failed: {e}")))?;
        Ok(vec![mime])
    }
}
