//! Upload storage: directory resolution, filename sanitizing, and the
//! optional retention sweep.
//!
//! Files are keyed by sanitized name only, so a second upload with the same
//! name replaces the first. A stored file stays in flight until its
//! `StoredUpload` guard drops, and the sweeper never removes in-flight files.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::Bytes;
use docqa_ingest::DocumentKind;
use tokio::fs;
use tracing::{info, warn};

/// Subdirectory of the platform temp dir used when the preferred directory is unusable.
const TEMP_FALLBACK_DIR: &str = "docqa-uploads";

/// A validated upload, before it is written to disk.
#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: String,
    /// Sanitized name the file is stored under.
    pub stored_name: String,
    pub kind: DocumentKind,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(original_name: String, kind: DocumentKind, bytes: Bytes) -> Self {
        Self {
            stored_name: storage_name(&original_name, kind),
            original_name,
            kind,
            bytes,
        }
    }
}

/// Paths currently being extracted, with a count per path since two
/// uploads can share a sanitized name.
type InFlight = Arc<Mutex<HashMap<PathBuf, usize>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<PathBuf, usize>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A stored upload that the sweeper must leave alone until this is dropped.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
    in_flight: InFlight,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        let mut map = lock(&self.in_flight);
        if let Some(count) = map.get_mut(&self.path) {
            *count -= 1;
            if *count == 0 {
                map.remove(&self.path);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    in_flight: InFlight,
}

impl UploadStore {
    /// Use `preferred` if it can be created, otherwise a directory under the
    /// platform temp dir.
    pub fn resolve(preferred: &Path) -> io::Result<Self> {
        match std::fs::create_dir_all(preferred) {
            Ok(()) => Ok(Self::at(preferred.to_path_buf())),
            Err(e) => {
                let fallback = std::env::temp_dir().join(TEMP_FALLBACK_DIR);
                warn!(
                    "Upload dir {} unusable ({}), falling back to {}",
                    preferred.display(),
                    e,
                    fallback.display()
                );
                std::fs::create_dir_all(&fallback)?;
                Ok(Self::at(fallback))
            }
        }
    }

    fn at(dir: PathBuf) -> Self {
        Self {
            dir,
            in_flight: Arc::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under `name` (already sanitized), replacing any existing file.
    async fn save(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Persist `file` and mark it in flight. The mark is taken before the
    /// write so a concurrent sweep can't see the file unprotected.
    pub async fn store(&self, file: &UploadedFile) -> io::Result<StoredUpload> {
        let guard = StoredUpload {
            path: self.dir.join(&file.stored_name),
            in_flight: self.in_flight.clone(),
        };
        *lock(&self.in_flight).entry(guard.path.clone()).or_insert(0) += 1;
        self.save(&file.stored_name, &file.bytes).await?;
        Ok(guard)
    }

    fn is_in_flight(&self, path: &Path) -> bool {
        lock(&self.in_flight).contains_key(path)
    }

    /// Delete regular files whose modification time is at least `max_age` ago.
    /// Returns how many were removed.
    pub async fn sweep_expired(&self, max_age: Duration) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if self.is_in_flight(&entry.path()) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            // Files with an mtime in the future are left alone.
            let expired = meta
                .modified()
                .ok()
                .and_then(|t| t.elapsed().ok())
                .is_some_and(|age| age >= max_age);
            if !expired {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove expired upload {}: {}", entry.path().display(), e),
            }
        }
        Ok(removed)
    }
}

/// Periodically sweep uploads older than `retention`.
pub fn spawn_sweeper(store: UploadStore, retention: Duration, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match store.sweep_expired(retention).await {
                Ok(0) => {}
                Ok(n) => info!("Swept {} expired upload(s) from {}", n, store.dir().display()),
                Err(e) => warn!("Upload sweep failed: {}", e),
            }
        }
    })
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Path separators become word breaks, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.`/`_` are
/// trimmed. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// The on-disk name for an upload: the sanitized original, or a generic
/// name when sanitizing loses the accepted extension.
pub fn storage_name(original: &str, kind: DocumentKind) -> String {
    let sanitized = sanitize_filename(original);
    if DocumentKind::from_filename(&sanitized) == Some(kind) {
        sanitized
    } else if sanitized.is_empty() {
        format!("upload.{}", kind.extension())
    } else {
        format!("{}.{}", sanitized, kind.extension())
    }
}
