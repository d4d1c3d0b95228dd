// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk cache of message details, one JSON file per message id.
//!
//! The cache doubles as the browsing history: every detail ever opened
//! stays on disk until the directory is cleared.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::error::CacheError;
use crate::model::{Message, MessageDetail};

/// Directory of `<id>.json` detail files.
#[derive(Debug, Clone)]
pub struct DetailCache {
    dir: PathBuf,
}

impl DetailCache {
    /// Open the cache at `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, CacheError> {
        if !is_valid_id(id) {
            return Err(CacheError::InvalidId(id.to_owned()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    /// Cached detail for `id`. Missing and unreadable entries are misses.
    pub fn get(&self, id: &str) -> Option<MessageDetail> {
        let path = match self.path_for(id) {
            Ok(path) => path,
            Err(e) => {
                warn!(err = %e, "skipping cache lookup");
                return None;
            }
        };
        match read_detail(&path) {
            Ok(detail) => Some(detail),
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), err = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Store `detail` atomically (write tmp + rename).
    pub fn put(&self, detail: &MessageDetail) -> Result<(), CacheError> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let path = self.path_for(&detail.id)?;
        let json = serde_json::to_vec_pretty(detail)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.dir.join(format!(".{}.{}.{seq}.tmp", detail.id, std::process::id()));
        std::fs::write(&tmp_path, json)?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        debug!(id = %detail.id, "cached message detail");
        Ok(())
    }

    /// Every readable cached message, most recently cached first.
    pub fn history(&self) -> Result<Vec<Message>, CacheError> {
        let mut entries: Vec<(SystemTime, Message)> = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let detail = match read_detail(&path) {
                Ok(detail) => detail,
                Err(e) => {
                    debug!(path = %path.display(), err = %e, "skipping history entry");
                    continue;
                }
            };
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, detail.to_summary()));
        }
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(entries.into_iter().map(|(_, m)| m).collect())
    }
}

fn read_detail(path: &Path) -> Result<MessageDetail, CacheError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// A message id must name exactly one file inside the cache directory.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.starts_with('.')
        && !id.contains(['/', '\\', '\0'])
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
