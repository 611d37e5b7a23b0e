// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Purpose
//
// Keeps the time of the last update across daemon restarts so the forced
// update schedule (`last + interval`) is not reset by a restart.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Automatic backup: Keeps .backup of the previous timestamp
// - Recovery: Falls back to backup if the file cannot be parsed, then to
//   "no state" (first run)
//
// ## File Format
//
// A single human-readable RFC 3339 line, overwritten on every update:
//
// ```text
// 2025-01-09T12:00:00Z
// ```
//
// Older files holding a local, culture-formatted timestamp (`10/17/2026
// 13:18:00`, `17.10.2026 13.18.00`, ...) are accepted on read.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::StateStore;

/// Local timestamp layouts written by older releases, tried in order
///
/// Older releases used the machine's culture settings. Month-first is tried
/// before day-first for slash-separated dates.
const LEGACY_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H.%M.%S",
    "%d.%m.%Y %H:%M:%S",
];

/// File-based state store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::state::FileStateStore;
/// use ddns_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/ddns/lastupdate.txt").await?;
///
///     // Atomically written to disk
///     store.record_update(chrono::Utc::now()).await?;
///
///     let last = store.last_update().await?;
///     assert!(last.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    last_update: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing state file
    /// 3. If it is corrupted, try the backup
    /// 4. If both fail, start with no state
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let last_update = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            last_update: Arc::new(RwLock::new(last_update)),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from file with automatic recovery
    async fn load_with_recovery(path: &Path) -> Result<Option<DateTime<Utc>>, Error> {
        let Some(content) = Self::read_file(path).await? else {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(None);
        };

        if let Some(ts) = parse_timestamp(&content) {
            tracing::debug!("Loaded last update time: {}", ts);
            return Ok(Some(ts));
        }

        tracing::warn!(
            "State file {} is corrupted ({:?}). Attempting recovery from backup.",
            path.display(),
            content.trim()
        );

        let backup_path = Self::backup_path(path);
        if let Some(backup) = Self::read_file(&backup_path).await? {
            if let Some(ts) = parse_timestamp(&backup) {
                tracing::info!("Recovered last update time from backup: {}", ts);

                if let Err(e) = fs::copy(&backup_path, path).await {
                    tracing::error!("Failed to restore state file from backup: {}", e);
                }

                return Ok(Some(ts));
            }
            tracing::error!("Backup also corrupted. Starting with no state.");
        } else {
            tracing::warn!("No backup file found. Starting with no state.");
        }

        Ok(None)
    }

    /// Read a file, mapping "not found" to `None`
    ///
    /// Bytes that are not UTF-8 are decoded lossily; the result then fails
    /// to parse and goes through recovery like any other corrupt content.
    async fn read_file(path: &Path) -> Result<Option<String>, Error> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(String::from_utf8(bytes).unwrap_or_else(|e| {
                tracing::warn!("State file {} is not valid UTF-8", path.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write state to file atomically
    async fn write_state(&self, at: DateTime<Utc>) -> Result<(), Error> {
        let line = format!("{}\n", at.to_rfc3339_opts(SecondsFormat::Secs, true));

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(line.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Create backup of current file (if it exists)
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

/// Parse a persisted timestamp (RFC 3339, or a legacy local layout)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    LEGACY_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn last_update(&self) -> Result<Option<DateTime<Utc>>, Error> {
        Ok(*self.last_update.read().await)
    }

    async fn record_update(&self, at: DateTime<Utc>) -> Result<(), Error> {
        *self.last_update.write().await = Some(at);

        // Immediate write for durability
        self.write_state(at).await
    }
}
