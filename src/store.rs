//! Persistence for the current trajectory batch and alert batch
//!
//! Both stores hold a single generation that is replaced wholesale. A reader
//! sees either the complete previous batch or the complete new one:
//! the file store writes a temporary sibling and renames it over the target,
//! the memory store swaps under a lock.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(test)]
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::analysis::CloseApproach;
use crate::data::TrajectoryBatch;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Holds the latest predicted trajectories
pub trait TrajectoryStore {
    /// Replace the stored batch
    fn save_batch(&self, batch: &TrajectoryBatch) -> Result<(), StoreError>;

    /// Most recently saved batch, `None` if nothing was ever saved
    fn load_batch(&self) -> Result<Option<TrajectoryBatch>, StoreError>;
}

/// Holds the alerts of the latest scan
pub trait AlertSink {
    /// Replace the stored alerts
    fn save_alerts(&self, alerts: &[CloseApproach]) -> Result<(), StoreError>;

    /// Most recently saved alerts, empty if nothing was ever saved
    fn load_alerts(&self) -> Result<Vec<CloseApproach>, StoreError>;
}

/// A single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No stored document at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(self.io_err(e)),
        };

        let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(value))
    }

    fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| self.io_err(e))?;

        let file_name = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("store");
        let tmp = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

        let written = (|| -> Result<(), StoreError> {
            let file = File::create(&tmp).map_err(|e| self.io_err(e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
            writer.flush().map_err(|e| self.io_err(e))?;
            writer.get_ref().sync_all().map_err(|e| self.io_err(e))?;
            std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
        })();

        if written.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        written?;

        if let Ok(dir) = File::open(&parent) {
            let _ = dir.sync_all();
        }
        Ok(())
    }
}

impl TrajectoryStore for JsonFileStore {
    fn save_batch(&self, batch: &TrajectoryBatch) -> Result<(), StoreError> {
        self.write(batch)?;
        log::info!("Predictions saved to {:?} ({} objects)", self.path, batch.len());
        Ok(())
    }

    fn load_batch(&self) -> Result<Option<TrajectoryBatch>, StoreError> {
        self.read()
    }
}

impl AlertSink for JsonFileStore {
    fn save_alerts(&self, alerts: &[CloseApproach]) -> Result<(), StoreError> {
        self.write(alerts)?;
        log::info!("Collision alerts saved to {:?} ({} alerts)", self.path, alerts.len());
        Ok(())
    }

    fn load_alerts(&self) -> Result<Vec<CloseApproach>, StoreError> {
        Ok(self.read()?.unwrap_or_default())
    }
}

/// In-process store, one slot per instance
#[cfg(test)]
#[derive(Debug)]
pub struct MemoryStore<T> {
    slot: RwLock<Option<T>>,
    saves: AtomicUsize,
}

#[cfg(test)]
impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn replace(&self, value: T) {
        *self.slot.write() = Some(value);
        self.saves.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl TrajectoryStore for MemoryStore<TrajectoryBatch> {
    fn save_batch(&self, batch: &TrajectoryBatch) -> Result<(), StoreError> {
        self.replace(batch.clone());
        Ok(())
    }

    fn load_batch(&self) -> Result<Option<TrajectoryBatch>, StoreError> {
        Ok(self.slot.read().clone())
    }
}

#[cfg(test)]
impl AlertSink for MemoryStore<Vec<CloseApproach>> {
    fn save_alerts(&self, alerts: &[CloseApproach]) -> Result<(), StoreError> {
        self.replace(alerts.to_vec());
        Ok(())
    }

    fn load_alerts(&self) -> Result<Vec<CloseApproach>, StoreError> {
        Ok(self.slot.read().clone().unwrap_or_default())
    }
}
