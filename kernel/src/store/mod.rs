// Persistence Store
//
// Keeps an ordered sequence of image records durable. Every mutation is
// "load current snapshot -> transform -> save full snapshot", so the
// backing blob is always a complete, decodable sequence.
//
// The whole blob is rewritten per mutation. Collections are bounded by
// how many photos a person takes, not by ingest throughput.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::record::{codec, DecodeError, ImageRecord, RecordId};

pub mod backend;

pub use backend::{Backend, FileBackend, MemoryBackend};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backing store {location} is corrupt: {source}")]
    Corrupt {
        location: String,
        #[source]
        source: DecodeError,
    },

    #[error("failed to {op} {location}: {source}")]
    Io {
        location: String,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("record `{0}` not found")]
    NotFound(RecordId),

    #[error("record `{0}` already exists")]
    DuplicateId(RecordId),

    #[error("invalid backing filename `{0}`")]
    InvalidFilename(String),
}

/// Lifecycle of a store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing has been read or written yet.
    Uninitialized,

    /// The backing blob has been read or written successfully at least once.
    Loaded,
}

/// Ordered, durable collection of image records.
///
/// Not internally synchronized: one logical writer at a time. Use
/// [`crate::worker::StoreHandle`] to drive a store from concurrent code.
#[derive(Debug)]
pub struct PersistenceStore<B = FileBackend> {
    backend: B,
    state: StoreState,
}

impl PersistenceStore<FileBackend> {
    /// Store backed by `dir/filename`. The file is created on first save.
    pub fn open(dir: impl AsRef<Path>, filename: &str) -> Result<Self, StoreError> {
        let backend = FileBackend::in_dir(dir, filename)
            .ok_or_else(|| StoreError::InvalidFilename(filename.to_owned()))?;
        Ok(Self::with_backend(backend))
    }

    pub fn path(&self) -> &Path {
        self.backend.path()
    }
}

impl<B: Backend> PersistenceStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            state: StoreState::Uninitialized,
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load all records in stored order.
    ///
    /// A store that was never written holds no records; that is not an error.
    pub fn load_all(&mut self) -> Result<Vec<ImageRecord>, StoreError> {
        let records = self.read_current()?;
        self.state = StoreState::Loaded;
        info!(
            location = %self.backend.describe(),
            count = records.len(),
            "records loaded"
        );
        Ok(records)
    }

    /// Replace the persisted sequence with `records`.
    ///
    /// On error the previously persisted sequence is still intact.
    pub fn save_all(&mut self, records: &[ImageRecord]) -> Result<(), StoreError> {
        ensure_unique(records)?;

        let bytes = codec::encode(records)?;
        self.backend
            .write_atomic(&bytes)
            .map_err(|source| StoreError::Io {
                location: self.backend.describe(),
                op: "write",
                source,
            })?;

        self.state = StoreState::Loaded;
        debug!(count = records.len(), bytes = bytes.len(), "records saved");
        Ok(())
    }

    /// Insert `record` at the head of the persisted sequence.
    pub fn create(&mut self, record: ImageRecord) -> Result<(), StoreError> {
        let mut records = self.read_current()?;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(StoreError::DuplicateId(record.id().clone()));
        }

        let id = record.id().clone();
        records.insert(0, record);
        self.save_all(&records)?;

        info!(%id, count = records.len(), "record created");
        Ok(())
    }

    /// Remove the record with `id`, returning it.
    pub fn delete(&mut self, id: &RecordId) -> Result<ImageRecord, StoreError> {
        let mut records = self.read_current()?;
        let index = position(&records, id)?;

        let removed = records.remove(index);
        self.save_all(&records)?;

        info!(%id, count = records.len(), "record deleted");
        Ok(removed)
    }

    /// Replace the record with `id` by `replacement`, keeping its position.
    ///
    /// The replacement may carry a new id as long as it does not collide
    /// with another record.
    pub fn update(&mut self, id: &RecordId, replacement: ImageRecord) -> Result<(), StoreError> {
        let mut records = self.read_current()?;
        let index = position(&records, id)?;

        records[index] = replacement;
        self.save_all(&records)?;

        info!(%id, "record updated");
        Ok(())
    }

    fn read_current(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let location = self.backend.describe();
        let bytes = self.backend.read().map_err(|source| StoreError::Io {
            location: location.clone(),
            op: "read",
            source,
        })?;

        match bytes {
            None => Ok(Vec::new()),
            Some(bytes) => {
                codec::decode(&bytes).map_err(|source| StoreError::Corrupt { location, source })
            }
        }
    }
}

fn position(records: &[ImageRecord], id: &RecordId) -> Result<usize, StoreError> {
    records
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| StoreError::NotFound(id.clone()))
}

fn ensure_unique(records: &[ImageRecord]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id()) {
            return Err(StoreError::DuplicateId(record.id().clone()));
        }
    }
    Ok(())
}
