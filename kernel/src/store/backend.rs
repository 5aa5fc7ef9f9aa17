// Storage Backends
//
// Where the encoded record blob lives. The store only ever reads the
// whole blob or replaces the whole blob.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Durable home of one encoded blob.
///
/// Properties required from implementations:
/// - `read` returns `None` when nothing was ever written
/// - `write_atomic` either replaces the blob entirely or leaves the
///   previous blob readable; a torn write is never observable
/// - a successful `write_atomic` survives process termination
pub trait Backend: Send {
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    fn write_atomic(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Human-readable location, used in errors and logs.
    fn describe(&self) -> String;
}

/// A single file inside an application-private directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Back the store with `dir/filename`.
    ///
    /// `filename` must be a bare file name. Returns `None` otherwise.
    pub fn in_dir(dir: impl AsRef<Path>, filename: &str) -> Option<Self> {
        let candidate = Path::new(filename);
        let bare = candidate.file_name().map(|n| n == candidate.as_os_str()) == Some(true);
        if !bare || filename.ends_with(".tmp") {
            return None;
        }
        Some(Self {
            path: dir.as_ref().join(filename),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Staging file used by `write_atomic`.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl Backend for FileBackend {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_atomic(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        sync_parent(&self.path)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "backing file replaced");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Make the rename itself durable.
#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// In-process backend.
///
/// Clones share the same contents, so a test can keep one clone to
/// inspect or corrupt what the store wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    bytes: Option<Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with an I/O error (or stop failing).
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Overwrite the stored blob directly, bypassing the store.
    pub fn set_raw(&self, bytes: Vec<u8>) {
        self.lock().bytes = Some(bytes);
    }

    pub fn raw(&self) -> Option<Vec<u8>> {
        self.lock().bytes.clone()
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // State is plain data; a poisoned lock still holds a usable value.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.lock().bytes.clone())
    }

    fn write_atomic(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        state.bytes = Some(bytes.to_vec());
        state.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
