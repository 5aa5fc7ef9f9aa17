// Store Worker
//
// Runs a PersistenceStore on its own thread and serializes access to it
// through a command queue. Async callers never block on file I/O, and
// mutations reach the backing blob in exactly the order they were sent.
//
// Use it from async or UI event loops that must not block on disk. The
// synchronous `Gallery` and the one-shot CLI drive a `PersistenceStore`
// directly because their caller is already allowed to block.

use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::record::{ImageRecord, RecordId};
use crate::store::{Backend, PersistenceStore, StoreError};

/// Queue depth before senders start waiting.
const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store worker has shut down")]
    Closed,
}

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

enum Command {
    LoadAll(Reply<Vec<ImageRecord>>),
    SaveAll(Vec<ImageRecord>, Reply<()>),
    Create(ImageRecord, Reply<()>),
    Delete(RecordId, Reply<ImageRecord>),
    Update(RecordId, ImageRecord, Reply<()>),
}

/// Cloneable handle to a store owned by a worker thread.
///
/// The worker exits once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Command>,
}

impl StoreHandle {
    /// Move `store` onto a dedicated thread.
    pub fn spawn<B>(store: PersistenceStore<B>) -> (Self, JoinHandle<()>)
    where
        B: Backend + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let join = thread::spawn(move || run(store, rx));
        (Self { tx }, join)
    }

    pub async fn load_all(&self) -> Result<Vec<ImageRecord>, WorkerError> {
        self.request(Command::LoadAll).await
    }

    pub async fn save_all(&self, records: Vec<ImageRecord>) -> Result<(), WorkerError> {
        self.request(|reply| Command::SaveAll(records, reply)).await
    }

    pub async fn create(&self, record: ImageRecord) -> Result<(), WorkerError> {
        self.request(|reply| Command::Create(record, reply)).await
    }

    pub async fn delete(&self, id: RecordId) -> Result<ImageRecord, WorkerError> {
        self.request(|reply| Command::Delete(id, reply)).await
    }

    pub async fn update(&self, id: RecordId, replacement: ImageRecord) -> Result<(), WorkerError> {
        self.request(|reply| Command::Update(id, replacement, reply))
            .await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| WorkerError::Closed)?;
        let result = response.await.map_err(|_| WorkerError::Closed)?;
        Ok(result?)
    }
}

fn run<B: Backend>(mut store: PersistenceStore<B>, mut rx: mpsc::Receiver<Command>) {
    debug!("store worker started");

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::LoadAll(reply) => respond(reply, store.load_all()),
            Command::SaveAll(records, reply) => respond(reply, store.save_all(&records)),
            Command::Create(record, reply) => respond(reply, store.create(record)),
            Command::Delete(id, reply) => respond(reply, store.delete(&id)),
            Command::Update(id, replacement, reply) => {
                respond(reply, store.update(&id, replacement))
            }
        }
    }

    debug!("store worker stopped");
}

fn respond<T>(reply: Reply<T>, result: Result<T, StoreError>) {
    if let Err(Err(e)) = reply.send(result) {
        // The caller gave up waiting; the failure must still be visible.
        warn!(error = %e, "store operation failed with no one waiting");
    }
}
