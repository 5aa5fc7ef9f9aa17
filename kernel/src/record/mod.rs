// Image Records
//
// The durable unit of the picker: encoded image bytes plus the
// metadata needed to order and address them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod codec;
pub mod ids;

pub use codec::{decode, encode, DecodeError, FORMAT_VERSION};
pub use ids::{Clock, FixedClock, IdGenerator, SequentialIds, SystemClock, UuidGenerator};

/// Stable identifier for a record.
///
/// Never reused. The only key used to locate, replace or remove a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// One captured or selected image.
///
/// Records are immutable values. Replacing one means writing a new
/// record under the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    id: RecordId,
    created_at: DateTime<Utc>,
    #[serde(with = "hex")]
    payload: Vec<u8>,
}

impl ImageRecord {
    pub fn new(id: RecordId, created_at: DateTime<Utc>, payload: Vec<u8>) -> Self {
        Self {
            id,
            created_at,
            payload,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Encoded image content.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Mints records from encoded bytes using injected id and time sources.
pub struct RecordFactory {
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl RecordFactory {
    pub fn new<G, C>(ids: G, clock: C) -> Self
    where
        G: IdGenerator + 'static,
        C: Clock + 'static,
    {
        Self {
            ids: Box::new(ids),
            clock: Box::new(clock),
        }
    }

    /// Random UUIDs and wall-clock time.
    pub fn system() -> Self {
        Self::new(UuidGenerator, SystemClock)
    }

    pub fn make(&mut self, payload: Vec<u8>) -> ImageRecord {
        ImageRecord::new(self.ids.next_id(), self.clock.now(), payload)
    }

    /// New record value for an existing id, stamped now.
    pub fn replace(&self, id: RecordId, payload: Vec<u8>) -> ImageRecord {
        ImageRecord::new(id, self.clock.now(), payload)
    }
}

impl std::fmt::Debug for RecordFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordFactory").finish_non_exhaustive()
    }
}
