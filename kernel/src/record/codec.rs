// Record Codec
//
// Serializes a whole ordered sequence of records as one self-describing
// blob. The blob is a versioned JSON envelope:
//
//   { "version": 1, "records": [ { "id": .., "created_at": .., "payload": "ffd8.." }, .. ] }
//
// Payload bytes are hex encoded.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{ImageRecord, RecordId};

/// Envelope version written by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed record data: {0}")]
    Malformed(String),

    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("duplicate record id `{0}`")]
    DuplicateId(RecordId),
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    records: &'a [ImageRecord],
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    records: Vec<ImageRecord>,
}

/// Encode an ordered sequence of records.
///
/// Deterministic: equal sequences always produce identical bytes.
/// The envelope only has string keys, so serde_json cannot reject it;
/// the error type is kept so callers never panic on a broken invariant.
pub fn encode(records: &[ImageRecord]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&EnvelopeRef {
        version: FORMAT_VERSION,
        records,
    })
}

/// Decode a sequence previously produced by [`encode`].
///
/// Either the whole sequence decodes or nothing does; there is no
/// partial result.
pub fn decode(bytes: &[u8]) -> Result<Vec<ImageRecord>, DecodeError> {
    let header: Header =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if header.version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: header.version,
            supported: FORMAT_VERSION,
        });
    }

    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let mut seen = HashSet::with_capacity(envelope.records.len());
    for record in &envelope.records {
        if !seen.insert(record.id()) {
            return Err(DecodeError::DuplicateId(record.id().clone()));
        }
    }

    Ok(envelope.records)
}
