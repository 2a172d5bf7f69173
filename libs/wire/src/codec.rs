//! Encoding and decoding of the two message shapes

use bytes::Bytes;
use prost::Message;
use thiserror::Error;
use types::directory::Directory;
use types::errors::{PipelineError, RecordError};
use types::record::{flatten_batch, unflatten_batch, UpdateRecord};

use crate::messages::{DirectoryMessage, UpdateMessage};

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Directory(Directory),
    Update(Vec<UpdateRecord>),
}

impl WireMessage {
    pub fn label(&self) -> &'static str {
        match self {
            WireMessage::Directory(_) => "directory",
            WireMessage::Update(_) => "update",
        }
    }
}

/// Payload-level decode failures. All of them are transient: the frame is
/// dropped and the stream continues.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("corrupt payload: {0}")]
    Corrupt(#[from] prost::DecodeError),

    #[error("malformed update: {0}")]
    Malformed(#[from] RecordError),

    #[error("symbol index {index} outside directory of {len}")]
    UnknownSymbol { index: u32, len: usize },
}

impl From<DecodeError> for PipelineError {
    fn from(err: DecodeError) -> Self {
        PipelineError::TransientDecode(err.to_string())
    }
}

pub fn encode_directory(directory: &Directory) -> Bytes {
    let (symbols, names) = directory.to_columns();
    Bytes::from(DirectoryMessage { symbols, names }.encode_to_vec())
}

pub fn encode_update(records: &[UpdateRecord]) -> Bytes {
    Bytes::from(
        UpdateMessage {
            data: flatten_batch(records),
        }
        .encode_to_vec(),
    )
}

pub fn encode(message: &WireMessage) -> Bytes {
    match message {
        WireMessage::Directory(directory) => encode_directory(directory),
        WireMessage::Update(records) => encode_update(records),
    }
}

pub fn decode_directory(payload: &[u8]) -> Result<Directory, DecodeError> {
    let msg = DirectoryMessage::decode(payload)?;
    Ok(Directory::from_columns(msg.symbols, msg.names))
}

pub fn decode_update(payload: &[u8]) -> Result<Vec<UpdateRecord>, DecodeError> {
    let msg = UpdateMessage::decode(payload)?;
    Ok(unflatten_batch(&msg.data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::directory::DirectoryEntry;

    fn directory() -> Directory {
        Directory::new(vec![
            DirectoryEntry {
                ticker: "AAPL".to_string(),
                name: "Apple Inc.".to_string(),
            },
            DirectoryEntry {
                ticker: "MSFT".to_string(),
                name: "Microsoft Corporation".to_string(),
            },
        ])
    }

    fn record(index: u32, last: f64) -> UpdateRecord {
        UpdateRecord {
            symbol_index: index,
            last,
            change: 0.5,
            change_pct: 0.25,
            high: last + 1.0,
            low: last - 1.0,
            volume: 4_200,
        }
    }

    #[test]
    fn test_directory_roundtrip() {
        let bytes = encode_directory(&directory());
        assert_eq!(decode_directory(&bytes).unwrap(), directory());
    }

    #[test]
    fn test_update_roundtrip_keeps_order() {
        let batch = vec![record(1, 410.0), record(0, 190.0)];
        let bytes = encode(&WireMessage::Update(batch.clone()));
        assert_eq!(decode_update(&bytes).unwrap(), batch);
    }

    #[test]
    fn test_update_payload_size() {
        let bytes = encode_update(&[record(0, 1.0), record(1, 2.0)]);
        // 1 key byte + 1 length byte + 14 doubles
        assert_eq!(bytes.len(), 2 + 14 * 8);
    }

    #[test]
    fn test_empty_update_is_empty_frame() {
        let bytes = encode_update(&[]);
        assert!(bytes.is_empty());
        assert!(decode_update(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_frame_is_corrupt() {
        let bytes = encode_update(&[record(0, 1.0)]);
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(decode_update(cut), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_partial_record_is_malformed() {
        let bytes = UpdateMessage {
            data: vec![0.0, 1.0, 0.0],
        }
        .encode_to_vec();
        assert!(matches!(
            decode_update(&bytes),
            Err(DecodeError::Malformed(RecordError::FieldCount { .. }))
        ));
    }

    #[test]
    fn test_decode_error_maps_to_transient() {
        let err = decode_update(&[0xff, 0xff, 0xff]).unwrap_err();
        let pipeline: PipelineError = err.into();
        assert!(matches!(pipeline, PipelineError::TransientDecode(_)));
        assert!(!pipeline.is_fatal());
    }
}
