//! Per-connection decode state machine
//!
//! ```text
//!   AwaitingDirectory ──(valid directory frame)──▶ Streaming
//!          ▲                                          │
//!          └──────────────── reset() ◀────────────────┘
//! ```
//!
//! A corrupt frame never advances the state: a damaged first frame leaves
//! the session waiting for a directory, a damaged update is dropped.

use tracing::debug;

use crate::codec::{decode_directory, decode_update, DecodeError, WireMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingDirectory,
    Streaming,
}

/// Stateful decoder for one connection.
#[derive(Debug)]
pub struct DecodeSession {
    state: SessionState,
    directory_len: usize,
    frames_decoded: u64,
    frames_dropped: u64,
}

impl DecodeSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingDirectory,
            directory_len: 0,
            frames_decoded: 0,
            frames_dropped: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Decode the next frame according to its position on the connection.
    pub fn decode(&mut self, payload: &[u8]) -> Result<WireMessage, DecodeError> {
        let result = match self.state {
            SessionState::AwaitingDirectory => decode_directory(payload).map(|directory| {
                self.directory_len = directory.len();
                self.state = SessionState::Streaming;
                WireMessage::Directory(directory)
            }),
            SessionState::Streaming => self.decode_streaming(payload),
        };

        match &result {
            Ok(_) => self.frames_decoded += 1,
            Err(err) => {
                self.frames_dropped += 1;
                debug!(
                    state = ?self.state,
                    bytes = payload.len(),
                    error = %err,
                    "Dropping undecodable frame"
                );
            }
        }
        result
    }

    fn decode_streaming(&self, payload: &[u8]) -> Result<WireMessage, DecodeError> {
        let records = decode_update(payload)?;
        if let Some(bad) = records
            .iter()
            .find(|r| r.symbol_index as usize >= self.directory_len)
        {
            return Err(DecodeError::UnknownSymbol {
                index: bad.symbol_index,
                len: self.directory_len,
            });
        }
        Ok(WireMessage::Update(records))
    }

    /// Back to `AwaitingDirectory`; the next frame is treated as a directory.
    pub fn reset(&mut self) {
        self.state = SessionState::AwaitingDirectory;
        self.directory_len = 0;
    }

    /// Directory size of the current session, if one was received.
    pub fn directory_len(&self) -> Option<usize> {
        match self.state {
            SessionState::Streaming => Some(self.directory_len),
            SessionState::AwaitingDirectory => None,
        }
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}

impl Default for DecodeSession {
    fn default() -> Self {
        Self::new()
    }
}
