//! Clipboard stream framing: text to base64 blobs and back.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use thiserror::Error;

pub const TEXT_PLAIN: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("invalid base64 in clipboard blob")]
    Decode,

    #[error("clipboard stream exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("clipboard text is not valid UTF-8")]
    InvalidUtf8,
}

/// Whether a stream mimetype is plain text (parameters such as charset allowed)
pub fn is_plain_text(mime: &str) -> bool {
    mime.split(';')
        .next()
        .is_some_and(|base| base.trim().eq_ignore_ascii_case(TEXT_PLAIN))
}

/// Split `text` into base64 blobs of at most `chunk_chars` characters.
///
/// Each blob decodes on its own. `chunk_chars` is rounded down to a
/// multiple of 4 (minimum 4).
pub fn encode_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let raw_chunk = (chunk_chars / 4).max(1) * 3;
    text.as_bytes()
        .chunks(raw_chunk)
        .map(|chunk| STANDARD.encode(chunk))
        .collect()
}

struct PendingStream {
    bytes: Vec<u8>,
    error: Option<StreamError>,
}

/// Reassembles inbound clipboard streams.
///
/// Blobs are decoded to bytes as they arrive; UTF-8 decoding happens once in
/// [`StreamAssembler::finish`] so characters split across blobs survive.
pub struct StreamAssembler {
    max_bytes: usize,
    streams: HashMap<u32, PendingStream>,
}

impl StreamAssembler {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            streams: HashMap::new(),
        }
    }

    /// Open a stream. Returns false (and ignores the stream) for non-text mimetypes.
    pub fn begin(&mut self, stream: u32, mime: &str) -> bool {
        if !is_plain_text(mime) {
            log::debug!("Ignoring clipboard stream {} with mimetype {}", stream, mime);
            return false;
        }
        if self
            .streams
            .insert(
                stream,
                PendingStream {
                    bytes: Vec::new(),
                    error: None,
                },
            )
            .is_some()
        {
            log::warn!("Clipboard stream {} restarted before its end marker", stream);
        }
        true
    }

    /// Append one blob. Blobs for unknown streams are dropped.
    pub fn append(&mut self, stream: u32, data: &str) {
        let max_bytes = self.max_bytes;
        let Some(pending) = self.streams.get_mut(&stream) else {
            return;
        };
        if pending.error.is_some() {
            return;
        }
        match STANDARD.decode(data.trim()) {
            Ok(bytes) => {
                if pending.bytes.len() + bytes.len() > max_bytes {
                    pending.error = Some(StreamError::TooLarge { limit: max_bytes });
                    pending.bytes = Vec::new();
                } else {
                    pending.bytes.extend_from_slice(&bytes);
                }
            }
            Err(_) => pending.error = Some(StreamError::Decode),
        }
    }

    /// Close a stream. `None` if it was never opened (or not text).
    pub fn finish(&mut self, stream: u32) -> Option<Result<String, StreamError>> {
        let pending = self.streams.remove(&stream)?;
        if let Some(err) = pending.error {
            return Some(Err(err));
        }
        Some(String::from_utf8(pending.bytes).map_err(|_| StreamError::InvalidUtf8))
    }

    /// Drop every open stream
    pub fn clear(&mut self) {
        self.streams.clear();
    }

    pub fn open_streams(&self) -> usize {
        self.streams.len()
    }
}
