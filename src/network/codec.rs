//! Frame Codec
//!
//! Incremental decoder for the length-prefixed stream protocol.
//!
//! ```text
//! ┌──────────────┬───────────────────────────┬─────────────────┐
//! │ code (u16 LE)│ length (u32 LE or u64 LE) │ payload[length] │
//! └──────────────┴───────────────────────────┴─────────────────┘
//! ```
//!
//! Chunks may carry any fraction of a frame, or several frames at once;
//! the decoder keeps its partial header/body between calls. Responses use
//! the same layout with the status code in place of the message code.

use thiserror::Error;

/// Default upper bound on a declared payload length.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Width of the length field. Each width is a distinct protocol version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthWidth {
    /// 4-byte length (canonical).
    #[default]
    Standard,
    /// 8-byte length (raw-socket variant).
    Wide,
}

impl LengthWidth {
    /// Bytes in the length field.
    pub const fn bytes(self) -> usize {
        match self {
            LengthWidth::Standard => 4,
            LengthWidth::Wide => 8,
        }
    }

    /// Total header size: code + length.
    pub const fn header_len(self) -> usize {
        2 + self.bytes()
    }
}

/// A complete decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message code (request) or status code (response).
    pub code: u16,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

/// Decoding errors. The connection cannot be resynchronized after one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Declared payload exceeds the configured bound.
    #[error("declared payload of {declared} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        /// Length from the header.
        declared: u64,
        /// Configured limit.
        max: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingHeader,
    AwaitingBody,
}

/// Per-connection incremental frame decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    width: LengthWidth,
    max_payload: usize,
    phase: Phase,
    header: [u8; 10],
    header_filled: usize,
    code: u16,
    body: Vec<u8>,
    body_len: usize,
}

impl FrameDecoder {
    /// Create a decoder.
    pub fn new(width: LengthWidth, max_payload: usize) -> Self {
        Self {
            width,
            max_payload,
            phase: Phase::AwaitingHeader,
            header: [0; 10],
            header_filled: 0,
            code: 0,
            body: Vec::new(),
            body_len: 0,
        }
    }

    /// Length-field width.
    pub fn width(&self) -> LengthWidth {
        self.width
    }

    /// True when no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::AwaitingHeader && self.header_filled == 0
    }

    /// Consume a chunk, appending every frame it completes to `frames` in
    /// order. Frames completed before a bad header are still appended.
    pub fn feed(&mut self, mut chunk: &[u8], frames: &mut Vec<Frame>) -> Result<(), FrameError> {
        loop {
            if self.phase == Phase::AwaitingHeader {
                let header_len = self.width.header_len();
                let take = (header_len - self.header_filled).min(chunk.len());
                self.header[self.header_filled..self.header_filled + take]
                    .copy_from_slice(&chunk[..take]);
                self.header_filled += take;
                chunk = &chunk[take..];

                if self.header_filled < header_len {
                    return Ok(());
                }
                self.begin_body()?;
            }

            let take = (self.body_len - self.body.len()).min(chunk.len());
            self.body.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];

            if self.body.len() < self.body_len {
                return Ok(());
            }

            frames.push(Frame {
                code: self.code,
                payload: std::mem::take(&mut self.body),
            });
            self.reset();

            if chunk.is_empty() {
                return Ok(());
            }
        }
    }

    fn begin_body(&mut self) -> Result<(), FrameError> {
        self.code = u16::from_le_bytes([self.header[0], self.header[1]]);
        let declared = match self.width {
            LengthWidth::Standard => {
                let mut len = [0u8; 4];
                len.copy_from_slice(&self.header[2..6]);
                u32::from_le_bytes(len) as u64
            }
            LengthWidth::Wide => {
                let mut len = [0u8; 8];
                len.copy_from_slice(&self.header[2..10]);
                u64::from_le_bytes(len)
            }
        };

        if declared > self.max_payload as u64 {
            return Err(FrameError::PayloadTooLarge { declared, max: self.max_payload });
        }

        self.body_len = declared as usize;
        self.body = Vec::with_capacity(self.body_len);
        self.phase = Phase::AwaitingBody;
        Ok(())
    }

    fn reset(&mut self) {
        self.phase = Phase::AwaitingHeader;
        self.header_filled = 0;
        self.code = 0;
        self.body_len = 0;
    }
}

/// Encode a frame with the given length width.
pub fn encode_frame(code: u16, payload: &[u8], width: LengthWidth) -> Vec<u8> {
    let mut out = Vec::with_capacity(width.header_len() + payload.len());
    out.extend_from_slice(&code.to_le_bytes());
    match width {
        LengthWidth::Standard => out.extend_from_slice(&(payload.len() as u32).to_le_bytes()),
        LengthWidth::Wide => out.extend_from_slice(&(payload.len() as u64).to_le_bytes()),
    }
    out.extend_from_slice(payload);
    out
}
