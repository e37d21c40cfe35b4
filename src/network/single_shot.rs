//! Single-Shot Transport
//!
//! One request per transport message; the carrier's own framing gives the
//! length, so neither direction has a length field.
//!
//! ```text
//! request:  [code u16 LE][token: 8 ASCII bytes][payload...]
//! response: [status u16 LE][payload...]
//! ```

use tracing::debug;

use crate::network::dispatcher::{Dispatcher, Response, STATUS_INVALID};
use crate::network::protocol::ProtocolError;

/// Identity token length.
pub const TOKEN_LEN: usize = 8;

/// Code plus token.
pub const HEADER_LEN: usize = 2 + TOKEN_LEN;

/// A parsed single-shot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleShotRequest {
    /// Handler code.
    pub code: u16,
    /// Identity token.
    pub token: String,
    /// Handler payload.
    pub payload: Vec<u8>,
}

impl SingleShotRequest {
    /// Parse a request body.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        if body.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated { needed: HEADER_LEN, available: body.len() });
        }
        let token = &body[2..HEADER_LEN];
        if !token.is_ascii() {
            return Err(ProtocolError::InvalidToken);
        }

        Ok(Self {
            code: u16::from_le_bytes([body[0], body[1]]),
            token: String::from_utf8_lossy(token).into_owned(),
            payload: body[HEADER_LEN..].to_vec(),
        })
    }

    /// Build a request body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.code.to_le_bytes());
        let mut token = [b' '; TOKEN_LEN];
        let len = self.token.len().min(TOKEN_LEN);
        token[..len].copy_from_slice(&self.token.as_bytes()[..len]);
        out.extend_from_slice(&token);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Encode a response body.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + response.payload.len());
    out.extend_from_slice(&response.status.to_le_bytes());
    out.extend_from_slice(&response.payload);
    out
}

/// Handle one request body and return the response body.
pub async fn serve(dispatcher: &Dispatcher, body: &[u8]) -> Vec<u8> {
    let response = match SingleShotRequest::parse(body) {
        Ok(request) => dispatcher.dispatch(&request.token, request.code, request.payload).await,
        Err(err) => {
            debug!("Rejecting single-shot body: {}", err);
            Response::status(STATUS_INVALID)
        }
    };
    encode_response(&response)
}
