//! Handler Registry
//!
//! Routes decoded `(code, payload)` messages to async handlers. Every
//! handler result is normalized into a [`Response`] carrying a status code
//! and a payload; unknown codes answer status 1.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use tracing::debug;

use crate::game::player::{PlayerHandle, PlayerRegistry};

/// Status for success.
pub const STATUS_OK: u16 = 0;

/// Status for an unknown code or a generic failure.
pub const STATUS_INVALID: u16 = 1;

/// Normalized handler result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Status code (0 on success).
    pub status: u16,
    /// Response payload.
    pub payload: Vec<u8>,
}

impl Response {
    /// Status 0, empty payload.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Given status, empty payload.
    pub fn status(status: u16) -> Self {
        Self { status, payload: Vec::new() }
    }

    /// Status 0 with a payload.
    pub fn data(payload: Vec<u8>) -> Self {
        Self { status: STATUS_OK, payload }
    }

    /// Explicit status and payload.
    pub fn new(status: u16, payload: Vec<u8>) -> Self {
        Self { status, payload }
    }
}

impl From<()> for Response {
    fn from(_: ()) -> Self {
        Response::ok()
    }
}

impl From<u16> for Response {
    fn from(status: u16) -> Self {
        Response::status(status)
    }
}

impl From<Vec<u8>> for Response {
    fn from(payload: Vec<u8>) -> Self {
        Response::data(payload)
    }
}

impl<T, E> From<Result<T, E>> for Response
where
    T: Into<Response>,
    E: Into<Response>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => err.into(),
        }
    }
}

/// Input handed to a handler.
pub struct Request {
    /// Player resolved from the identity token.
    pub player: PlayerHandle,
    /// Raw payload.
    pub payload: Vec<u8>,
}

type HandlerFn = dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync + 'static;

/// Code-to-handler routing table.
pub struct Dispatcher {
    players: Arc<PlayerRegistry>,
    handlers: BTreeMap<u16, Box<HandlerFn>>,
}

impl Dispatcher {
    /// Create a dispatcher resolving identities through `players`.
    pub fn new(players: Arc<PlayerRegistry>) -> Self {
        Self {
            players,
            handlers: BTreeMap::new(),
        }
    }

    /// Register `handler` for `code`, replacing any previous one.
    pub fn register<F, Fut, R>(&mut self, code: u16, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Response>,
    {
        self.handlers.insert(code, Box::new(move |request| {
            let fut = handler(request);
            Box::pin(async move { fut.await.into() })
        }));
    }

    /// True if a handler is registered for `code`.
    pub fn handles(&self, code: u16) -> bool {
        self.handlers.contains_key(&code)
    }

    /// Player registry used for identity resolution.
    pub fn players(&self) -> &Arc<PlayerRegistry> {
        &self.players
    }

    /// Resolve the player for `token` and run the handler for `code`.
    pub async fn dispatch(&self, token: &str, code: u16, payload: Vec<u8>) -> Response {
        debug!("Request from {}: code={} payload={}", token, code, hex::encode(&payload));

        // Every token that reaches the server is registered, routable or not
        let player = self.players.get_or_create(token).await;

        let handler = match self.handlers.get(&code) {
            Some(handler) => handler,
            None => {
                debug!("No handler for code {} from {}", code, token);
                return Response::status(STATUS_INVALID);
            }
        };

        let response = handler(Request { player, payload }).await;

        debug!("Response to {}: status={} len={}", token, response.status, response.payload.len());
        response
    }
}
