//! Network Layer
//!
//! Framing, routing and listeners. Game state is only touched through the
//! handlers in `handlers`, which go through `game/`.

pub mod codec;
pub mod dispatcher;
pub mod protocol;
pub mod handlers;
pub mod single_shot;
pub mod server;

pub use codec::{encode_frame, Frame, FrameDecoder, FrameError, LengthWidth};
pub use dispatcher::{Dispatcher, Request, Response};
pub use protocol::{HandlerCode, ProtocolError};
pub use handlers::register_game_handlers;
pub use server::{GameServer, ServerConfig, GameServerError};
