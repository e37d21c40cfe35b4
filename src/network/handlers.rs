//! Game Handlers
//!
//! Binds the Join / GetState / Attack / Defend codes to the lobby manager.
//! Lock order is always player, then lobby; the player lock is released
//! before the lobby lock is taken. Attack and Defend check phase, turn
//! and opponent under the lobby lock before parsing their payloads.

use std::sync::Arc;

use crate::game::lobby::{LobbyHandle, LobbyManager};
use crate::game::player::{PlayerHandle, PlayerId};
use crate::game::rules::GameError;
use crate::game::state::LobbyStatus;
use crate::network::dispatcher::{Dispatcher, Request, Response};
use crate::network::protocol::{self, HandlerCode, ProtocolError};

impl From<GameError> for Response {
    fn from(err: GameError) -> Self {
        Response::status(err.status_code())
    }
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Response::status(err.status_code())
    }
}

/// Register all game handlers on `dispatcher`.
pub fn register_game_handlers(dispatcher: &mut Dispatcher, lobbies: Arc<LobbyManager>) {
    let manager = lobbies.clone();
    dispatcher.register(HandlerCode::Join.code(), move |req: Request| {
        let manager = manager.clone();
        async move {
            let nickname = protocol::parse_nickname(&req.payload);
            manager.join(&req.player, nickname).await;
        }
    });

    let manager = lobbies.clone();
    dispatcher.register(HandlerCode::GetState.code(), move |req: Request| {
        let manager = manager.clone();
        async move {
            let (player_id, lobby) = resolve(&manager, &req.player).await?;
            let snapshot = lobby.lock().await.snapshot_for(&player_id);
            Ok::<_, GameError>(snapshot.to_bytes())
        }
    });

    let manager = lobbies.clone();
    dispatcher.register(HandlerCode::Attack.code(), move |req: Request| {
        let manager = manager.clone();
        async move {
            let (player_id, handle) = match resolve(&manager, &req.player).await {
                Ok(found) => found,
                Err(err) => return Response::from(err),
            };
            let mut lobby = handle.lock().await;
            // Phase and turn are judged before the payload is read
            if let Err(err) = lobby.check_turn(LobbyStatus::Move, &player_id) {
                return Response::from(err);
            }
            let cards = match protocol::parse_attack(&req.payload) {
                Ok(cards) => cards,
                Err(err) => return Response::from(err),
            };
            Response::from(lobby.attack(&player_id, &cards))
        }
    });

    let manager = lobbies;
    dispatcher.register(HandlerCode::Defend.code(), move |req: Request| {
        let manager = manager.clone();
        async move {
            let (player_id, handle) = match resolve(&manager, &req.player).await {
                Ok(found) => found,
                Err(err) => return Response::from(err),
            };
            let mut lobby = handle.lock().await;
            if let Err(err) = lobby.check_turn(LobbyStatus::Def, &player_id) {
                return Response::from(err);
            }
            let action = match protocol::parse_defend(&req.payload) {
                Ok(action) => action,
                Err(err) => return Response::from(err),
            };
            Response::from(lobby.defend(&player_id, action))
        }
    });
}

/// Player id and the lobby the player last joined.
async fn resolve(
    lobbies: &LobbyManager,
    player: &PlayerHandle,
) -> Result<(PlayerId, LobbyHandle), GameError> {
    let player_id = player.read().await.id.clone();
    let lobby = lobbies.lobby_of(player).await.ok_or(GameError::NotInLobby)?;
    Ok((player_id, lobby))
}
