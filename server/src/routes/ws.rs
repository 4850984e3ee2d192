//! WebSocket handler — the session coordinator.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID and enters a `select!` loop:
//! - Inbound client envelopes → decode + dispatch by message type
//! - Broadcast messages from room peers → forward to the client
//!
//! Handler functions validate, mutate room state under the room's lock, and
//! build message batches while still holding it; all sending happens after
//! the lock is released. Direct replies to the requester are returned up to
//! the dispatch loop, broadcasts ride each recipient's per-connection
//! channel.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register the connection's outbound channel
//! 2. Client sends envelopes → dispatch → reply and/or broadcast
//! 3. Close → mark the bound player disconnected, keep their seat

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::envelope::{self, ClientMsg, ErrorCode, MoveAction, ServerMsg};
use crate::services::game::{self, GameError};
use crate::services::room::{self, RoomError, RoomStatus};
use crate::state::{now_ms, AppState};
use crate::views;

/// Per-connection outbound queue depth.
const OUTBOUND_BUFFER: usize = 256;

// =============================================================================
// UPGRADE + CONNECTION
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();

    // Channel peers use to reach this client.
    let (tx, mut rx) = mpsc::channel::<ServerMsg>(OUTBOUND_BUFFER);
    state.links.write().await.senders.insert(conn_id, tx);
    info!(%conn_id, "ws: client connected");

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let Some(Ok(msg)) = inbound else { break };
                match msg {
                    Message::Text(text) => {
                        for reply in process_inbound_text(&state, conn_id, &text).await {
                            let _ = send_msg(&mut socket, conn_id, &reply).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(outbound) = rx.recv() => {
                if send_msg(&mut socket, conn_id, &outbound).await.is_err() {
                    break;
                }
            }
        }
    }

    handle_disconnect(&state, conn_id).await;
    info!(%conn_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and process one inbound text frame, returning the direct replies
/// for the sender. Broadcasts to room members are dispatched internally.
///
/// Kept free of socket concerns so tests can drive the whole coordinator
/// through it. Handler panics are caught here: the client gets a
/// `SERVER_ERROR` envelope and the connection stays open.
pub(crate) async fn process_inbound_text(state: &AppState, conn_id: Uuid, text: &str) -> Vec<ServerMsg> {
    let msg = match envelope::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: undecodable envelope");
            return vec![ServerMsg::error_from(&e)];
        }
    };

    let dispatched = std::panic::AssertUnwindSafe(dispatch(state, conn_id, msg))
        .catch_unwind()
        .await;
    match dispatched {
        Ok(Ok(replies)) => replies,
        Ok(Err(reply)) => vec![reply],
        Err(_) => {
            tracing::error!(%conn_id, "ws: handler panicked");
            vec![ServerMsg::server_error()]
        }
    }
}

async fn dispatch(state: &AppState, conn_id: Uuid, msg: ClientMsg) -> HandlerResult {
    let now = now_ms();
    match msg {
        ClientMsg::CreateRoom(p) => handle_create_room(state, conn_id, &p, now).await,
        ClientMsg::JoinRoom(p) => handle_join_room(state, conn_id, &p, now).await,
        ClientMsg::Reconnect(p) => handle_reconnect(state, conn_id, &p, now).await,
        ClientMsg::ToggleReady(p) => handle_toggle_ready(state, conn_id, &p, now).await,
        ClientMsg::StartGame(p) => handle_start_game(state, conn_id, &p, now).await,
        ClientMsg::PlayMove(p) => handle_play_move(state, conn_id, &p, now).await,
        ClientMsg::LeaveRoom(p) => handle_leave_room(state, conn_id, &p, now).await,
    }
}

type HandlerResult = Result<Vec<ServerMsg>, ServerMsg>;

async fn bound_player(state: &AppState, conn_id: Uuid) -> Option<Uuid> {
    state.links.read().await.conn_player.get(&conn_id).copied()
}

// =============================================================================
// LOBBY HANDLERS
// =============================================================================

async fn handle_create_room(
    state: &AppState,
    conn_id: Uuid,
    p: &envelope::CreateRoom,
    now: i64,
) -> HandlerResult {
    let (shared, player_id) = room::create_room(state, &p.nickname, p.max_players, p.player_id, now)
        .await
        .map_err(|e| ServerMsg::error_from(&e))?;
    state.links.write().await.bind(conn_id, player_id);

    let room = shared.lock().await;
    Ok(vec![views::full_state(&room, player_id)])
}

async fn handle_join_room(
    state: &AppState,
    conn_id: Uuid,
    p: &envelope::JoinRoom,
    now: i64,
) -> HandlerResult {
    let (shared, player_id) = room::join_room(state, &p.room_id, &p.nickname, p.player_id, now)
        .await
        .map_err(|e| ServerMsg::error_from(&e))?;
    state.links.write().await.bind(conn_id, player_id);

    let (reply, batch) = {
        let mut room = shared.lock().await;
        if let Some(player) = room.player_mut(player_id) {
            player.connected = true;
        }
        (views::full_state(&room, player_id), views::room_update_batch(&room))
    };
    state.send_many(batch).await;
    Ok(vec![reply])
}

async fn handle_reconnect(
    state: &AppState,
    conn_id: Uuid,
    p: &envelope::Reconnect,
    now: i64,
) -> HandlerResult {
    let shared = state
        .room(&p.last_room_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotFound(p.last_room_id.clone())))?;

    let (reply, batch) = {
        let mut room = shared.lock().await;
        let Some(player) = room.player_mut(p.player_id) else {
            return Err(ServerMsg::error_from(&RoomError::NotInRoom(p.last_room_id.clone())));
        };
        player.connected = true;
        room.touch(now);
        (views::full_state(&room, p.player_id), views::room_update_batch(&room))
    };

    let mut links = state.links.write().await;
    links.bind(conn_id, p.player_id);
    links.player_room.insert(p.player_id, p.last_room_id.clone());
    drop(links);

    info!(%conn_id, player_id = %p.player_id, room = %p.last_room_id, "ws: player reconnected");
    state.send_many(batch).await;
    Ok(vec![reply])
}

async fn handle_toggle_ready(
    state: &AppState,
    conn_id: Uuid,
    p: &envelope::ToggleReady,
    now: i64,
) -> HandlerResult {
    let player_id = bound_player(state, conn_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotInRoom(p.room_id.clone())))?;
    let shared = state
        .room(&p.room_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotFound(p.room_id.clone())))?;

    let batch = {
        let mut room = shared.lock().await;
        let Some(player) = room.player_mut(player_id) else {
            return Err(ServerMsg::error_from(&RoomError::NotInRoom(p.room_id.clone())));
        };
        player.ready = p.ready;
        room.touch(now);
        views::room_update_batch(&room)
    };
    state.send_many(batch).await;
    Ok(Vec::new())
}

async fn handle_start_game(
    state: &AppState,
    conn_id: Uuid,
    p: &envelope::StartGame,
    now: i64,
) -> HandlerResult {
    let player_id = bound_player(state, conn_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotInRoom(p.room_id.clone())))?;
    let shared = state
        .room(&p.room_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotFound(p.room_id.clone())))?;

    let batch = {
        let mut room = shared.lock().await;
        let mut rng = StdRng::from_os_rng();
        game::start_game(&mut room, &state.config, &mut rng, player_id, now)
            .map_err(|e| ServerMsg::error_from(&e))?;
        views::game_start_batch(&room)
    };
    state.send_many(batch).await;
    Ok(Vec::new())
}

// =============================================================================
// MOVE HANDLER
// =============================================================================

fn invalid_move(room_id: &str, err: &GameError) -> ServerMsg {
    ServerMsg::InvalidMove {
        room_id: room_id.to_string(),
        reason: err.error_code().to_string(),
        message: err.to_string(),
        word: match err {
            GameError::InvalidWord { word } => Some(word.clone()),
            _ => None,
        },
    }
}

async fn handle_play_move(
    state: &AppState,
    conn_id: Uuid,
    p: &envelope::PlayMove,
    now: i64,
) -> HandlerResult {
    let Some(player_id) = bound_player(state, conn_id).await else {
        return Ok(vec![invalid_move(&p.room_id, &GameError::NotInRoom)]);
    };
    let shared = state
        .room(&p.room_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotFound(p.room_id.clone())))?;

    let mut room = shared.lock().await;
    let mut rng = StdRng::from_os_rng();
    let verdict = game::play_move(
        &mut room,
        state.words.as_ref(),
        &state.config,
        &mut rng,
        player_id,
        p.action,
        &p.placements,
        &p.tile_ids_to_exchange,
        now,
    )
    .await;

    match verdict {
        Ok(outcome) => {
            let batch = views::move_batch(&room, &outcome, true);
            drop(room);
            state.send_many(batch).await;
            Ok(Vec::new())
        }
        Err(e) => {
            info!(%player_id, room = %p.room_id, reason = e.error_code(), "ws: move rejected");
            Ok(vec![invalid_move(&p.room_id, &e)])
        }
    }
}

// =============================================================================
// LEAVE + DISCONNECT
// =============================================================================

async fn handle_leave_room(
    state: &AppState,
    conn_id: Uuid,
    p: &envelope::LeaveRoom,
    now: i64,
) -> HandlerResult {
    let player_id = bound_player(state, conn_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotInRoom(p.room_id.clone())))?;
    let shared = state
        .room(&p.room_id)
        .await
        .ok_or_else(|| ServerMsg::error_from(&RoomError::NotFound(p.room_id.clone())))?;

    // A leaver who is on turn mid-game passes first so the game moves on.
    let pass_batch = {
        let mut room = shared.lock().await;
        let on_turn = room.status == RoomStatus::Playing
            && room.game.as_ref().is_some_and(|g| g.active_player_id == player_id);
        if on_turn {
            let mut rng = StdRng::from_os_rng();
            match game::play_move(
                &mut room,
                state.words.as_ref(),
                &state.config,
                &mut rng,
                player_id,
                MoveAction::Pass,
                &[],
                &[],
                now,
            )
            .await
            {
                Ok(outcome) => views::move_batch(&room, &outcome, true),
                Err(e) => {
                    warn!(%player_id, error = %e, "ws: forced pass on leave failed");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        }
    };
    state.send_many(pass_batch).await;

    let removed = room::remove_player(state, &p.room_id, player_id, now)
        .await
        .map_err(|e| ServerMsg::error_from(&e))?;

    let mut links = state.links.write().await;
    links.player_conn.remove(&player_id);
    links.conn_player.remove(&conn_id);
    drop(links);

    if let Some(new_host) = removed.new_host {
        info!(room = %p.room_id, %new_host, "ws: host role transferred on leave");
    }
    if let Some(shared) = removed.room {
        let batch = {
            let room = shared.lock().await;
            views::room_update_batch(&room)
        };
        state.send_many(batch).await;
    }
    Ok(Vec::new())
}

/// Mark the bound player disconnected and clear the connection's links.
/// The player keeps their seat for a later `reconnect`.
async fn handle_disconnect(state: &AppState, conn_id: Uuid) {
    let player_id = state.links.write().await.drop_conn(conn_id);
    let Some(player_id) = player_id else {
        return;
    };

    let room_code = state.links.read().await.player_room.get(&player_id).cloned();
    let Some(code) = room_code else {
        return;
    };
    let Some(shared) = state.room(&code).await else {
        return;
    };

    let batch = {
        let mut room = shared.lock().await;
        if let Some(player) = room.player_mut(player_id) {
            player.connected = false;
        }
        room.touch(now_ms());
        info!(%conn_id, %player_id, room = %code, "ws: player marked disconnected");
        views::room_update_batch(&room)
    };
    state.send_many(batch).await;
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_msg(socket: &mut WebSocket, conn_id: Uuid, msg: &ServerMsg) -> Result<(), ()> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };
    info!(%conn_id, kind = msg.kind(), "ws: send");
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
