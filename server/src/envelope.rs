//! Envelope — the `{type, payload}` message vocabulary.
//!
//! DESIGN
//! ======
//! The wire carries JSON envelopes with a string `type` and an object
//! `payload`. Inbound text is decoded in two stages at the coordinator
//! boundary: first into a [`RawEnvelope`], then the payload into the typed
//! struct for that message type. Unrecognized types are `UNKNOWN_TYPE`,
//! malformed payloads `BAD_PAYLOAD`; game state is never touched by either.
//! Outbound messages serialize straight from [`ServerMsg`], which owns the
//! adjacent `{type, payload}` tagging.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use engine::rules::Placement;
use engine::tile::TileId;

use crate::services::game::MoveRecord;
use crate::views::{GameView, PlayerStatsView, RoomView};

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable uppercase code attached to every surfaced error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

/// Inbound decode failure.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    BadPayload(String),
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

impl ErrorCode for DecodeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadPayload(_) => "BAD_PAYLOAD",
            Self::UnknownType(_) => "UNKNOWN_TYPE",
        }
    }
}

// =============================================================================
// INBOUND
// =============================================================================

/// First decode stage: type string plus untyped payload.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// What a `playMove` envelope asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveAction {
    Play,
    Pass,
    Exchange,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub nickname: String,
    #[serde(default)]
    pub max_players: Option<u8>,
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: String,
    pub nickname: String,
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconnect {
    pub player_id: Uuid,
    pub last_room_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReady {
    pub room_id: String,
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    pub room_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayMove {
    pub room_id: String,
    pub action: MoveAction,
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub tile_ids_to_exchange: Vec<TileId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoom {
    pub room_id: String,
}

/// Every message a client can send, decoded and typed.
#[derive(Debug, Clone)]
pub enum ClientMsg {
    CreateRoom(CreateRoom),
    JoinRoom(JoinRoom),
    Reconnect(Reconnect),
    ToggleReady(ToggleReady),
    StartGame(StartGame),
    PlayMove(PlayMove),
    LeaveRoom(LeaveRoom),
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// `BadPayload` for malformed JSON or a payload that fails shape
/// validation; `UnknownType` for a type string this server does not speak.
pub fn decode(text: &str) -> Result<ClientMsg, DecodeError> {
    let raw: RawEnvelope =
        serde_json::from_str(text).map_err(|e| DecodeError::BadPayload(e.to_string()))?;

    fn payload<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, DecodeError> {
        serde_json::from_value(value).map_err(|e| DecodeError::BadPayload(e.to_string()))
    }

    match raw.kind.as_str() {
        "createRoom" => Ok(ClientMsg::CreateRoom(payload(raw.payload)?)),
        "joinRoom" => Ok(ClientMsg::JoinRoom(payload(raw.payload)?)),
        "reconnect" => Ok(ClientMsg::Reconnect(payload(raw.payload)?)),
        "toggleReady" => Ok(ClientMsg::ToggleReady(payload(raw.payload)?)),
        "startGame" => Ok(ClientMsg::StartGame(payload(raw.payload)?)),
        "playMove" => Ok(ClientMsg::PlayMove(payload(raw.payload)?)),
        "leaveRoom" => Ok(ClientMsg::LeaveRoom(payload(raw.payload)?)),
        _ => Err(DecodeError::UnknownType(raw.kind)),
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Every message the server can emit. Serializes as `{type, payload}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMsg {
    #[serde(rename_all = "camelCase")]
    FullState {
        room: RoomView,
        #[serde(skip_serializing_if = "Option::is_none")]
        game_state: Option<GameView>,
    },
    #[serde(rename_all = "camelCase")]
    RoomUpdate { room: RoomView },
    #[serde(rename_all = "camelCase")]
    GameState { room_id: String, game_state: GameView },
    #[serde(rename_all = "camelCase")]
    TurnUpdate {
        room_id: String,
        active_player_id: Uuid,
        turn_ends_at: i64,
        version: u64,
    },
    #[serde(rename_all = "camelCase")]
    MoveAccepted {
        room_id: String,
        #[serde(rename = "move")]
        record: MoveRecord,
    },
    #[serde(rename_all = "camelCase")]
    InvalidMove {
        room_id: String,
        reason: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        word: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GameEnded {
        room_id: String,
        scores: std::collections::HashMap<Uuid, i32>,
        stats_by_player: std::collections::HashMap<Uuid, PlayerStatsView>,
        winner_ids: Vec<Uuid>,
    },
    #[serde(rename_all = "camelCase")]
    Error { code: String, message: String },
}

impl ServerMsg {
    /// Build an `error` envelope from any coded error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error { code: err.error_code().to_string(), message: err.to_string() }
    }

    /// Catch-all `error` envelope for faults that are not the client's
    /// doing. Details stay in the server log.
    #[must_use]
    pub fn server_error() -> Self {
        Self::Error { code: "SERVER_ERROR".to_string(), message: "internal server error".to_string() }
    }

    /// Message type string, for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FullState { .. } => "fullState",
            Self::RoomUpdate { .. } => "roomUpdate",
            Self::GameState { .. } => "gameState",
            Self::TurnUpdate { .. } => "turnUpdate",
            Self::MoveAccepted { .. } => "moveAccepted",
            Self::InvalidMove { .. } => "invalidMove",
            Self::GameEnded { .. } => "gameEnded",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
