//! Client-facing snapshots of rooms and games.
//!
//! DESIGN
//! ======
//! Rooms and games are mutable server-side structures; the wire gets
//! immutable views built here. The one personalization rule: a player's
//! rack is visible only to that player, everyone else sees the count.
//! View batches are assembled while the caller holds the room lock and sent
//! after it is released.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use engine::tile::Tile;

use crate::envelope::ServerMsg;
use crate::services::game::{GameState, MoveOutcome, MoveRecord};
use crate::services::room::{Player, PlayerStats, Room, RoomStatus};

// =============================================================================
// VIEW TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsView {
    pub words_played: u32,
    pub best_word_score: u32,
    pub best_word: Option<String>,
    pub total_turns: u32,
    pub passes: u32,
}

impl From<&PlayerStats> for PlayerStatsView {
    fn from(stats: &PlayerStats) -> Self {
        Self {
            words_played: stats.words_played,
            best_word_score: stats.best_word_score,
            best_word: stats.best_word.clone(),
            total_turns: stats.total_turns,
            passes: stats.passes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: Uuid,
    pub nickname: String,
    pub connected: bool,
    pub ready: bool,
    pub score: i32,
    pub rack_size: usize,
    /// Populated only in the rack owner's personalized game state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rack: Option<Vec<Tile>>,
    pub stats: PlayerStatsView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub room_id: String,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub max_players: u8,
    pub players: Vec<PlayerView>,
}

/// One occupied board cell.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedCellView {
    pub x: u8,
    pub y: u8,
    pub tile_id: u32,
    pub letter: char,
    pub value: u32,
    pub joker: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub board: Vec<PlacedCellView>,
    pub bag_count: usize,
    pub active_player_id: Uuid,
    pub turn_ends_at: i64,
    pub turn_duration_ms: u64,
    pub consecutive_passes: u32,
    pub version: u64,
    pub started_at: i64,
    pub moves: Vec<MoveRecord>,
    pub players: Vec<PlayerView>,
}

// =============================================================================
// BUILDERS
// =============================================================================

fn player_view(player: &Player, with_rack: bool) -> PlayerView {
    PlayerView {
        id: player.id,
        nickname: player.nickname.clone(),
        connected: player.connected,
        ready: player.ready,
        score: player.score,
        rack_size: player.rack.len(),
        rack: with_rack.then(|| player.rack.clone()),
        stats: (&player.stats).into(),
    }
}

/// Public room summary — no racks.
#[must_use]
pub fn room_view(room: &Room) -> RoomView {
    RoomView {
        room_id: room.code.clone(),
        host_id: room.host_id,
        status: room.status,
        max_players: room.max_players,
        players: room.players.iter().map(|p| player_view(p, false)).collect(),
    }
}

/// Game snapshot personalized for `recipient`: only their rack is populated.
#[must_use]
pub fn game_view_for(room: &Room, game: &GameState, recipient: Option<Uuid>) -> GameView {
    let board = game
        .board
        .occupied()
        .map(|(coord, placed)| PlacedCellView {
            x: coord.x,
            y: coord.y,
            tile_id: placed.tile.id,
            letter: placed.letter,
            value: placed.tile.value,
            joker: placed.tile.joker,
        })
        .collect();

    GameView {
        board,
        bag_count: game.bag.len(),
        active_player_id: game.active_player_id,
        turn_ends_at: game.turn_ends_at,
        turn_duration_ms: game.turn_duration_ms,
        consecutive_passes: game.consecutive_passes,
        version: game.version,
        started_at: game.started_at,
        moves: game.moves.clone(),
        players: room
            .players
            .iter()
            .map(|p| player_view(p, recipient == Some(p.id)))
            .collect(),
    }
}

// =============================================================================
// MESSAGE BATCHES
// =============================================================================

/// Full snapshot for one requester: room summary plus their personalized
/// game state when a game is running.
#[must_use]
pub fn full_state(room: &Room, recipient: Uuid) -> ServerMsg {
    ServerMsg::FullState {
        room: room_view(room),
        game_state: room
            .game
            .as_ref()
            .map(|game| game_view_for(room, game, Some(recipient))),
    }
}

/// `roomUpdate` for every seat in the room.
#[must_use]
pub fn room_update_batch(room: &Room) -> Vec<(Uuid, ServerMsg)> {
    let msg = ServerMsg::RoomUpdate { room: room_view(room) };
    room.players.iter().map(|p| (p.id, msg.clone())).collect()
}

fn turn_update(room: &Room, game: &GameState) -> ServerMsg {
    ServerMsg::TurnUpdate {
        room_id: room.code.clone(),
        active_player_id: game.active_player_id,
        turn_ends_at: game.turn_ends_at,
        version: game.version,
    }
}

/// Everything broadcast after a game starts: the status change, each
/// player's personalized opening state, and the first turn pointer.
#[must_use]
pub fn game_start_batch(room: &Room) -> Vec<(Uuid, ServerMsg)> {
    let Some(game) = room.game.as_ref() else {
        return room_update_batch(room);
    };
    let room_msg = ServerMsg::RoomUpdate { room: room_view(room) };
    let turn_msg = turn_update(room, game);

    let mut batch = Vec::with_capacity(room.players.len() * 3);
    for player in &room.players {
        batch.push((player.id, room_msg.clone()));
        batch.push((
            player.id,
            ServerMsg::GameState {
                room_id: room.code.clone(),
                game_state: game_view_for(room, game, Some(player.id)),
            },
        ));
        batch.push((player.id, turn_msg.clone()));
    }
    batch
}

/// Everything broadcast after a move lands: the accepted move (unless it
/// was a silent timer pass), personalized state, the new turn pointer, and
/// the final result when the move ended the game.
#[must_use]
pub fn move_batch(room: &Room, outcome: &MoveOutcome, announce_move: bool) -> Vec<(Uuid, ServerMsg)> {
    let Some(game) = room.game.as_ref() else {
        return Vec::new();
    };
    let turn_msg = turn_update(room, game);
    let ended = outcome.end.as_ref().map(|end| ServerMsg::GameEnded {
        room_id: room.code.clone(),
        scores: end.scores.clone(),
        stats_by_player: stats_by_player(room),
        winner_ids: end.winner_ids.clone(),
    });

    let mut batch = Vec::with_capacity(room.players.len() * 4);
    for player in &room.players {
        if announce_move {
            batch.push((
                player.id,
                ServerMsg::MoveAccepted { room_id: room.code.clone(), record: outcome.record.clone() },
            ));
        }
        batch.push((
            player.id,
            ServerMsg::GameState {
                room_id: room.code.clone(),
                game_state: game_view_for(room, game, Some(player.id)),
            },
        ));
        batch.push((player.id, turn_msg.clone()));
        if let Some(msg) = &ended {
            batch.push((player.id, msg.clone()));
        }
    }
    batch
}

fn stats_by_player(room: &Room) -> HashMap<Uuid, PlayerStatsView> {
    room.players
        .iter()
        .map(|p| (p.id, (&p.stats).into()))
        .collect()
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;
