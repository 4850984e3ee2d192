//! Room registry — create/join/leave, host succession, activity tracking.
//!
//! DESIGN
//! ======
//! Rooms live only in memory, keyed by a short human-typable code. The
//! registry map is guarded by one `RwLock`; each room sits behind its own
//! `Mutex` so all mutation of a room is serialized. Lock order is always
//! registry first, then room, never the reverse.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use engine::tile::Tile;

use crate::envelope::ErrorCode;
use crate::services::game::GameState;
use crate::state::AppState;

/// Nicknames longer than this are silently truncated.
pub const MAX_NICKNAME_CHARS: usize = 15;

/// Room capacity bounds; requested sizes are clamped into this range.
pub const MIN_CAPACITY: u8 = 1;
pub const MAX_CAPACITY: u8 = 4;

/// Code alphabet with visually ambiguous characters (`I O 0 1`) removed.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const CODE_ATTEMPTS_PER_LENGTH: usize = 1000;

pub type SharedRoom = Arc<Mutex<Room>>;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(String),
    #[error("room {0} is full")]
    Full(String),
    #[error("room {0} is not accepting new players")]
    NotJoinable(String),
    #[error("nickname '{0}' is already taken in this room")]
    NicknameTaken(String),
    #[error("could not allocate a unique room code")]
    CodeGeneration,
    #[error("player is not a member of room {0}")]
    NotInRoom(String),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ROOM_NOT_FOUND",
            Self::Full(_) => "ROOM_FULL",
            Self::NotJoinable(_) => "ROOM_NOT_JOINABLE",
            Self::NicknameTaken(_) => "NICKNAME_TAKEN",
            Self::CodeGeneration => "ROOM_ID_GENERATION_FAILED",
            Self::NotInRoom(_) => "NOT_IN_ROOM",
        }
    }
}

/// Room lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// Per-player aggregate statistics for the current game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub words_played: u32,
    pub best_word_score: u32,
    pub best_word: Option<String>,
    pub total_turns: u32,
    pub passes: u32,
}

/// A seated player. The transport binding lives in the link maps, not here;
/// only the `connected` flag is part of room state.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub nickname: String,
    pub connected: bool,
    pub ready: bool,
    pub score: i32,
    pub rack: Vec<Tile>,
    pub stats: PlayerStats,
}

impl Player {
    #[must_use]
    pub fn new(id: Uuid, nickname: &str) -> Self {
        Self {
            id,
            nickname: truncate_nickname(nickname),
            connected: true,
            ready: false,
            score: 0,
            rack: Vec::new(),
            stats: PlayerStats::default(),
        }
    }
}

/// A game room. Player insertion order is turn order.
#[derive(Debug)]
pub struct Room {
    pub code: String,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub max_players: u8,
    pub players: Vec<Player>,
    pub game: Option<GameState>,
    pub last_activity_at: i64,
}

impl Room {
    #[must_use]
    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    #[must_use]
    pub fn is_member(&self, id: Uuid) -> bool {
        self.player(id).is_some()
    }

    pub fn touch(&mut self, now: i64) {
        self.last_activity_at = now;
    }
}

/// What fell out of a player removal.
#[derive(Debug)]
pub struct PlayerRemoved {
    /// The room itself, `None` when the removal emptied and deleted it.
    pub room: Option<SharedRoom>,
    /// New host when the removed player was hosting.
    pub new_host: Option<Uuid>,
}

// =============================================================================
// CODE GENERATION
// =============================================================================

pub(crate) fn generate_code(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            char::from(CODE_ALPHABET[idx])
        })
        .collect()
}

fn unique_code(rng: &mut impl Rng, taken: &HashMap<String, SharedRoom>) -> Result<String, RoomError> {
    for len in [4usize, 6] {
        for _ in 0..CODE_ATTEMPTS_PER_LENGTH {
            let code = generate_code(rng, len);
            if !taken.contains_key(&code) {
                return Ok(code);
            }
        }
    }
    Err(RoomError::CodeGeneration)
}

pub(crate) fn truncate_nickname(raw: &str) -> String {
    raw.chars().take(MAX_NICKNAME_CHARS).collect()
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Create a room with its first player as host.
///
/// # Errors
///
/// `CodeGeneration` when no unique code could be allocated.
pub async fn create_room(
    state: &AppState,
    nickname: &str,
    max_players: Option<u8>,
    player_id: Option<Uuid>,
    now: i64,
) -> Result<(SharedRoom, Uuid), RoomError> {
    let capacity = max_players.unwrap_or(MAX_CAPACITY).clamp(MIN_CAPACITY, MAX_CAPACITY);
    let player_id = player_id.unwrap_or_else(Uuid::new_v4);

    let mut rooms = state.rooms.write().await;
    let code = unique_code(&mut rand::rng(), &rooms)?;

    let room = Room {
        code: code.clone(),
        host_id: player_id,
        status: RoomStatus::Waiting,
        max_players: capacity,
        players: vec![Player::new(player_id, nickname)],
        game: None,
        last_activity_at: now,
    };
    let shared: SharedRoom = Arc::new(Mutex::new(room));
    rooms.insert(code.clone(), Arc::clone(&shared));
    drop(rooms);

    state.links.write().await.player_room.insert(player_id, code.clone());
    info!(%code, %player_id, capacity, "room created");
    Ok((shared, player_id))
}

/// Join an existing room, or re-attach when `player_id` is already seated.
///
/// # Errors
///
/// `NotFound`, `Full`, `NotJoinable`, or `NicknameTaken`.
pub async fn join_room(
    state: &AppState,
    code: &str,
    nickname: &str,
    player_id: Option<Uuid>,
    now: i64,
) -> Result<(SharedRoom, Uuid), RoomError> {
    let shared = state
        .room(code)
        .await
        .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

    let mut room = shared.lock().await;

    // Re-attach: a known player id joins without creating a seat.
    if let Some(id) = player_id {
        if room.is_member(id) {
            room.touch(now);
            drop(room);
            state.links.write().await.player_room.insert(id, code.to_string());
            return Ok((Arc::clone(&shared), id));
        }
    }

    if room.players.len() >= usize::from(room.max_players) {
        return Err(RoomError::Full(code.to_string()));
    }
    if room.status != RoomStatus::Waiting {
        return Err(RoomError::NotJoinable(code.to_string()));
    }
    let nickname = truncate_nickname(nickname);
    if room
        .players
        .iter()
        .any(|p| p.nickname.eq_ignore_ascii_case(&nickname))
    {
        return Err(RoomError::NicknameTaken(nickname));
    }

    let id = player_id.unwrap_or_else(Uuid::new_v4);
    room.players.push(Player::new(id, &nickname));
    room.touch(now);
    let count = room.players.len();
    drop(room);

    state.links.write().await.player_room.insert(id, code.to_string());
    info!(%code, player_id = %id, players = count, "player joined room");
    Ok((shared, id))
}

/// Remove a player. Deletes the room when it empties, otherwise transfers
/// the host role to the next seat if needed.
///
/// # Errors
///
/// `NotFound` or `NotInRoom`.
pub async fn remove_player(
    state: &AppState,
    code: &str,
    player_id: Uuid,
    now: i64,
) -> Result<PlayerRemoved, RoomError> {
    // Registry lock first so an emptied room can be deleted atomically.
    let mut rooms = state.rooms.write().await;
    let shared = rooms
        .get(code)
        .cloned()
        .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

    let mut room = shared.lock().await;
    let Some(idx) = room.players.iter().position(|p| p.id == player_id) else {
        return Err(RoomError::NotInRoom(code.to_string()));
    };
    room.players.remove(idx);
    room.touch(now);

    let mut links = state.links.write().await;
    links.player_room.remove(&player_id);
    drop(links);

    if room.players.is_empty() {
        rooms.remove(code);
        info!(%code, %player_id, "last player left; room deleted");
        return Ok(PlayerRemoved { room: None, new_host: None });
    }

    let mut new_host = None;
    if room.host_id == player_id {
        room.host_id = room.players[0].id;
        new_host = Some(room.host_id);
        info!(%code, new_host = %room.players[0].id, "host left; host transferred");
    }

    // Removing a seat shifts indexes; keep the turn pointer on the player
    // who actually holds the turn.
    let inner = &mut *room;
    if let Some(game) = inner.game.as_mut() {
        if let Some(idx) = inner.players.iter().position(|p| p.id == game.active_player_id) {
            game.turn_index = idx;
        }
    }
    drop(room);
    drop(rooms);

    Ok(PlayerRemoved { room: Some(shared), new_host })
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
