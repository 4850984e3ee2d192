//! Game lifecycle — start, move application, turn advance, end detection.
//!
//! DESIGN
//! ======
//! Every function here runs under the owning room's mutex; the caller holds
//! the lock across the whole call, including the dictionary await inside a
//! `play` action, so no other mutation can interleave. The engine crate does
//! the pure rule work; this module owns player stats, the turn pointer, the
//! move log, and end-of-game scoring.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use engine::bag::Bag;
use engine::board::Board;
use engine::rules::{self, Placement, RuleError, RACK_SIZE};
use engine::tile::{Tile, TileId};

use crate::config::ServerConfig;
use crate::envelope::{ErrorCode, MoveAction};
use crate::services::room::{Room, RoomStatus};
use crate::words::Lexicon;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("only the host can start the game")]
    NotHost,
    #[error("at least two players are required to start")]
    MinPlayers,
    #[error("every player must be ready to start")]
    NotAllReady,
    #[error("the room's state does not allow this action")]
    InvalidState,
    #[error("player is not a member of this room")]
    NotInRoom,
    #[error("it is another player's turn")]
    NotYourTurn,
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("'{word}' is not an accepted word")]
    InvalidWord { word: String },
}

impl ErrorCode for GameError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotHost => "NOT_HOST",
            Self::MinPlayers => "MIN_PLAYERS",
            Self::NotAllReady => "NOT_ALL_READY",
            Self::InvalidState => "INVALID_STATE",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::InvalidWord { .. } => "INVALID_WORD",
            Self::Rule(rule) => match rule {
                RuleError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
                RuleError::CellOccupied { .. } => "CELL_OCCUPIED",
                RuleError::TileNotInRack(_) => "TILE_NOT_IN_RACK",
                RuleError::DuplicateTile(_) => "DUPLICATE_TILE",
                // An unlettered joker is an incomplete payload, not a rule
                // violation with a code of its own.
                RuleError::MissingJokerLetter(_) => "BAD_PAYLOAD",
                RuleError::NotAligned => "NOT_ALIGNED",
                RuleError::MustCoverCenter => "MUST_COVER_CENTER",
                RuleError::NotContiguous => "NOT_CONTIGUOUS",
                RuleError::NotConnected => "NOT_CONNECTED",
                RuleError::NoWordFormed => "NO_WORD_FORMED",
                RuleError::NoTilesToExchange => "NO_TILES_TO_EXCHANGE",
                RuleError::BagTooSmall { .. } => "BAG_TOO_SMALL",
            },
        }
    }
}

/// One entry in the append-only move log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub player_id: Uuid,
    pub action: MoveAction,
    pub words: Vec<String>,
    pub score: i32,
    pub placements: Vec<Placement>,
    pub turn: u32,
    pub at: i64,
}

/// Authoritative per-room game state.
#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub bag: Bag,
    pub turn_index: usize,
    pub active_player_id: Uuid,
    pub turn_ends_at: i64,
    pub turn_duration_ms: u64,
    pub moves: Vec<MoveRecord>,
    pub consecutive_passes: u32,
    pub started_at: i64,
    pub version: u64,
}

impl GameState {
    /// 1-based number of the turn currently being played.
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.moves.len() as u32 + 1
    }
}

/// Final scores and winners, computed once when the game ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    pub scores: HashMap<Uuid, i32>,
    pub winner_ids: Vec<Uuid>,
}

/// A successfully applied move plus the end-of-game verdict, if any.
#[derive(Debug)]
pub struct MoveOutcome {
    pub record: MoveRecord,
    pub end: Option<GameEnd>,
}

// =============================================================================
// START
// =============================================================================

/// Start the room's game: reset every player, build the board and bag, deal
/// racks, arm the first turn deadline.
///
/// # Errors
///
/// `NotHost`, `InvalidState`, `MinPlayers`, or `NotAllReady`.
pub fn start_game(
    room: &mut Room,
    config: &ServerConfig,
    rng: &mut impl Rng,
    player_id: Uuid,
    now: i64,
) -> Result<(), GameError> {
    if player_id != room.host_id {
        return Err(GameError::NotHost);
    }
    if room.status != RoomStatus::Waiting {
        return Err(GameError::InvalidState);
    }
    if room.players.len() < 2 {
        return Err(GameError::MinPlayers);
    }
    if room.players.len() > usize::from(room.max_players) {
        return Err(GameError::InvalidState);
    }
    if !room.players.iter().all(|p| p.ready) {
        return Err(GameError::NotAllReady);
    }

    let mut bag = Bag::standard(config.language, rng);
    for player in &mut room.players {
        player.score = 0;
        player.ready = false;
        player.stats = Default::default();
        player.rack = bag.draw(RACK_SIZE);
    }

    let active_player_id = room.players[0].id;
    room.game = Some(GameState {
        board: Board::standard(),
        bag,
        turn_index: 0,
        active_player_id,
        turn_ends_at: now + config.turn_duration_ms as i64,
        turn_duration_ms: config.turn_duration_ms,
        moves: Vec::new(),
        consecutive_passes: 0,
        started_at: now,
        version: 1,
    });
    room.status = RoomStatus::Playing;
    room.touch(now);

    info!(code = %room.code, players = room.players.len(), %active_player_id, "game started");
    Ok(())
}

// =============================================================================
// MOVES
// =============================================================================

/// Apply one move for `player_id`. The caller must hold the room lock for
/// the duration of the call; dictionary lookups await under it.
///
/// # Errors
///
/// Precondition failures (`InvalidState`, `NotInRoom`, `NotYourTurn`) or
/// the rule/dictionary verdict for the action.
#[allow(clippy::too_many_arguments)]
pub async fn play_move(
    room: &mut Room,
    lexicon: &dyn Lexicon,
    config: &ServerConfig,
    rng: &mut impl Rng,
    player_id: Uuid,
    action: MoveAction,
    placements: &[Placement],
    exchange_ids: &[TileId],
    now: i64,
) -> Result<MoveOutcome, GameError> {
    let Some(game) = room.game.as_ref() else {
        return Err(GameError::InvalidState);
    };
    if room.status != RoomStatus::Playing {
        return Err(GameError::InvalidState);
    }
    if !room.is_member(player_id) {
        return Err(GameError::NotInRoom);
    }
    if game.active_player_id != player_id {
        return Err(GameError::NotYourTurn);
    }

    let record = match action {
        MoveAction::Pass => apply_pass(room, player_id, now),
        MoveAction::Exchange => apply_exchange(room, config, rng, player_id, exchange_ids, now)?,
        MoveAction::Play => apply_play(room, lexicon, config, player_id, placements, now).await?,
    };

    if let Some(game) = room.game.as_mut() {
        game.moves.push(record.clone());
    }
    advance_turn(room, now);
    let end = maybe_end_game(room, config);
    room.touch(now);

    info!(
        code = %room.code,
        %player_id,
        action = ?record.action,
        score = record.score,
        ended = end.is_some(),
        "move applied"
    );
    Ok(MoveOutcome { record, end })
}

fn apply_pass(room: &mut Room, player_id: Uuid, now: i64) -> MoveRecord {
    let turn = room.game.as_ref().map_or(1, GameState::turn_number);
    if let Some(player) = room.players.iter_mut().find(|p| p.id == player_id) {
        player.stats.passes += 1;
    }
    if let Some(game) = room.game.as_mut() {
        game.consecutive_passes += 1;
    }
    MoveRecord {
        player_id,
        action: MoveAction::Pass,
        words: Vec::new(),
        score: 0,
        placements: Vec::new(),
        turn,
        at: now,
    }
}

fn apply_exchange(
    room: &mut Room,
    config: &ServerConfig,
    rng: &mut impl Rng,
    player_id: Uuid,
    ids: &[TileId],
    now: i64,
) -> Result<MoveRecord, GameError> {
    let Some(game) = room.game.as_mut() else {
        return Err(GameError::InvalidState);
    };
    let Some(player) = room.players.iter_mut().find(|p| p.id == player_id) else {
        return Err(GameError::NotInRoom);
    };

    rules::check_exchange(&player.rack, game.bag.len(), ids)?;
    rules::apply_exchange(&mut player.rack, &mut game.bag, ids, rng);

    player.stats.passes += 1;
    if config.exchange_counts_as_pass {
        game.consecutive_passes += 1;
    }

    Ok(MoveRecord {
        player_id,
        action: MoveAction::Exchange,
        words: Vec::new(),
        score: 0,
        placements: Vec::new(),
        turn: game.turn_number(),
        at: now,
    })
}

async fn apply_play(
    room: &mut Room,
    lexicon: &dyn Lexicon,
    config: &ServerConfig,
    player_id: Uuid,
    placements: &[Placement],
    now: i64,
) -> Result<MoveRecord, GameError> {
    let Some(game) = room.game.as_mut() else {
        return Err(GameError::InvalidState);
    };
    let Some(player) = room.players.iter_mut().find(|p| p.id == player_id) else {
        return Err(GameError::NotInRoom);
    };

    let outline = rules::check_play(&game.board, &player.rack, placements)?;

    // The only suspension point in move processing. A lookup that overruns
    // its deadline counts as an invalid word.
    let deadline = Duration::from_millis(config.word_lookup_timeout_ms);
    for word in &outline.words {
        let valid = tokio::time::timeout(deadline, lexicon.is_valid(&word.query))
            .await
            .unwrap_or(false);
        if !valid {
            return Err(GameError::InvalidWord { word: word.text.clone() });
        }
    }

    let turn = game.turn_number();
    rules::apply_play(&mut game.board, &mut player.rack, &mut game.bag, placements, player_id, turn);

    let score = outline.score as i32;
    player.score += score;
    player.stats.words_played += outline.words.len() as u32;
    player.stats.total_turns += 1;
    if outline.score > player.stats.best_word_score {
        player.stats.best_word_score = outline.score;
        player.stats.best_word = Some(outline.words[0].text.clone());
    }
    game.consecutive_passes = 0;

    Ok(MoveRecord {
        player_id,
        action: MoveAction::Play,
        words: outline.words.into_iter().map(|w| w.text).collect(),
        score,
        placements: placements.to_vec(),
        turn,
        at: now,
    })
}

// =============================================================================
// TURN + END
// =============================================================================

fn advance_turn(room: &mut Room, now: i64) {
    let seats = room.players.len();
    let Some(game) = room.game.as_mut() else {
        return;
    };
    game.turn_index = (game.turn_index + 1) % seats;
    game.active_player_id = room.players[game.turn_index].id;
    game.turn_ends_at = now + game.turn_duration_ms as i64;
    game.version += 1;
}

/// Check the two end conditions and, when one holds, apply final scoring
/// and freeze the room.
fn maybe_end_game(room: &mut Room, config: &ServerConfig) -> Option<GameEnd> {
    let game = room.game.as_ref()?;
    let stalled = game.consecutive_passes >= config.max_consecutive_passes;
    let played_out = game.bag.is_empty() && room.players.iter().any(|p| p.rack.is_empty());
    if !stalled && !played_out {
        return None;
    }

    let leftovers: Vec<(Uuid, u32)> = room
        .players
        .iter()
        .map(|p| (p.id, Tile::face_value(&p.rack)))
        .collect();
    let finishers: Vec<Uuid> = room
        .players
        .iter()
        .filter(|p| p.rack.is_empty())
        .map(|p| p.id)
        .collect();

    for player in &mut room.players {
        player.score -= Tile::face_value(&player.rack) as i32;
    }
    // A sole finisher collects what everyone else is stuck with.
    if let [finisher] = finishers[..] {
        let bonus: u32 = leftovers
            .iter()
            .filter(|(id, _)| *id != finisher)
            .map(|(_, v)| v)
            .sum();
        if let Some(player) = room.players.iter_mut().find(|p| p.id == finisher) {
            player.score += bonus as i32;
        }
    }

    room.status = RoomStatus::Finished;

    let top = room.players.iter().map(|p| p.score).max()?;
    let end = GameEnd {
        scores: room.players.iter().map(|p| (p.id, p.score)).collect(),
        winner_ids: room
            .players
            .iter()
            .filter(|p| p.score == top)
            .map(|p| p.id)
            .collect(),
    };
    info!(code = %room.code, winners = ?end.winner_ids, "game ended");
    Some(end)
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
