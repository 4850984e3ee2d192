//! Placement validation, word construction, scoring, and commit.
//!
//! DESIGN
//! ======
//! `check_play` runs the legal-placement predicate in a fixed order; the
//! first failing check decides the error. It returns a [`PlayOutline`]
//! describing every word the play would form, already scored. Dictionary
//! membership is deliberately left to the caller: each [`FormedWord`]
//! carries a `query` string with `?` in joker positions, and the caller
//! rejects the play if any query misses. `apply_play` then commits a
//! validated outline. Keeping the dictionary outside makes everything here
//! deterministic and synchronous.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bag::Bag;
use crate::board::{Board, Coord, PlacedTile, CENTER};
use crate::tile::{Tile, TileId};

/// Maximum tiles on a rack; a play that uses all seven is a bingo.
pub const RACK_SIZE: usize = 7;

/// Flat bonus for playing the whole rack in one move.
pub const BINGO_BONUS: u32 = 50;

/// One tile the player proposes to put on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub tile_id: TileId,
    pub x: u8,
    pub y: u8,
    /// Letter a joker plays as; ignored for regular tiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<char>,
}

impl Placement {
    #[must_use]
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// Why a proposed play or exchange is illegal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("placement at ({x}, {y}) is off the board")]
    OutOfBounds { x: u8, y: u8 },
    #[error("cell ({x}, {y}) already holds a tile")]
    CellOccupied { x: u8, y: u8 },
    #[error("tile {0} is not in the player's rack")]
    TileNotInRack(TileId),
    #[error("tile {0} is used more than once")]
    DuplicateTile(TileId),
    #[error("joker tile {0} needs a chosen letter")]
    MissingJokerLetter(TileId),
    #[error("placements do not share a single row or column")]
    NotAligned,
    #[error("the first play must cover the center cell")]
    MustCoverCenter,
    #[error("placed tiles leave a gap in the word")]
    NotContiguous,
    #[error("play does not connect to any existing tile")]
    NotConnected,
    #[error("play forms no word of two or more letters")]
    NoWordFormed,
    #[error("no tiles selected for exchange")]
    NoTilesToExchange,
    #[error("bag holds {available} tiles but {requested} were requested")]
    BagTooSmall { requested: usize, available: usize },
}

/// A word a play would form, scored against the current board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormedWord {
    /// Letters as they read on the board (jokers show their chosen letter).
    pub text: String,
    /// Dictionary query: `?` in every newly placed joker position.
    pub query: String,
    pub score: u32,
    pub start: Coord,
    pub horizontal: bool,
}

/// Everything a legal play would do, computed without touching the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutline {
    /// Main word first, then cross-words in placement order.
    pub words: Vec<FormedWord>,
    /// Total move score including the bingo bonus.
    pub score: u32,
    pub bingo: bool,
}

/// What a cell holds when the proposed placements are overlaid on the board.
#[derive(Clone, Copy)]
enum Overlaid<'a> {
    New { letter: char, value: u32, joker: bool },
    Existing(&'a PlacedTile),
}

struct Overlay<'a> {
    board: &'a Board,
    new: HashMap<Coord, Overlaid<'a>>,
}

impl<'a> Overlay<'a> {
    fn at(&self, coord: Coord) -> Option<Overlaid<'a>> {
        if let Some(n) = self.new.get(&coord) {
            return Some(*n);
        }
        self.board.cell(coord).tile.as_ref().map(Overlaid::Existing)
    }
}

/// Validate a proposed play and compute the words and score it would earn.
///
/// Checks run in order: non-empty, bounds and empty target cells, rack
/// ownership and duplicates, collinearity, first-move center coverage,
/// contiguity, connection, and finally word formation. Dictionary lookups
/// are the caller's job.
///
/// # Errors
///
/// The first failing check's [`RuleError`].
pub fn check_play(board: &Board, rack: &[Tile], placements: &[Placement]) -> Result<PlayOutline, RuleError> {
    if placements.is_empty() {
        return Err(RuleError::NoWordFormed);
    }

    // Bounds, empty target cells, no two placements on one cell.
    let mut coords_seen = HashSet::new();
    for p in placements {
        let coord = p.coord();
        if !coord.in_bounds() {
            return Err(RuleError::OutOfBounds { x: p.x, y: p.y });
        }
        if board.cell(coord).tile.is_some() || !coords_seen.insert(coord) {
            return Err(RuleError::CellOccupied { x: p.x, y: p.y });
        }
    }

    // Rack ownership, duplicates, joker letter choice.
    let by_id: HashMap<TileId, &Tile> = rack.iter().map(|t| (t.id, t)).collect();
    let mut ids_seen = HashSet::new();
    let mut new = HashMap::new();
    for p in placements {
        let tile = *by_id.get(&p.tile_id).ok_or(RuleError::TileNotInRack(p.tile_id))?;
        if !ids_seen.insert(p.tile_id) {
            return Err(RuleError::DuplicateTile(p.tile_id));
        }
        let letter = resolve_letter(tile, p)?;
        new.insert(p.coord(), Overlaid::New { letter, value: tile.value, joker: tile.joker });
    }
    let overlay = Overlay { board, new };

    // Collinearity. A single placement fixes its axis during word building.
    let same_row = placements.iter().all(|p| p.y == placements[0].y);
    let same_col = placements.iter().all(|p| p.x == placements[0].x);
    if !same_row && !same_col {
        return Err(RuleError::NotAligned);
    }

    let first_move = board.is_empty();
    if first_move && !placements.iter().any(|p| p.coord() == CENTER) {
        return Err(RuleError::MustCoverCenter);
    }

    // Contiguity: between the extreme placements, every cell must hold a
    // tile (new or pre-existing).
    let horizontal = if placements.len() > 1 { same_row } else { true };
    if placements.len() > 1 {
        let lo = placements.iter().map(|p| if horizontal { p.x } else { p.y }).min().unwrap_or(0);
        let hi = placements.iter().map(|p| if horizontal { p.x } else { p.y }).max().unwrap_or(0);
        for step in lo..=hi {
            let coord = if horizontal {
                Coord::new(step, placements[0].y)
            } else {
                Coord::new(placements[0].x, step)
            };
            if overlay.at(coord).is_none() {
                return Err(RuleError::NotContiguous);
            }
        }
    }

    // Connection: an existing tile inside the main span, or orthogonal
    // adjacency to one. The first move is connected once it covers center.
    if !first_move {
        let anchor = placements[0].coord();
        let span = word_span(&overlay, anchor, horizontal);
        let touches_existing = span
            .iter()
            .any(|c| matches!(overlay.at(*c), Some(Overlaid::Existing(_))))
            || placements.iter().any(|p| {
                p.coord()
                    .neighbors()
                    .any(|n| board.cell(n).tile.is_some())
            });
        if !touches_existing {
            return Err(RuleError::NotConnected);
        }
    }

    // Word construction. A lone tile scores whichever spans reach length 2;
    // when both do, one is the main word and the other a cross-word.
    let mut words = Vec::new();
    let anchor = placements[0].coord();
    let main_axis = if placements.len() == 1 {
        word_span(&overlay, anchor, true).len() >= 2
    } else {
        horizontal
    };

    let main_span = word_span(&overlay, anchor, main_axis);
    if main_span.len() >= 2 {
        words.push(score_word(&overlay, &main_span, main_axis));
    }
    for p in placements {
        let cross = word_span(&overlay, p.coord(), !main_axis);
        if cross.len() >= 2 {
            words.push(score_word(&overlay, &cross, !main_axis));
        }
    }
    if words.is_empty() {
        return Err(RuleError::NoWordFormed);
    }

    let bingo = placements.len() == RACK_SIZE;
    let score = words.iter().map(|w| w.score).sum::<u32>() + if bingo { BINGO_BONUS } else { 0 };

    Ok(PlayOutline { words, score, bingo })
}

fn resolve_letter(tile: &Tile, p: &Placement) -> Result<char, RuleError> {
    if let Some(letter) = tile.letter {
        return Ok(letter);
    }
    match p.letter.map(|l| l.to_ascii_uppercase()) {
        Some(letter) if letter.is_ascii_uppercase() => Ok(letter),
        _ => Err(RuleError::MissingJokerLetter(tile.id)),
    }
}

/// The maximal run of occupied cells through `anchor` along one axis.
fn word_span(overlay: &Overlay<'_>, anchor: Coord, horizontal: bool) -> Vec<Coord> {
    let step_back = |c: Coord| -> Option<Coord> {
        if horizontal {
            c.x.checked_sub(1).map(|x| Coord::new(x, c.y))
        } else {
            c.y.checked_sub(1).map(|y| Coord::new(c.x, y))
        }
    };
    let step_fwd = |c: Coord| -> Option<Coord> {
        let next = if horizontal {
            Coord::new(c.x + 1, c.y)
        } else {
            Coord::new(c.x, c.y + 1)
        };
        next.in_bounds().then_some(next)
    };

    let mut start = anchor;
    while let Some(prev) = step_back(start) {
        if overlay.at(prev).is_none() {
            break;
        }
        start = prev;
    }

    let mut span = vec![start];
    let mut cursor = start;
    while let Some(next) = step_fwd(cursor) {
        if overlay.at(next).is_none() {
            break;
        }
        span.push(next);
        cursor = next;
    }
    span
}

fn score_word(overlay: &Overlay<'_>, span: &[Coord], horizontal: bool) -> FormedWord {
    let mut text = String::with_capacity(span.len());
    let mut query = String::with_capacity(span.len());
    let mut letter_sum = 0u32;
    let mut word_multiplier = 1u32;

    for &coord in span {
        match overlay.at(coord) {
            Some(Overlaid::New { letter, value, joker }) => {
                text.push(letter);
                query.push(if joker { '?' } else { letter });
                let cell = overlay.board.cell(coord);
                // Premiums pay out only while the cell's bonus is unspent;
                // commit stamps it the moment a tile lands.
                match cell.premium.filter(|_| !cell.bonus_used) {
                    Some(p) => {
                        letter_sum += value * p.letter_multiplier();
                        word_multiplier *= p.word_multiplier();
                    }
                    None => letter_sum += value,
                }
            }
            Some(Overlaid::Existing(placed)) => {
                text.push(placed.letter);
                query.push(placed.letter);
                letter_sum += placed.tile.value;
            }
            None => unreachable!("word spans only cover occupied cells"),
        }
    }

    FormedWord {
        text,
        query,
        score: letter_sum * word_multiplier,
        start: span[0],
        horizontal,
    }
}

/// Commit a validated play: move tiles from the rack onto the board, stamp
/// bonuses, and refill the rack from the bag. Returns how many tiles were
/// drawn.
///
/// The caller must have validated `placements` with [`check_play`] against
/// the same board and rack.
pub fn apply_play(
    board: &mut Board,
    rack: &mut Vec<Tile>,
    bag: &mut Bag,
    placements: &[Placement],
    player_id: Uuid,
    turn: u32,
) -> usize {
    for p in placements {
        let Some(pos) = rack.iter().position(|t| t.id == p.tile_id) else {
            continue;
        };
        let tile = rack.remove(pos);
        let letter = tile
            .letter
            .or_else(|| p.letter.map(|l| l.to_ascii_uppercase()))
            .unwrap_or('?');
        let cell = board.cell_mut(p.coord());
        cell.tile = Some(PlacedTile { tile, letter, from_player_id: player_id, turn_played: turn });
        cell.bonus_used = true;
    }

    let refill = RACK_SIZE.saturating_sub(rack.len());
    let drawn = bag.draw(refill);
    let count = drawn.len();
    rack.extend(drawn);
    count
}

/// Validate a tile exchange against the rack and bag.
///
/// # Errors
///
/// `NoTilesToExchange`, `BagTooSmall`, `TileNotInRack`, or `DuplicateTile`.
pub fn check_exchange(rack: &[Tile], bag_len: usize, ids: &[TileId]) -> Result<(), RuleError> {
    if ids.is_empty() {
        return Err(RuleError::NoTilesToExchange);
    }
    if bag_len < ids.len() {
        return Err(RuleError::BagTooSmall { requested: ids.len(), available: bag_len });
    }
    let mut seen = HashSet::new();
    for id in ids {
        if !rack.iter().any(|t| t.id == *id) {
            return Err(RuleError::TileNotInRack(*id));
        }
        if !seen.insert(*id) {
            return Err(RuleError::DuplicateTile(*id));
        }
    }
    Ok(())
}

/// Swap the given rack tiles for fresh draws. The discards join the bag
/// before the reshuffle, so they may come straight back.
pub fn apply_exchange(rack: &mut Vec<Tile>, bag: &mut Bag, ids: &[TileId], rng: &mut impl Rng) {
    let mut returned = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(pos) = rack.iter().position(|t| t.id == *id) {
            returned.push(rack.remove(pos));
        }
    }
    let count = returned.len();
    bag.put_back(returned, rng);
    rack.extend(bag.draw(count));
}

#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;
