//! 15×15 board, premium cells, and placed tiles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tile::Tile;

/// Side length of the square board.
pub const BOARD_SIZE: u8 = 15;

/// The starting cell every first play must cover.
pub const CENTER: Coord = Coord { x: 7, y: 7 };

/// A board coordinate. Valid cells satisfy `x, y < 15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    #[must_use]
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn in_bounds(self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    /// The up-to-four orthogonal neighbors that stay on the board.
    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        let Coord { x, y } = self;
        [
            (x.checked_sub(1), Some(y)),
            (x.checked_add(1), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), y.checked_add(1)),
        ]
        .into_iter()
        .filter_map(|(x, y)| Some(Coord { x: x?, y: y? }))
        .filter(|c| c.in_bounds())
    }

    fn index(self) -> usize {
        usize::from(self.y) * usize::from(BOARD_SIZE) + usize::from(self.x)
    }
}

/// Per-cell score multiplier, applied at most once in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Premium {
    #[serde(rename = "DL")]
    DoubleLetter,
    #[serde(rename = "TL")]
    TripleLetter,
    #[serde(rename = "DW")]
    DoubleWord,
    #[serde(rename = "TW")]
    TripleWord,
}

impl Premium {
    /// Multiplier applied to a single newly placed letter.
    #[must_use]
    pub fn letter_multiplier(self) -> u32 {
        match self {
            Premium::DoubleLetter => 2,
            Premium::TripleLetter => 3,
            Premium::DoubleWord | Premium::TripleWord => 1,
        }
    }

    /// Multiplier applied to the whole word containing the placement.
    #[must_use]
    pub fn word_multiplier(self) -> u32 {
        match self {
            Premium::DoubleLetter | Premium::TripleLetter => 1,
            Premium::DoubleWord => 2,
            Premium::TripleWord => 3,
        }
    }
}

/// A tile committed to the board.
///
/// `letter` is the letter the tile plays as: its own letter for a regular
/// tile, the chosen letter for a joker. The joker's value stays 0 either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedTile {
    pub tile: Tile,
    pub letter: char,
    pub from_player_id: Uuid,
    pub turn_played: u32,
}

/// One board cell: optional premium, optional tile, single-use bonus flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub premium: Option<Premium>,
    pub tile: Option<PlacedTile>,
    pub bonus_used: bool,
}

/// The 15×15 playing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Vec<Cell>,
}

impl Board {
    /// An empty board painted with the standard 8-fold symmetric premium
    /// layout.
    #[must_use]
    pub fn standard() -> Self {
        let mut cells = vec![Cell::default(); usize::from(BOARD_SIZE) * usize::from(BOARD_SIZE)];
        for (base, premium) in PREMIUM_BASES {
            for coord in symmetric_orbit(*base) {
                cells[coord.index()].premium = Some(*premium);
            }
        }
        Self { cells }
    }

    #[must_use]
    pub fn cell(&self, coord: Coord) -> &Cell {
        &self.cells[coord.index()]
    }

    pub fn cell_mut(&mut self, coord: Coord) -> &mut Cell {
        &mut self.cells[coord.index()]
    }

    /// True while no tile has been committed (the first-move rules apply).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.tile.is_none())
    }

    /// Number of tiles committed to the board.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.cells.iter().filter(|c| c.tile.is_some()).count()
    }

    /// All occupied cells with their coordinates, row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (Coord, &PlacedTile)> {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            let tile = cell.tile.as_ref()?;
            let i = u8::try_from(i).ok()?;
            Some((Coord::new(i % BOARD_SIZE, i / BOARD_SIZE), tile))
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

// Canonical premium positions in the x ≤ 7, y ≤ 7 octant; the full layout is
// their orbit under horizontal/vertical mirroring plus transposition.
const PREMIUM_BASES: &[(Coord, Premium)] = &[
    (Coord { x: 0, y: 0 }, Premium::TripleWord),
    (Coord { x: 7, y: 0 }, Premium::TripleWord),
    (Coord { x: 1, y: 1 }, Premium::DoubleWord),
    (Coord { x: 2, y: 2 }, Premium::DoubleWord),
    (Coord { x: 3, y: 3 }, Premium::DoubleWord),
    (Coord { x: 4, y: 4 }, Premium::DoubleWord),
    (Coord { x: 7, y: 7 }, Premium::DoubleWord),
    (Coord { x: 5, y: 1 }, Premium::TripleLetter),
    (Coord { x: 5, y: 5 }, Premium::TripleLetter),
    (Coord { x: 3, y: 0 }, Premium::DoubleLetter),
    (Coord { x: 6, y: 2 }, Premium::DoubleLetter),
    (Coord { x: 7, y: 3 }, Premium::DoubleLetter),
    (Coord { x: 6, y: 6 }, Premium::DoubleLetter),
];

fn symmetric_orbit(base: Coord) -> Vec<Coord> {
    let max = BOARD_SIZE - 1;
    let mut orbit = Vec::with_capacity(8);
    for (x, y) in [
        (base.x, base.y),
        (max - base.x, base.y),
        (base.x, max - base.y),
        (max - base.x, max - base.y),
    ] {
        for coord in [Coord::new(x, y), Coord::new(y, x)] {
            if !orbit.contains(&coord) {
                orbit.push(coord);
            }
        }
    }
    orbit
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
