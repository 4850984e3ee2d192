//! Tile identity, letters, and point values.

use serde::{Deserialize, Serialize};

/// Stable identifier for a single physical tile within one game.
///
/// Assigned sequentially when the bag is built and never reused; racks, the
/// bag, and the board all refer to tiles by this id.
pub type TileId = u32;

/// A single letter tile.
///
/// A joker carries no letter while it sits in the bag or on a rack; the
/// letter it plays as is chosen at placement time and recorded on the board
/// cell, never on the tile. Its point value stays 0 for the whole game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    /// `None` for a joker still in the bag or on a rack.
    pub letter: Option<char>,
    pub value: u32,
    pub joker: bool,
}

impl Tile {
    /// A regular lettered tile.
    #[must_use]
    pub fn lettered(id: TileId, letter: char, value: u32) -> Self {
        Self { id, letter: Some(letter), value, joker: false }
    }

    /// A blank tile worth zero points.
    #[must_use]
    pub fn joker(id: TileId) -> Self {
        Self { id, letter: None, value: 0, joker: true }
    }

    /// Sum of face values for a set of tiles (end-of-game rack penalty).
    #[must_use]
    pub fn face_value(tiles: &[Tile]) -> u32 {
        tiles.iter().map(|t| t.value).sum()
    }
}

#[cfg(test)]
#[path = "tile_test.rs"]
mod tests;
