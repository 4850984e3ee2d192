//! Tile bag: letter distributions, shuffling, draw and return.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tile::{Tile, TileId};

/// Which official letter distribution fills the bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "EN")]
    English,
    #[serde(rename = "FR")]
    French,
}

/// (letter, count, point value) triples for the 100-tile English set,
/// excluding the two blanks.
const ENGLISH: &[(char, u8, u32)] = &[
    ('A', 9, 1),
    ('B', 2, 3),
    ('C', 2, 3),
    ('D', 4, 2),
    ('E', 12, 1),
    ('F', 2, 4),
    ('G', 3, 2),
    ('H', 2, 4),
    ('I', 9, 1),
    ('J', 1, 8),
    ('K', 1, 5),
    ('L', 4, 1),
    ('M', 2, 3),
    ('N', 6, 1),
    ('O', 8, 1),
    ('P', 2, 3),
    ('Q', 1, 10),
    ('R', 6, 1),
    ('S', 4, 1),
    ('T', 6, 1),
    ('U', 4, 1),
    ('V', 2, 4),
    ('W', 2, 4),
    ('X', 1, 8),
    ('Y', 2, 4),
    ('Z', 1, 10),
];

const FRENCH: &[(char, u8, u32)] = &[
    ('A', 9, 1),
    ('B', 2, 3),
    ('C', 2, 3),
    ('D', 3, 2),
    ('E', 15, 1),
    ('F', 2, 4),
    ('G', 2, 2),
    ('H', 2, 4),
    ('I', 8, 1),
    ('J', 1, 8),
    ('K', 1, 10),
    ('L', 5, 1),
    ('M', 3, 2),
    ('N', 6, 1),
    ('O', 6, 1),
    ('P', 2, 3),
    ('Q', 1, 8),
    ('R', 6, 1),
    ('S', 6, 1),
    ('T', 6, 1),
    ('U', 6, 1),
    ('V', 2, 4),
    ('W', 1, 10),
    ('X', 1, 10),
    ('Y', 1, 10),
    ('Z', 1, 10),
];

const JOKERS_PER_SET: u8 = 2;

/// The pool of undrawn tiles.
///
/// Ordered so that drawing pops from the tail and returning appends then
/// reshuffles; every shuffle goes through the caller's [`Rng`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bag {
    tiles: Vec<Tile>,
}

impl Bag {
    /// Build and shuffle a full bag for `language`. Tile ids are assigned
    /// sequentially from 0 before the shuffle.
    #[must_use]
    pub fn standard(language: Language, rng: &mut impl Rng) -> Self {
        let distribution = match language {
            Language::English => ENGLISH,
            Language::French => FRENCH,
        };

        let mut tiles = Vec::with_capacity(102);
        let mut next_id: TileId = 0;
        for &(letter, count, value) in distribution {
            for _ in 0..count {
                tiles.push(Tile::lettered(next_id, letter, value));
                next_id += 1;
            }
        }
        for _ in 0..JOKERS_PER_SET {
            tiles.push(Tile::joker(next_id));
            next_id += 1;
        }

        tiles.shuffle(rng);
        Self { tiles }
    }

    /// Draw up to `n` tiles from the tail. Returns fewer when the bag runs
    /// short.
    pub fn draw(&mut self, n: usize) -> Vec<Tile> {
        let n = n.min(self.tiles.len());
        self.tiles.split_off(self.tiles.len() - n)
    }

    /// Return tiles to the bag and reshuffle the whole pool.
    pub fn put_back(&mut self, tiles: Vec<Tile>, rng: &mut impl Rng) {
        self.tiles.extend(tiles);
        self.tiles.shuffle(rng);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All undrawn tiles, in draw order (tail drawn first).
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

#[cfg(test)]
#[path = "bag_test.rs"]
mod tests;
