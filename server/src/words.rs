//! Word-list dictionary with `?` wildcard support.
//!
//! DESIGN
//! ======
//! Lookups go through the [`Lexicon`] trait object so game logic never cares
//! where words come from. The real implementation buckets words by length:
//! exact queries hash into the right bucket, wildcard queries scan it
//! comparing only the fixed positions. Loading happens once at startup; if
//! no word list can be found the server falls back to a permissive stub
//! and says so in the log.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;

/// Answers "is this word playable?". Queries are uppercase and may contain
/// `?` which matches any single letter.
#[async_trait::async_trait]
pub trait Lexicon: Send + Sync {
    async fn is_valid(&self, word: &str) -> bool;
}

/// Dictionary backed by a newline-delimited word list.
pub struct WordList {
    /// Words grouped by character count; a length with no bucket can never
    /// match.
    buckets: HashMap<usize, HashSet<String>>,
    len: usize,
}

impl WordList {
    /// Build from any line-oriented reader. Lines are trimmed and
    /// uppercased; blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Propagates read failures from the underlying reader.
    pub fn from_reader(reader: impl BufRead) -> std::io::Result<Self> {
        let mut buckets: HashMap<usize, HashSet<String>> = HashMap::new();
        let mut len = 0;
        for line in reader.lines() {
            let word = line?.trim().to_ascii_uppercase();
            if word.is_empty() {
                continue;
            }
            if buckets.entry(word.chars().count()).or_default().insert(word) {
                len += 1;
            }
        }
        Ok(Self { buckets, len })
    }

    /// Load a word-list file from disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be opened or
    /// read.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn lookup(&self, word: &str) -> bool {
        let query = word.trim().to_ascii_uppercase();
        if query.is_empty() {
            return false;
        }
        let Some(bucket) = self.buckets.get(&query.chars().count()) else {
            return false;
        };
        if !query.contains('?') {
            return bucket.contains(&query);
        }
        bucket.iter().any(|candidate| wildcard_match(&query, candidate))
    }
}

fn wildcard_match(query: &str, candidate: &str) -> bool {
    query
        .chars()
        .zip(candidate.chars())
        .all(|(q, c)| q == '?' || q == c)
}

#[async_trait::async_trait]
impl Lexicon for WordList {
    async fn is_valid(&self, word: &str) -> bool {
        self.lookup(word)
    }
}

/// Development stub that accepts every word.
pub struct OpenLexicon;

#[async_trait::async_trait]
impl Lexicon for OpenLexicon {
    async fn is_valid(&self, _word: &str) -> bool {
        true
    }
}

/// Candidate paths probed when `WORDS_PATH` is unset.
const DISCOVERY_PATHS: &[&str] = &["words.txt", "assets/words.txt", "/usr/share/dict/words"];

/// Load the configured word list, falling back to the permissive stub.
///
/// The fallback choice is observable only here, at startup; `is_valid`
/// never fails at call time.
pub fn load_lexicon(config: &ServerConfig) -> Arc<dyn Lexicon> {
    let candidates: Vec<&str> = match &config.words_path {
        Some(path) => vec![path.as_str()],
        None => DISCOVERY_PATHS.to_vec(),
    };

    for path in candidates {
        match WordList::from_path(path) {
            Ok(list) if !list.is_empty() => {
                info!(path, words = list.len(), "word list loaded");
                return Arc::new(list);
            }
            Ok(_) => warn!(path, "word list is empty; skipping"),
            Err(e) => {
                if config.words_path.is_some() {
                    warn!(path, error = %e, "configured word list unreadable");
                }
            }
        }
    }

    warn!("no word list available — every word will be accepted (development mode)");
    Arc::new(OpenLexicon)
}

#[cfg(test)]
#[path = "words_test.rs"]
mod tests;
