//! Five-card strength table keyed by canonical hand.
//!
//! Keys are always built with [`HandKey::of`], which canonicalizes the cards
//! first. The generator and every lookup go through that one function, so a
//! table built here (or written by [`RankCache::save`] and read back) contains
//! every key the evaluator can produce.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use itertools::Itertools;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use tracing::info;

use crate::canonical::normalize_cards;
use crate::cards::{full_deck, parse_cards, Card};
use crate::error::{PloError, PloResult};
use crate::hand_value::{evaluate_five, HandValue};

pub const TABLE_HEADER: &str = "normalized_hand,hand_rank,hand_type";

static SHARED: Lazy<RankCache> = Lazy::new(RankCache::generate);

/// Five cards packed six bits apiece, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandKey(u32);

impl HandKey {
    pub fn of(cards: &[Card; 5]) -> HandKey {
        HandKey::pack(&normalize_cards(cards))
    }

    fn pack(cards: &[Card]) -> HandKey {
        HandKey(
            cards
                .iter()
                .fold(0u32, |acc, card| (acc << 6) | card.index() as u32),
        )
    }

    /// Reads a 10-character key as written in the table. The cards are taken
    /// literally, not re-canonicalized.
    pub fn parse(text: &str) -> PloResult<HandKey> {
        let cards = parse_cards(text)?;
        if cards.len() != 5 {
            return Err(PloError::InvalidHandNotation(text.to_string()));
        }
        Ok(HandKey::pack(&cards))
    }

    pub fn cards(self) -> [Card; 5] {
        let mut cards = [Card::from_index(0); 5];
        for (i, slot) in cards.iter_mut().enumerate() {
            let shift = 6 * (4 - i);
            *slot = Card::from_index(((self.0 >> shift) & 0x3f) as u8);
        }
        cards
    }
}

impl fmt::Display for HandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for card in self.cards() {
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}

/// Canonical hand to dense strength rank, 1 being the best hand.
///
/// Immutable once built, so any number of threads can read it through a
/// shared reference.
#[derive(Debug, Clone, Default)]
pub struct RankCache {
    ranks: HashMap<HandKey, u32>,
}

impl RankCache {
    /// Process-wide table, generated on first use.
    pub fn shared() -> &'static RankCache {
        &SHARED
    }

    /// Classifies all 2,598,960 five-card hands and assigns dense ranks.
    /// Hands of equal strength share a rank.
    pub fn generate() -> RankCache {
        let started = Instant::now();
        let full = full_deck();
        let deck = &full;

        let mut keys: Vec<HandKey> = (0..deck.len())
            .into_par_iter()
            .flat_map_iter(move |first| {
                deck[first + 1..]
                    .iter()
                    .combinations(4)
                    .map(move |rest| HandKey::of(&[deck[first], *rest[0], *rest[1], *rest[2], *rest[3]]))
            })
            .collect();
        keys.par_sort_unstable();
        keys.dedup();

        let valued: Vec<(HandKey, HandValue)> = keys
            .into_par_iter()
            .map(|key| (key, evaluate_five(&key.cards())))
            .collect();

        let mut strengths: Vec<&HandValue> = valued.iter().map(|(_, v)| v).collect();
        strengths.sort_unstable_by(|a, b| b.cmp(a));
        strengths.dedup();

        let ranks: HashMap<HandKey, u32> = valued
            .iter()
            .map(|(key, value)| {
                let position = strengths
                    .binary_search_by(|probe| value.cmp(*probe))
                    .unwrap_or_else(|insert_at| insert_at);
                (*key, position as u32 + 1)
            })
            .collect();

        info!(
            keys = ranks.len(),
            distinct_ranks = strengths.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated rank table"
        );
        RankCache { ranks }
    }

    /// Parses the text table: a header line, then `key,rank[,label]` rows.
    pub fn from_reader<R: BufRead>(reader: R) -> PloResult<RankCache> {
        let mut ranks = HashMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            if i == 0 || line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split(',');
            let (key, rank) = match (parts.next(), parts.next()) {
                (Some(key), Some(rank)) => (key.trim(), rank.trim()),
                _ => {
                    return Err(PloError::MalformedTable {
                        line: line_no,
                        reason: "expected key,rank".to_string(),
                    })
                }
            };
            let key = HandKey::parse(key).map_err(|e| PloError::MalformedTable {
                line: line_no,
                reason: e.to_string(),
            })?;
            let rank: u32 = match rank.parse() {
                Ok(r) if r > 0 => r,
                _ => {
                    return Err(PloError::MalformedTable {
                        line: line_no,
                        reason: format!("rank must be a positive integer, got '{}'", rank),
                    })
                }
            };
            ranks.insert(key, rank);
        }
        info!(keys = ranks.len(), "loaded rank table");
        Ok(RankCache { ranks })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> PloResult<RankCache> {
        let file = File::open(path)?;
        RankCache::from_reader(BufReader::new(file))
    }

    /// Writes the table sorted by rank, then key, with the hand type as a
    /// third column.
    pub fn write_to<W: Write>(&self, mut writer: W) -> PloResult<()> {
        writeln!(writer, "{}", TABLE_HEADER)?;
        let rows = self
            .ranks
            .iter()
            .sorted_by_key(|(key, rank)| (**rank, **key));
        for (key, rank) in rows {
            let category = evaluate_five(&key.cards()).category;
            writeln!(writer, "{},{},{}", key, rank, category)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PloResult<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Strength rank of five cards. A missing key means the table is corrupt
    /// or incomplete.
    pub fn rank(&self, cards: &[Card; 5]) -> PloResult<u32> {
        let key = HandKey::of(cards);
        self.ranks
            .get(&key)
            .copied()
            .ok_or_else(|| PloError::HandNotFound(key.to_string()))
    }

    /// Checked variant of [`RankCache::rank`] for untrusted input.
    pub fn rank_cards(&self, cards: &[Card]) -> PloResult<u32> {
        let five: [Card; 5] = cards.try_into().map_err(|_| PloError::InvalidHandSize {
            who: "Evaluated".to_string(),
            expected: 5,
            got: cards.len(),
        })?;
        if let Some(card) = first_duplicate(&five) {
            return Err(PloError::DuplicateCard {
                who: "Evaluated".to_string(),
                card,
            });
        }
        self.rank(&five)
    }

    pub fn rank_str(&self, notation: &str) -> PloResult<u32> {
        self.rank_cards(&parse_cards(notation)?)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Largest rank in the table, i.e. the number of distinct strengths.
    pub fn worst_rank(&self) -> u32 {
        self.ranks.values().copied().max().unwrap_or(0)
    }
}

pub(crate) fn first_duplicate(cards: &[Card]) -> Option<Card> {
    let mut seen = [false; 52];
    for card in cards {
        let slot = &mut seen[card.index() as usize];
        if *slot {
            return Some(*card);
        }
        *slot = true;
    }
    None
}
