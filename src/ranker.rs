//! Starting-hand ranking: every distinct hole hand simulated against one random
//! opponent and sorted by win rate.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::canonical::normalize_cards;
use crate::cards::{format_cards, full_deck, Card};
use crate::equity::{EquityQuery, SimulationEngine, SimulationResult};
use crate::error::PloResult;
use crate::hand_evaluator::HOLE_CARDS;
use crate::observer::SimulationObserver;

pub const CSV_HEADER: &str = "rank,normalized_hand,win_rate,standard_deviation,confidence_interval,simulations";

pub type HoleHand = [Card; HOLE_CARDS];

fn canonical_hole(cards: &[Card]) -> HoleHand {
    let n = normalize_cards(cards);
    [n[0], n[1], n[2], n[3]]
}

/// One representative per suit-isomorphism class of the 270,725 possible
/// hole hands, strongest-looking first.
pub fn canonical_hole_hands() -> Vec<HoleHand> {
    let full = full_deck();
    let deck = &full;
    let mut hands: Vec<HoleHand> = (0..deck.len())
        .into_par_iter()
        .flat_map_iter(move |first| {
            deck[first + 1..].iter().tuple_combinations().map(move |(a, b, c)| {
                canonical_hole(&[deck[first], *a, *b, *c])
            })
        })
        .collect();
    hands.par_sort_unstable_by(|a, b| b.cmp(a));
    hands.dedup();
    hands
}

/// Canonicalizes and dedups user-supplied hands, keeping first-seen order.
pub fn dedup_canonical(hands: &[HoleHand]) -> Vec<HoleHand> {
    hands.iter().map(|h| canonical_hole(h)).unique().collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HoleRanking {
    pub hand: String,
    #[serde(flatten)]
    pub result: SimulationResult,
}

/// Simulates each hand against a random opponent. The engine's own threads
/// parallelise each simulation; hands are processed one after another.
pub fn rank_hole_hands(
    engine: &SimulationEngine<'_>,
    hands: &[HoleHand],
    observer: &dyn SimulationObserver,
) -> PloResult<Vec<HoleRanking>> {
    let started = Instant::now();
    let mut rankings = Vec::with_capacity(hands.len());
    for (i, hand) in hands.iter().enumerate() {
        let query = EquityQuery::new(hand, &[])?;
        let result = engine.run_observed(&query, observer)?;
        debug!(
            index = i + 1,
            total = hands.len(),
            hand = %format_cards(hand),
            win_rate = result.win_rate,
            trials = result.trials,
            "ranked hole hand"
        );
        rankings.push(HoleRanking {
            hand: format_cards(hand),
            result,
        });
    }
    rankings.sort_by(|a, b| b.result.win_rate.total_cmp(&a.result.win_rate));
    info!(
        hands = rankings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "ranked hole hands"
    );
    Ok(rankings)
}

pub fn write_csv<W: Write>(rankings: &[HoleRanking], mut writer: W) -> PloResult<()> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for (i, ranking) in rankings.iter().enumerate() {
        let r = &ranking.result;
        writeln!(
            writer,
            "{},{},{:.6},{:.6},{:.6},{}",
            i + 1,
            ranking.hand,
            r.win_rate,
            r.standard_deviation,
            r.confidence_half_width,
            r.trials
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_csv<P: AsRef<Path>>(rankings: &[HoleRanking], path: P) -> PloResult<()> {
    let file = File::create(path)?;
    write_csv(rankings, BufWriter::new(file))
}
