//! Adaptive Monte-Carlo equity for Omaha hole hands.
//!
//! The engine deals random boards (and a random opponent when none is given)
//! until the running win rate is tight enough for the configured
//! [`StoppingRule`](crate::stats::StoppingRule). The rule is only evaluated at
//! checkpoints, see [`crate::stats::checkpoint_interval`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cards::{parse_cards, Card, Deck};
use crate::config::SimulationConfig;
use crate::error::{PloError, PloResult};
use crate::hand_evaluator::{OmahaEvaluator, BOARD_CARDS, HOLE_CARDS};
use crate::observer::{NoopObserver, SimulationObserver};
use crate::rank_cache::{first_duplicate, RankCache};
use crate::stats::{is_checkpoint, next_checkpoint, Tally};

/// Hero and opponents, checked for size and card conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquityQuery {
    hero: [Card; HOLE_CARDS],
    opponents: Vec<[Card; HOLE_CARDS]>,
}

fn hole_hand(who: &str, cards: &[Card]) -> PloResult<[Card; HOLE_CARDS]> {
    let hand: [Card; HOLE_CARDS] = cards.try_into().map_err(|_| PloError::InvalidHandSize {
        who: who.to_string(),
        expected: HOLE_CARDS,
        got: cards.len(),
    })?;
    if let Some(card) = first_duplicate(&hand) {
        return Err(PloError::DuplicateCard {
            who: who.to_string(),
            card,
        });
    }
    Ok(hand)
}

fn player_name(seat: usize) -> String {
    match seat {
        0 => "Hero".to_string(),
        n => format!("Opponent {}", n),
    }
}

impl EquityQuery {
    /// No opponents means one random opponent dealt fresh every trial.
    pub fn new(hero: &[Card], opponents: &[Vec<Card>]) -> PloResult<EquityQuery> {
        let hero = hole_hand(&player_name(0), hero)?;
        let opponents = opponents
            .iter()
            .enumerate()
            .map(|(i, cards)| hole_hand(&player_name(i + 1), cards))
            .collect::<PloResult<Vec<_>>>()?;

        let mut owner: [Option<usize>; 52] = [None; 52];
        let seats = std::iter::once(&hero).chain(opponents.iter());
        for (seat, hand) in seats.enumerate() {
            for card in hand {
                let slot = &mut owner[card.index() as usize];
                if let Some(first) = *slot {
                    return Err(PloError::CardConflict {
                        card: *card,
                        first: player_name(first),
                        second: player_name(seat),
                    });
                }
                *slot = Some(seat);
            }
        }

        // distinct cards, so at most 13 seats reach this point
        let available = 52 - HOLE_CARDS * (1 + opponents.len());
        let needed = BOARD_CARDS + if opponents.is_empty() { HOLE_CARDS } else { 0 };
        if available < needed {
            return Err(PloError::NotEnoughDeck {
                requested: needed,
                available,
            });
        }
        Ok(EquityQuery { hero, opponents })
    }

    pub fn parse<S: AsRef<str>>(hero: &str, opponents: &[S]) -> PloResult<EquityQuery> {
        let hero = parse_cards(hero)?;
        let opponents = opponents
            .iter()
            .map(|o| parse_cards(o.as_ref()))
            .collect::<PloResult<Vec<_>>>()?;
        EquityQuery::new(&hero, &opponents)
    }

    pub fn hero(&self) -> &[Card; HOLE_CARDS] {
        &self.hero
    }

    pub fn opponents(&self) -> &[[Card; HOLE_CARDS]] {
        &self.opponents
    }

    pub fn has_random_opponent(&self) -> bool {
        self.opponents.is_empty()
    }

    pub fn known_cards(&self) -> Vec<Card> {
        self.hero
            .iter()
            .chain(self.opponents.iter().flatten())
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub win_rate: f64,
    pub standard_deviation: f64,
    pub confidence_half_width: f64,
    pub trials: u64,
    pub wins: u64,
}

impl SimulationResult {
    pub fn from_tally(tally: &Tally) -> SimulationResult {
        let estimate = tally.estimate();
        SimulationResult {
            win_rate: estimate.win_rate,
            standard_deviation: estimate.standard_deviation,
            confidence_half_width: estimate.half_width,
            trials: tally.trials,
            wins: tally.wins,
        }
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Win {:.2}% | SD {:.4}% | 95% CI ±{:.4}% ({} trials)",
            self.win_rate * 100.0,
            self.standard_deviation * 100.0,
            self.confidence_half_width * 100.0,
            self.trials,
        )
    }
}

/// One worker's dealing state: a private deck of the unknown cards and an RNG.
struct TrialRunner<'q, 'a> {
    query: &'q EquityQuery,
    evaluator: OmahaEvaluator<'a>,
    deck: Deck,
    rng: StdRng,
}

impl<'q, 'a> TrialRunner<'q, 'a> {
    fn new(query: &'q EquityQuery, evaluator: OmahaEvaluator<'a>, rng: StdRng) -> Self {
        let deck = Deck::new(Some(&query.known_cards()));
        TrialRunner {
            query,
            evaluator,
            deck,
            rng,
        }
    }

    /// Deals one board and reports whether hero strictly beats everyone.
    fn trial(&mut self) -> PloResult<bool> {
        let random_opponent = self.query.has_random_opponent();
        let needed = BOARD_CARDS + if random_opponent { HOLE_CARDS } else { 0 };
        let dealt = self.deck.sample(&mut self.rng, needed)?;
        let board = [dealt[0], dealt[1], dealt[2], dealt[3], dealt[4]];
        let stranger = random_opponent.then(|| [dealt[5], dealt[6], dealt[7], dealt[8]]);

        let hero = self.evaluator.best_rank(&self.query.hero, &board)?;
        if let Some(hand) = stranger {
            return Ok(hero < self.evaluator.best_rank(&hand, &board)?);
        }
        for hand in &self.query.opponents {
            if self.evaluator.best_rank(hand, &board)? <= hero {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn batch(&mut self, trials: u64) -> PloResult<Tally> {
        let mut tally = Tally::default();
        for _ in 0..trials {
            tally.record(self.trial()?);
        }
        Ok(tally)
    }
}

#[derive(Debug, Default)]
struct Shared {
    tally: Tally,
    stopped: bool,
}

/// Raises the stop flag if the owning worker unwinds.
struct StopOnPanic<'s>(&'s AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

pub struct SimulationEngine<'a> {
    evaluator: OmahaEvaluator<'a>,
    config: SimulationConfig,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(cache: &'a RankCache, config: SimulationConfig) -> PloResult<Self> {
        config.validate()?;
        Ok(SimulationEngine {
            evaluator: OmahaEvaluator::new(cache),
            config,
        })
    }

    /// Engine over the process-wide generated table.
    pub fn with_shared_cache(config: SimulationConfig) -> PloResult<SimulationEngine<'static>> {
        SimulationEngine::new(RankCache::shared(), config)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn run(&self, query: &EquityQuery) -> PloResult<SimulationResult> {
        self.run_observed(query, &NoopObserver)
    }

    pub fn run_observed(
        &self,
        query: &EquityQuery,
        observer: &dyn SimulationObserver,
    ) -> PloResult<SimulationResult> {
        let result = if self.config.is_parallel() {
            self.run_parallel(query, observer)?
        } else {
            self.run_single(query, observer)?
        };
        observer.on_finish(&result);
        Ok(result)
    }

    fn run_single(
        &self,
        query: &EquityQuery,
        observer: &dyn SimulationObserver,
    ) -> PloResult<SimulationResult> {
        let mut runner = TrialRunner::new(query, self.evaluator, self.config.rng_for(0));
        let mut tally = Tally::default();
        loop {
            tally.record(runner.trial()?);
            if is_checkpoint(tally.trials) {
                let estimate = tally.estimate();
                observer.on_checkpoint(&estimate);
                if self.config.stopping.is_satisfied(&estimate) {
                    break;
                }
            }
        }
        Ok(SimulationResult::from_tally(&tally))
    }

    fn run_parallel(
        &self,
        query: &EquityQuery,
        observer: &dyn SimulationObserver,
    ) -> PloResult<SimulationResult> {
        let shared = Mutex::new(Shared::default());
        let stop = AtomicBool::new(false);
        debug!(
            threads = self.config.threads,
            batch_size = self.config.batch_size,
            "starting simulation workers"
        );

        let outcomes: Vec<PloResult<()>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.config.threads)
                .map(|index| {
                    let shared = &shared;
                    let stop = &stop;
                    scope.spawn(move || self.worker(index, query, shared, stop, observer))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(PloError::WorkerPanicked(index)))
                })
                .collect()
        });
        for outcome in outcomes {
            outcome?;
        }

        let shared = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(SimulationResult::from_tally(&shared.tally))
    }

    fn worker(
        &self,
        index: usize,
        query: &EquityQuery,
        shared: &Mutex<Shared>,
        stop: &AtomicBool,
        observer: &dyn SimulationObserver,
    ) -> PloResult<()> {
        let _guard = StopOnPanic(stop);
        let mut runner = TrialRunner::new(query, self.evaluator, self.config.rng_for(index));
        let mut merged = 0u64;

        while !stop.load(Ordering::Acquire) {
            let batch = match runner.batch(self.config.batch_size) {
                Ok(batch) => batch,
                Err(e) => {
                    stop.store(true, Ordering::Release);
                    return Err(e);
                }
            };
            observer.on_batch(index, &batch);

            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.stopped {
                break;
            }
            let before = state.tally.trials;
            state.tally.merge(&batch);
            merged += 1;
            if next_checkpoint(before) <= state.tally.trials {
                let estimate = state.tally.estimate();
                observer.on_checkpoint(&estimate);
                if self.config.stopping.is_satisfied(&estimate) {
                    state.stopped = true;
                    stop.store(true, Ordering::Release);
                }
            }
        }

        debug!(worker = index, batches = merged, "worker finished");
        Ok(())
    }
}
