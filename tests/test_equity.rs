use approx::assert_abs_diff_eq;

use plo_equity::cards::{format_cards, full_deck, parse_cards};
use plo_equity::config::SimulationConfig;
use plo_equity::equity::*;
use plo_equity::error::PloError;
use plo_equity::observer::{CountingObserver, SimulationObserver};
use plo_equity::rank_cache::RankCache;
use plo_equity::stats::{is_checkpoint, Estimate, StoppingRule};

fn engine(config: SimulationConfig) -> SimulationEngine<'static> {
    SimulationEngine::new(RankCache::shared(), config).unwrap()
}

fn query(hero: &str, opponents: &[&str]) -> EquityQuery {
    EquityQuery::parse(hero, opponents).unwrap()
}

fn loose(min_trials: u64) -> StoppingRule {
    StoppingRule {
        min_trials,
        max_sigma: 1.0,
        max_half_width: 1.0,
    }
}

#[test]
fn test_seeded_single_thread_is_reproducible() {
    let config = SimulationConfig::single_threaded()
        .with_seed(2024)
        .with_stopping(loose(2_000));
    let q = query("KsKh8d7c", &["AsAc5d5c"]);
    let a = engine(config).run(&q).unwrap();
    let b = engine(config).run(&q).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.trials, 2_000);
}

#[test]
fn test_different_seeds_differ() {
    let base = SimulationConfig::single_threaded().with_stopping(loose(3_000));
    let q = query("KsKh8d7c", &[]);
    let a = engine(base.with_seed(1)).run(&q).unwrap();
    let b = engine(base.with_seed(2)).run(&q).unwrap();
    assert_ne!(a.wins, b.wins);
}

#[test]
fn test_never_stops_before_min_trials() {
    let config = SimulationConfig::single_threaded()
        .with_seed(5)
        .with_stopping(loose(5_000));
    let result = engine(config).run(&query("AsAhKsKh", &[])).unwrap();
    assert_eq!(result.trials, 5_000);
    assert!(is_checkpoint(result.trials));
}

#[test]
fn test_default_thresholds_hold() {
    let config = SimulationConfig::single_threaded().with_seed(9);
    let rule = config.stopping;
    let result = engine(config).run(&query("KsKh8d7c", &["AsAc5d5c"])).unwrap();
    assert!(result.trials >= rule.min_trials);
    assert!(result.standard_deviation <= rule.max_sigma);
    assert!(result.confidence_half_width <= rule.max_half_width);
    assert!(is_checkpoint(result.trials));
    assert_abs_diff_eq!(
        result.win_rate,
        result.wins as f64 / result.trials as f64,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        result.confidence_half_width,
        1.96 * result.standard_deviation,
        epsilon = 1e-12
    );
}

#[test]
fn test_kings_against_aces_converges() {
    let config = SimulationConfig::default().with_seed(77);
    let result = engine(config).run(&query("KsKh8d7c", &["AsAc5d5c"])).unwrap();
    assert!(
        result.win_rate > 0.24 && result.win_rate < 0.36,
        "KsKh8d7c vs AsAc5d5c: {}",
        result
    );
}

#[test]
fn test_strong_hand_against_random_opponent() {
    let config = SimulationConfig::default().with_seed(3);
    let aces = engine(config).run(&query("AsAhKsKh", &[])).unwrap();
    let trash = engine(config).run(&query("7s6h3d2c", &[])).unwrap();
    assert!(aces.win_rate > 0.62, "AsAhKsKh: {}", aces);
    assert!(trash.win_rate < 0.42, "7s6h3d2c: {}", trash);
}

#[test]
fn test_parallel_agrees_with_single_thread() {
    let q = query("KsKh8d7c", &["AsAc5d5c"]);
    let single = engine(SimulationConfig::single_threaded().with_seed(11)).run(&q).unwrap();
    let parallel = engine(SimulationConfig::default().with_threads(4).with_seed(11))
        .run(&q)
        .unwrap();
    assert_abs_diff_eq!(
        single.win_rate,
        parallel.win_rate,
        epsilon = 2.0 * (single.confidence_half_width + parallel.confidence_half_width)
    );
}

#[test]
fn test_parallel_merges_whole_batches() {
    let config = SimulationConfig::default()
        .with_threads(3)
        .with_batch_size(250)
        .with_seed(8);
    let rule = config.stopping;
    let observer = CountingObserver::default();
    let result = engine(config)
        .run_observed(&query("AsAhKsKh", &["7s6h3d2c"]), &observer)
        .unwrap();
    assert_eq!(result.trials % 250, 0);
    assert!(result.standard_deviation <= rule.max_sigma);
    assert!(result.confidence_half_width <= rule.max_half_width);
    assert!(observer.finished());
    assert!(observer.checkpoints() >= 1);
    assert!(observer.batch_trials() >= result.trials);
}

#[test]
fn test_single_thread_reports_checkpoints() {
    let observer = CountingObserver::default();
    let config = SimulationConfig::single_threaded()
        .with_seed(4)
        .with_stopping(loose(1_000));
    engine(config)
        .run_observed(&query("AsAhKsKh", &[]), &observer)
        .unwrap();
    // 100, 200, ..., 1000
    assert_eq!(observer.checkpoints(), 10);
    assert_eq!(observer.batches(), 0);
    assert!(observer.finished());
}

#[test]
fn test_more_opponents_lower_win_rate() {
    let config = SimulationConfig::single_threaded()
        .with_seed(21)
        .with_stopping(loose(5_000));
    let one = engine(config).run(&query("JsTh9s8h", &["AsAdKcQd"])).unwrap();
    let two = engine(config)
        .run(&query("JsTh9s8h", &["AsAdKcQd", "7c7d6c5d"]))
        .unwrap();
    assert!(two.win_rate < one.win_rate + one.confidence_half_width);
}

#[test]
fn test_card_conflict_fails_before_sampling() {
    let err = EquityQuery::parse("AsKsQsJs", &["AsAh2c3d"]).unwrap_err();
    match err {
        PloError::CardConflict { card, first, second } => {
            assert_eq!(card.to_string(), "As");
            assert_eq!(first, "Hero");
            assert_eq!(second, "Opponent 1");
        }
        other => panic!("expected card conflict, got {}", other),
    }

    let err = EquityQuery::parse("AsKsQsJs", &["2c3c4c5c", "6d7d8d2c"]).unwrap_err();
    assert!(matches!(err, PloError::CardConflict { ref second, .. } if second == "Opponent 2"));
    assert!(err.is_input_error());
}

#[test]
fn test_hand_validation() {
    assert!(matches!(
        EquityQuery::parse("AsKs", &[] as &[&str]),
        Err(PloError::InvalidHandSize { expected: 4, got: 2, .. })
    ));
    assert!(matches!(
        EquityQuery::parse("AsKsQsJs", &["2c3c4c"]),
        Err(PloError::InvalidHandSize { got: 3, .. })
    ));
    assert!(matches!(
        EquityQuery::parse("AsAsQsJs", &[] as &[&str]),
        Err(PloError::DuplicateCard { .. })
    ));
    assert!(EquityQuery::parse("AsKsQsJx", &[] as &[&str]).is_err());
}

/// Every card outside "AsAhAdAc" split into four-card hands.
fn remaining_hands() -> Vec<String> {
    let hero = parse_cards("AsAhAdAc").unwrap();
    let rest: Vec<_> = full_deck().into_iter().filter(|c| !hero.contains(c)).collect();
    rest.chunks(4).map(format_cards).collect()
}

#[test]
fn test_too_many_opponents_rejected() {
    let hands = remaining_hands();
    assert_eq!(hands.len(), 12);

    let err = EquityQuery::parse("AsAhAdAc", &hands[..]).unwrap_err();
    assert!(matches!(err, PloError::NotEnoughDeck { requested: 5, available: 0 }));
    assert!(err.is_input_error());

    // 11 opponents leave four cards, one short of a board
    let err = EquityQuery::parse("AsAhAdAc", &hands[..11]).unwrap_err();
    assert!(matches!(err, PloError::NotEnoughDeck { requested: 5, available: 4 }));

    let q = query("AsAhAdAc", &hands[..10].iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(q.opponents().len(), 10);
    let config = SimulationConfig::default()
        .with_threads(2)
        .with_seed(6)
        .with_stopping(loose(200));
    let result = engine(config).run(&q).unwrap();
    assert!(result.trials >= 200);
}

struct PanicsAtCheckpoint;

impl SimulationObserver for PanicsAtCheckpoint {
    fn on_checkpoint(&self, _estimate: &Estimate) {
        panic!("checkpoint hook failed");
    }
}

#[test]
fn test_worker_panic_surfaces_as_error() {
    let config = SimulationConfig::default().with_threads(3).with_seed(17);
    let result = engine(config).run_observed(&query("AsAhKsKh", &[]), &PanicsAtCheckpoint);
    match result {
        Err(PloError::WorkerPanicked(index)) => assert!(index < 3),
        other => panic!("expected worker panic, got {:?}", other),
    }
}

#[test]
fn test_invalid_config_rejected() {
    let config = SimulationConfig::default().with_batch_size(0);
    assert!(SimulationEngine::new(RankCache::shared(), config).is_err());
}

#[test]
fn test_result_json() {
    let result = SimulationResult {
        win_rate: 0.25,
        standard_deviation: 0.004,
        confidence_half_width: 0.00784,
        trials: 12_000,
        wins: 3_000,
    };
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"win_rate\":0.25"));
    let back: SimulationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}
