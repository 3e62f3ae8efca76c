use std::collections::HashSet;

use plo_equity::cards::*;
use plo_equity::config::SimulationConfig;
use plo_equity::equity::SimulationEngine;
use plo_equity::observer::NoopObserver;
use plo_equity::rank_cache::RankCache;
use plo_equity::ranker::*;
use plo_equity::stats::StoppingRule;

fn hole(notation: &str) -> HoleHand {
    parse_cards(notation).unwrap().try_into().unwrap()
}

#[test]
fn test_canonical_hole_hand_count() {
    let hands = canonical_hole_hands();
    assert_eq!(hands.len(), 14_196);
    assert_eq!(format_cards(&hands[0]), "AsAhAdAc");
    let unique: HashSet<HoleHand> = hands.iter().copied().collect();
    assert_eq!(unique.len(), hands.len());
}

#[test]
fn test_rank_hole_hands_sorted_by_win_rate() {
    let config = SimulationConfig::default().with_threads(2).with_seed(13).with_stopping(StoppingRule {
        min_trials: 2_000,
        max_sigma: 0.02,
        max_half_width: 0.04,
    });
    let engine = SimulationEngine::new(RankCache::shared(), config).unwrap();
    let hands = dedup_canonical(&[hole("7s6h3d2c"), hole("AsAhKsKh"), hole("AdAcKdKc")]);
    assert_eq!(hands.len(), 2);

    let rankings = rank_hole_hands(&engine, &hands, &NoopObserver).unwrap();
    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[0].hand, "AsAhKsKh");
    assert!(rankings[0].result.win_rate >= rankings[1].result.win_rate);
    assert!(rankings.iter().all(|r| r.result.trials >= 2_000));

    let mut csv = Vec::new();
    write_csv(&rankings, &mut csv).unwrap();
    let text = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].starts_with("1,AsAhKsKh,"));
    assert!(lines[2].starts_with("2,7s6h3d2c,"));
}
