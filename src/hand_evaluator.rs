//! Omaha showdown evaluation: exactly two hole cards and exactly three board
//! cards, best of the 60 combinations.

use itertools::Itertools;

use crate::cards::Card;
use crate::error::{PloError, PloResult};
use crate::rank_cache::RankCache;

pub const HOLE_CARDS: usize = 4;
pub const BOARD_CARDS: usize = 5;
pub const COMBINATIONS: usize = 60;

/// Receives every table lookup the evaluator makes.
pub trait LookupObserver {
    fn on_lookup(&mut self, hand: &[Card; 5], rank: u32);
}

impl<F: FnMut(&[Card; 5], u32)> LookupObserver for F {
    fn on_lookup(&mut self, hand: &[Card; 5], rank: u32) {
        self(hand, rank)
    }
}

/// Counts lookups.
#[derive(Debug, Default, Clone, Copy)]
pub struct LookupCounter {
    pub lookups: u64,
}

impl LookupObserver for LookupCounter {
    fn on_lookup(&mut self, _hand: &[Card; 5], _rank: u32) {
        self.lookups += 1;
    }
}

/// All 2-of-4 hole by 3-of-5 board hands, hole cards first.
pub fn combinations<'a>(
    hole: &'a [Card; HOLE_CARDS],
    board: &'a [Card; BOARD_CARDS],
) -> impl Iterator<Item = [Card; 5]> + 'a {
    hole.iter()
        .tuple_combinations()
        .cartesian_product(board.iter().tuple_combinations().collect::<Vec<_>>())
        .map(|((h1, h2), (b1, b2, b3))| [*h1, *h2, *b1, *b2, *b3])
}

#[derive(Debug, Clone, Copy)]
pub struct OmahaEvaluator<'a> {
    cache: &'a RankCache,
}

impl<'a> OmahaEvaluator<'a> {
    pub fn new(cache: &'a RankCache) -> Self {
        OmahaEvaluator { cache }
    }

    pub fn cache(&self) -> &'a RankCache {
        self.cache
    }

    /// Lowest (strongest) rank over the 60 combinations.
    pub fn best_rank(&self, hole: &[Card; HOLE_CARDS], board: &[Card; BOARD_CARDS]) -> PloResult<u32> {
        Ok(self.best_hand(hole, board)?.0)
    }

    pub fn best_rank_with<O: LookupObserver + ?Sized>(
        &self,
        hole: &[Card; HOLE_CARDS],
        board: &[Card; BOARD_CARDS],
        observer: &mut O,
    ) -> PloResult<u32> {
        Ok(self.best_hand_with(hole, board, observer)?.0)
    }

    /// Best rank together with the five cards that make it. On equal ranks
    /// the first combination enumerated is kept.
    pub fn best_hand(
        &self,
        hole: &[Card; HOLE_CARDS],
        board: &[Card; BOARD_CARDS],
    ) -> PloResult<(u32, [Card; 5])> {
        self.best_hand_with(hole, board, &mut |_: &[Card; 5], _: u32| {})
    }

    pub fn best_hand_with<O: LookupObserver + ?Sized>(
        &self,
        hole: &[Card; HOLE_CARDS],
        board: &[Card; BOARD_CARDS],
        observer: &mut O,
    ) -> PloResult<(u32, [Card; 5])> {
        let mut hands = combinations(hole, board);
        // combinations() is a fixed 6 x 10 product, never empty
        let first = hands.next().ok_or_else(|| {
            PloError::InvalidValue("no five-card combinations to evaluate".to_string())
        })?;
        let rank = self.cache.rank(&first)?;
        observer.on_lookup(&first, rank);
        hands.try_fold((rank, first), |best, hand| -> PloResult<(u32, [Card; 5])> {
            let rank = self.cache.rank(&hand)?;
            observer.on_lookup(&hand, rank);
            Ok(if rank < best.0 { (rank, hand) } else { best })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;

    #[test]
    fn test_combination_count_and_shape() {
        let hole: [Card; 4] = parse_cards("AsKsQsJs").unwrap().try_into().unwrap();
        let board: [Card; 5] = parse_cards("2h3h4h5h6h").unwrap().try_into().unwrap();
        let all: Vec<[Card; 5]> = combinations(&hole, &board).collect();
        assert_eq!(all.len(), COMBINATIONS);
        for hand in &all {
            assert_eq!(hand[..2].iter().filter(|c| hole.contains(c)).count(), 2);
            assert_eq!(hand[2..].iter().filter(|c| board.contains(c)).count(), 3);
        }
    }

    #[test]
    fn test_best_hand_is_enumerated_minimum() {
        let cache = RankCache::shared();
        let hole: [Card; 4] = parse_cards("KsKh8d7c").unwrap().try_into().unwrap();
        let board: [Card; 5] = parse_cards("Kd8s7h2c2s").unwrap().try_into().unwrap();
        let expected = combinations(&hole, &board)
            .map(|hand| (cache.rank(&hand).unwrap(), hand))
            .min_by_key(|(rank, _)| *rank)
            .unwrap();
        let (rank, cards) = OmahaEvaluator::new(cache).best_hand(&hole, &board).unwrap();
        assert_eq!(rank, expected.0);
        assert_eq!(cache.rank(&cards).unwrap(), rank);
        assert!(rank < cache.worst_rank());
    }

    #[test]
    fn test_missing_key_propagates() {
        let empty = RankCache::default();
        let hole: [Card; 4] = parse_cards("AsKsQsJs").unwrap().try_into().unwrap();
        let board: [Card; 5] = parse_cards("2h3h4h5h6h").unwrap().try_into().unwrap();
        let err = OmahaEvaluator::new(&empty).best_rank(&hole, &board).unwrap_err();
        assert!(matches!(err, PloError::HandNotFound(_)));
    }
}
