//! Exhaustive five-card classifier. Only the rank table generator calls this;
//! simulations go through the precomputed table instead.

use std::cmp::Ordering;
use std::fmt;

use crate::cards::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl HandCategory {
    pub fn label(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
            HandCategory::RoyalFlush => "Royal Flush",
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Category plus tie-break values. Greater means stronger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandValue {
    pub category: HandCategory,
    pub kickers: Vec<u8>,
}

impl HandValue {
    pub fn new(category: HandCategory, kickers: Vec<u8>) -> Self {
        HandValue { category, kickers }
    }
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)
    }
}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.category.cmp(&other.category) {
            Ordering::Equal => self.kickers.cmp(&other.kickers),
            ord => ord,
        }
    }
}

fn is_flush(cards: &[Card]) -> bool {
    cards.windows(2).all(|w| w[0].suit == w[1].suit)
}

/// High card of a straight over five values sorted descending, with the wheel
/// (A-2-3-4-5) reported as 5-high.
fn straight_high(values: &[u8; 5]) -> Option<u8> {
    let distinct = values.windows(2).all(|w| w[0] != w[1]);
    if !distinct {
        return None;
    }
    if values[0] - values[4] == 4 {
        return Some(values[0]);
    }
    if *values == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

pub fn evaluate_five(cards: &[Card; 5]) -> HandValue {
    let mut values = [0u8; 5];
    for (slot, card) in values.iter_mut().zip(cards) {
        *slot = card.value();
    }
    values.sort_unstable_by(|a, b| b.cmp(a));

    let flush = is_flush(cards);
    let straight = straight_high(&values);

    if let (true, Some(high)) = (flush, straight) {
        if high == 14 {
            return HandValue::new(HandCategory::RoyalFlush, vec![14]);
        }
        return HandValue::new(HandCategory::StraightFlush, vec![high]);
    }

    let mut counts = [0u8; 15];
    for &v in &values {
        counts[v as usize] += 1;
    }

    // (count, value), most frequent first, then highest value
    let mut freq: Vec<(u8, u8)> = (2..=14u8)
        .rev()
        .filter(|&v| counts[v as usize] > 0)
        .map(|v| (counts[v as usize], v))
        .collect();
    freq.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    let grouped: Vec<u8> = freq.iter().map(|&(_, v)| v).collect();

    match (freq[0].0, freq.get(1).map(|f| f.0)) {
        (4, _) => HandValue::new(HandCategory::FourOfAKind, grouped),
        (3, Some(2)) => HandValue::new(HandCategory::FullHouse, grouped),
        _ if flush => HandValue::new(HandCategory::Flush, values.to_vec()),
        _ if straight.is_some() => {
            HandValue::new(HandCategory::Straight, straight.into_iter().collect())
        }
        (3, _) => HandValue::new(HandCategory::ThreeOfAKind, grouped),
        (2, Some(2)) => HandValue::new(HandCategory::TwoPair, grouped),
        (2, _) => HandValue::new(HandCategory::OnePair, grouped),
        _ => HandValue::new(HandCategory::HighCard, values.to_vec()),
    }
}
