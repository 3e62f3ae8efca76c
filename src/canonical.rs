//! Suit canonicalization.
//!
//! Two hands that differ only by a renaming of suits have the same strength, so
//! the rank table only stores one representative per equivalence class. This
//! module produces that representative and a [`SuitMapping`] describing which
//! canonical labels each raw suit was given, so a second set of cards (hole
//! cards against a board, say) can be relabeled consistently with the first.

use std::fmt;

use tracing::warn;

use crate::cards::{sort_descending, Card, Suit, ALL_SUITS};

/// Upper bound on relabeling passes. Hands of up to five cards settle after at
/// most three.
const MAX_PASSES: usize = 8;

/// A set of canonical suits, one bit per suit in canonical order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SuitSet(u8);

impl SuitSet {
    pub const EMPTY: SuitSet = SuitSet(0);
    pub const ALL: SuitSet = SuitSet(0b1111);

    pub fn single(suit: Suit) -> SuitSet {
        SuitSet(1 << suit.index())
    }

    /// The first `k` canonical suits.
    pub fn prefix(k: usize) -> SuitSet {
        SuitSet(((1u16 << k.min(4)) - 1) as u8)
    }

    pub fn contains(self, suit: Suit) -> bool {
        self.0 & (1 << suit.index()) != 0
    }

    pub fn with(self, suit: Suit) -> SuitSet {
        SuitSet(self.0 | (1 << suit.index()))
    }

    pub fn without(self, suit: Suit) -> SuitSet {
        SuitSet(self.0 & !(1 << suit.index()))
    }

    pub fn union(self, other: SuitSet) -> SuitSet {
        SuitSet(self.0 | other.0)
    }

    pub fn intersection(self, other: SuitSet) -> SuitSet {
        SuitSet(self.0 & other.0)
    }

    pub fn difference(self, other: SuitSet) -> SuitSet {
        SuitSet(self.0 & !other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowest member in canonical order.
    pub fn first(self) -> Option<Suit> {
        if self.is_empty() {
            None
        } else {
            Some(Suit::from_index(self.0.trailing_zeros() as usize))
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Suit> {
        ALL_SUITS.into_iter().filter(move |&s| self.contains(s))
    }
}

impl fmt::Debug for SuitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for SuitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.iter().map(|s| s.to_char().to_string()).collect();
        write!(f, "{{{}}}", labels.join(","))
    }
}

/// State of one raw suit's constraint variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuitSlot {
    #[default]
    Unseen,
    /// Two or more canonical suits remain possible.
    Candidates(SuitSet),
    Resolved(Suit),
}

impl SuitSlot {
    /// Collapses a set into the matching state: empty is unseen, one member is
    /// resolved.
    pub fn from_set(set: SuitSet) -> SuitSlot {
        match set.len() {
            0 => SuitSlot::Unseen,
            1 => set.first().map_or(SuitSlot::Unseen, SuitSlot::Resolved),
            _ => SuitSlot::Candidates(set),
        }
    }

    pub fn candidates(self) -> SuitSet {
        match self {
            SuitSlot::Unseen => SuitSet::EMPTY,
            SuitSlot::Candidates(set) => set,
            SuitSlot::Resolved(suit) => SuitSet::single(suit),
        }
    }

    pub fn resolved(self) -> Option<Suit> {
        match self {
            SuitSlot::Resolved(suit) => Some(suit),
            _ => None,
        }
    }
}

/// Raw suit to canonical suit constraints, indexed by raw suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuitMapping {
    slots: [SuitSlot; 4],
}

impl SuitMapping {
    pub fn get(&self, raw: Suit) -> SuitSlot {
        self.slots[raw.index()]
    }

    pub fn set(&mut self, raw: Suit, slot: SuitSlot) {
        self.slots[raw.index()] = slot;
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| *s == SuitSlot::Unseen)
    }

    /// True once every observed suit maps to exactly one canonical suit.
    pub fn is_resolved(&self) -> bool {
        self.slots
            .iter()
            .all(|s| !matches!(s, SuitSlot::Candidates(_)))
    }

    /// Observed raw suits with their slots, in canonical order.
    pub fn entries(&self) -> impl Iterator<Item = (Suit, SuitSlot)> + '_ {
        ALL_SUITS
            .into_iter()
            .map(|s| (s, self.get(s)))
            .filter(|(_, slot)| *slot != SuitSlot::Unseen)
    }

    /// Canonical labels already claimed by a resolved raw suit other than `except`.
    fn locked(&self, except: Suit) -> SuitSet {
        self.entries()
            .filter(|(raw, _)| *raw != except)
            .filter_map(|(_, slot)| slot.resolved())
            .fold(SuitSet::EMPTY, SuitSet::with)
    }

    /// Maps each raw suit through `self` and then through `next`.
    fn then(&self, next: &SuitMapping) -> SuitMapping {
        let mut composed = SuitMapping::default();
        for (raw, slot) in self.entries() {
            let image = slot
                .candidates()
                .iter()
                .map(|label| next.get(label).candidates())
                .fold(SuitSet::EMPTY, SuitSet::union);
            let slot = if image.is_empty() { slot } else { SuitSlot::from_set(image) };
            composed.set(raw, slot);
        }
        composed
    }
}

impl fmt::Display for SuitMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .map(|(raw, slot)| format!("{}->{}", raw.to_char(), slot.candidates()))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub cards: Vec<Card>,
    pub mapping: SuitMapping,
}

/// Canonicalizes `cards` and reports how each raw suit was relabeled.
///
/// The output keeps every rank, is sorted descending by rank then canonical
/// suit, and is identical for any two inputs that differ only by a permutation
/// of suits. Normalizing an already normalized hand returns it unchanged.
pub fn normalize(cards: &[Card]) -> Normalized {
    if cards.is_empty() {
        return Normalized {
            cards: Vec::new(),
            mapping: SuitMapping::default(),
        };
    }

    let (mut current, mut mapping) = relabel_pass(cards);
    for _ in 0..MAX_PASSES {
        let (next, next_mapping) = relabel_pass(&current);
        if next == current {
            break;
        }
        mapping = mapping.then(&next_mapping);
        current = next;
    }

    Normalized {
        cards: current,
        mapping,
    }
}

pub fn normalize_cards(cards: &[Card]) -> Vec<Card> {
    normalize(cards).cards
}

/// One relabeling sweep over `cards`.
fn relabel_pass(cards: &[Card]) -> (Vec<Card>, SuitMapping) {
    // Rank set per raw suit. Comparing the masks numerically orders suits by
    // their descending rank lists without looking at suit names.
    let mut signature = [0u16; 4];
    for card in cards {
        signature[card.suit.index()] |= 1 << card.rank.index();
    }

    let mut sorted = cards.to_vec();
    sorted.sort_by(|a, b| {
        b.rank
            .cmp(&a.rank)
            .then_with(|| signature[b.suit.index()].cmp(&signature[a.suit.index()]))
            .then_with(|| a.suit.cmp(&b.suit))
    });

    let mut global: [Option<Suit>; 4] = [None; 4];
    let mut next_label = 0;
    for card in &sorted {
        let slot = &mut global[card.suit.index()];
        if slot.is_none() {
            *slot = Some(Suit::from_index(next_label));
            next_label += 1;
        }
    }
    let global_of = |suit: Suit| global[suit.index()].unwrap_or(suit);

    let mut pinned: [Option<Suit>; 4] = [None; 4];
    let mut grouped: [Option<SuitSet>; 4] = [None; 4];
    let mut labeled = Vec::with_capacity(sorted.len());

    let mut start = 0;
    while start < sorted.len() {
        let rank = sorted[start].rank;
        let end = sorted[start..]
            .iter()
            .position(|c| c.rank != rank)
            .map_or(sorted.len(), |offset| start + offset);
        let group = &sorted[start..end];

        if let [card] = group {
            let label = global_of(card.suit);
            pinned[card.suit.index()] = Some(label);
            labeled.push(card.with_suit(label));
        } else {
            let mut raw: Vec<Suit> = group.iter().map(|c| c.suit).collect();
            raw.sort_by_key(|&s| global_of(s));
            let candidates = SuitSet::prefix(raw.len());
            for (i, suit) in raw.into_iter().enumerate() {
                labeled.push(Card::new(rank, Suit::from_index(i)));
                let entry = &mut grouped[suit.index()];
                *entry = Some(entry.map_or(candidates, |set| set.intersection(candidates)));
            }
        }
        start = end;
    }

    let mut mapping = SuitMapping::default();
    for suit in ALL_SUITS {
        let slot = match (pinned[suit.index()], grouped[suit.index()]) {
            (Some(label), _) => SuitSlot::Resolved(label),
            (None, Some(set)) => SuitSlot::from_set(set),
            (None, None) => SuitSlot::Unseen,
        };
        mapping.set(suit, slot);
    }

    sort_descending(&mut labeled);
    (labeled, mapping)
}

/// Relabels `cards` so they agree with a mapping produced by [`normalize`] on
/// a reference hand, instead of being canonicalized on their own.
///
/// Ambiguous raw suits are settled on first use by the earliest candidate no
/// other raw suit owns yet. Suits the reference never saw, and ambiguous suits
/// whose candidates are all owned, take the earliest canonical suit nobody
/// owns. Distinct raw suits therefore never share a label.
pub fn normalize_dependent(mapping: &SuitMapping, cards: &[Card]) -> Vec<Card> {
    let mut working = *mapping;
    let mut out = Vec::with_capacity(cards.len());
    for card in cards {
        let raw = card.suit;
        let label = match working.get(raw) {
            SuitSlot::Resolved(label) => Some(label),
            slot => {
                let locked = working.locked(raw);
                let choice = slot
                    .candidates()
                    .difference(locked)
                    .first()
                    .or_else(|| SuitSet::ALL.difference(locked).first());
                match choice {
                    Some(label) => working.set(raw, SuitSlot::Resolved(label)),
                    None => warn!(card = %card, "no canonical suit left, keeping raw suit"),
                }
                choice
            }
        };
        out.push(label.map_or(*card, |l| card.with_suit(l)));
    }

    sort_descending(&mut out);
    out
}
