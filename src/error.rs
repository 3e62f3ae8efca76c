use thiserror::Error;

use crate::cards::Card;

#[derive(Error, Debug)]
pub enum PloError {
    #[error("Invalid rank: {0}")]
    InvalidRank(char),

    #[error("Invalid suit: {0}")]
    InvalidSuit(char),

    #[error("Invalid card notation: {0}")]
    InvalidCardNotation(String),

    #[error("Invalid hand notation: {0}")]
    InvalidHandNotation(String),

    #[error("{who} hand must be exactly {expected} cards, got {got}")]
    InvalidHandSize {
        who: String,
        expected: usize,
        got: usize,
    },

    #[error("{who} hand contains {card} more than once")]
    DuplicateCard { who: String, card: Card },

    #[error("Card {card} is used by both {first} and {second}")]
    CardConflict {
        card: Card,
        first: String,
        second: String,
    },

    #[error("Cannot deal {requested} cards, only {available} remaining")]
    NotEnoughDeck { requested: usize, available: usize },

    #[error("Hand not found in rank table: {0}")]
    HandNotFound(String),

    #[error("Malformed rank table at line {line}: {reason}")]
    MalformedTable { line: usize, reason: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Simulation worker {0} terminated abnormally")]
    WorkerPanicked(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PloError {
    /// Rejected input that never reached the sampler.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PloError::InvalidRank(_)
                | PloError::InvalidSuit(_)
                | PloError::InvalidCardNotation(_)
                | PloError::InvalidHandNotation(_)
                | PloError::InvalidHandSize { .. }
                | PloError::DuplicateCard { .. }
                | PloError::CardConflict { .. }
                | PloError::NotEnoughDeck { .. }
                | PloError::InvalidValue(_)
        )
    }

    /// A corrupted or incomplete rank table, or a lost worker. Never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PloError::HandNotFound(_) | PloError::MalformedTable { .. } | PloError::WorkerPanicked(_)
        )
    }
}

pub type PloResult<T> = Result<T, PloError>;
