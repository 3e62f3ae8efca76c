pub mod canonical;
pub mod cards;
pub mod config;
pub mod display;
pub mod equity;
pub mod error;
pub mod hand_evaluator;
pub mod hand_value;
pub mod observer;
pub mod rank_cache;
pub mod ranker;
pub mod stats;
