use crate::core::models::{GridObjectKind, Vec2};
use thiserror::Error;

/// A map or level that cannot be loaded. Never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("map string is empty")]
    EmptyMap,
    #[error("map has no player")]
    NoPlayer,
    #[error("map has {count} players, expected exactly one")]
    MultiplePlayers { count: usize },
    #[error("level {number} has no map section")]
    MissingMap { number: usize },
    #[error("level {number} could not be read: {message}")]
    Unreadable { number: usize, message: String },
}

/// The engine found itself in a state its rules do not cover.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("move destination {position:?} holds {kind:?}, which cannot be entered")]
    UnexpectedCell { kind: GridObjectKind, position: Vec2 },
}
