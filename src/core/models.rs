use serde::{Deserialize, Serialize};

/// Contents of a single grid cell. Targets are never a separate layer: an occupant standing on a
/// target is its own kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum GridObjectKind {
    #[default]
    Empty,
    Wall,
    Box,
    Player,
    Target,
    BoxOnTarget,
    PlayerOnTarget,
    Ground,
}

/// Grid coordinate. `i` is the row, counted from the first line of the map string, `j` the column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct Vec2 {
    pub i: i32,
    pub j: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Result of an accepted or rejected move. Rejected moves leave the grid untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    Walked,
    Pushed { box_on_target: bool },
    BumpedWall,
    PushBlocked,
}

/// A character of a move string that is not one of `U`, `D`, `L`, `R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMove {
    pub index: usize,
    pub symbol: char,
}
