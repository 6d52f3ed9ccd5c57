use crate::core::models::{Direction, GridObjectKind, InvalidMove, MoveOutcome, Vec2};

impl GridObjectKind {
    /// Unknown symbols read as `Empty`.
    pub fn from_symbol(symbol: char) -> GridObjectKind {
        match symbol {
            '#' => GridObjectKind::Wall,
            'b' => GridObjectKind::Box,
            'p' => GridObjectKind::Player,
            'x' => GridObjectKind::Target,
            '.' => GridObjectKind::Ground,
            'B' => GridObjectKind::BoxOnTarget,
            'P' => GridObjectKind::PlayerOnTarget,
            _ => GridObjectKind::Empty,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            GridObjectKind::Empty => ' ',
            GridObjectKind::Wall => '#',
            GridObjectKind::Box => 'b',
            GridObjectKind::Player => 'p',
            GridObjectKind::Target => 'x',
            GridObjectKind::Ground => '.',
            GridObjectKind::BoxOnTarget => 'B',
            GridObjectKind::PlayerOnTarget => 'P',
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, GridObjectKind::Player | GridObjectKind::PlayerOnTarget)
    }

    pub fn is_box(&self) -> bool {
        matches!(self, GridObjectKind::Box | GridObjectKind::BoxOnTarget)
    }

    /// Cells a player can step onto or a box can be pushed onto.
    pub fn is_open_floor(&self) -> bool {
        matches!(self, GridObjectKind::Ground | GridObjectKind::Target)
    }
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn delta(&self) -> Vec2 {
        match self {
            Direction::Up => Vec2 { i: -1, j: 0 },
            Direction::Down => Vec2 { i: 1, j: 0 },
            Direction::Left => Vec2 { i: 0, j: -1 },
            Direction::Right => Vec2 { i: 0, j: 1 },
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Direction> {
        match symbol {
            'U' => Some(Direction::Up),
            'D' => Some(Direction::Down),
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Walked | MoveOutcome::Pushed { .. })
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            i: self.i + rhs.i,
            j: self.j + rhs.j,
        }
    }
}

/// Splits a generation line into its moves, collecting characters that are not moves.
pub fn parse_generation(line: &str) -> (Vec<Direction>, Vec<InvalidMove>) {
    let mut moves = Vec::with_capacity(line.len());
    let mut invalid = Vec::new();
    for (index, symbol) in line.chars().enumerate() {
        match Direction::from_symbol(symbol) {
            Some(direction) => moves.push(direction),
            None => invalid.push(InvalidMove { index, symbol }),
        }
    }
    (moves, invalid)
}
