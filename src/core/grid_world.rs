use crate::core::bounded_grid::BoundedGrid;
use crate::core::bounds::BoundsOriginRoot;
use crate::core::update::step;
use crate::core::{Direction, GridError, GridObjectKind, LevelError, MoveOutcome, Vec2};
use tracing::{debug, trace};

/// Sokoban simulation over a single loaded level.
///
/// The grid shape is fixed by the map string passed to [`GridWorld::initialize`]. Every move is
/// applied atomically, and [`GridWorld::reset`] always returns to the state parsed from that map
/// string, never to an intermediate state.
#[derive(Clone, Debug)]
pub struct GridWorld {
    map_string: String,
    grid: BoundedGrid<GridObjectKind>,
    player: Vec2,
}

impl GridWorld {
    pub fn from_map_string(map: &str) -> Result<GridWorld, LevelError> {
        let (grid, player) = parse_map(map)?;
        Ok(GridWorld {
            map_string: map.to_string(),
            grid,
            player,
        })
    }

    /// Replaces the level. On error the previous level stays loaded.
    pub fn initialize(&mut self, map: &str) -> Result<(), LevelError> {
        let (grid, player) = parse_map(map)?;
        self.map_string = map.to_string();
        self.grid = grid;
        self.player = player;
        debug!(width = self.width(), height = self.height(), "level initialized");
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), LevelError> {
        let (grid, player) = parse_map(&self.map_string)?;
        self.grid = grid;
        self.player = player;
        Ok(())
    }

    pub fn make_move(&mut self, direction: Direction) -> Result<MoveOutcome, GridError> {
        let outcome = step(&mut self.grid, &mut self.player, direction)?;
        trace!(?direction, ?outcome, player = ?self.player, "move");
        Ok(outcome)
    }

    /// True when no plain box is left off a target.
    pub fn is_solved(&self) -> bool {
        !self.grid.iter().any(|&kind| kind == GridObjectKind::Box)
    }

    pub fn width(&self) -> i32 {
        self.grid.size().width()
    }

    pub fn height(&self) -> i32 {
        self.grid.size().height()
    }

    pub fn player_position(&self) -> Vec2 {
        self.player
    }

    pub fn cell(&self, pos: &Vec2) -> Option<GridObjectKind> {
        self.grid.get(pos).copied()
    }

    pub fn box_count(&self) -> usize {
        self.grid.iter().filter(|kind| kind.is_box()).count()
    }

    pub fn boxes_on_targets(&self) -> usize {
        self.grid
            .iter()
            .filter(|&&kind| kind == GridObjectKind::BoxOnTarget)
            .count()
    }

    pub fn map_string(&self) -> &str {
        &self.map_string
    }

    /// Serializes the current grid with the same symbol table used for parsing. Rows are padded
    /// to the common width.
    pub fn to_map_string(&self) -> String {
        self.grid
            .rows()
            .map(|row| row.iter().map(GridObjectKind::symbol).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl PartialEq for GridWorld {
    fn eq(&self, other: &Self) -> bool {
        self.grid == other.grid && self.player == other.player
    }
}

impl Eq for GridWorld {}

fn parse_map(map: &str) -> Result<(BoundedGrid<GridObjectKind>, Vec2), LevelError> {
    let mut rows: Vec<&str> = map
        .split('\n')
        .map(|row| row.strip_suffix('\r').unwrap_or(row))
        .collect();
    if rows.len() > 1 && rows.last().is_some_and(|row| row.is_empty()) {
        rows.pop();
    }

    let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
    if width == 0 {
        return Err(LevelError::EmptyMap);
    }

    // short rows are padded with Empty, which is also the grid's default
    let mut grid = BoundedGrid::new(
        BoundsOriginRoot::new(rows.len() as i32, width as i32),
        GridObjectKind::Empty,
    );
    let mut players = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        for (j, symbol) in row.chars().enumerate() {
            let pos = Vec2 { i: i as i32, j: j as i32 };
            let kind = GridObjectKind::from_symbol(symbol);
            if kind.is_player() {
                players.push(pos);
            }
            grid[&pos] = kind;
        }
    }

    match players.as_slice() {
        [player] => Ok((grid, *player)),
        [] => Err(LevelError::NoPlayer),
        _ => Err(LevelError::MultiplePlayers {
            count: players.len(),
        }),
    }
}
