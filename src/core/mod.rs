mod bounded_grid;
mod bounds;
mod error;
mod grid_world;
mod model_helpers;
mod models;
mod update;

pub use bounded_grid::BoundedGrid;
pub use bounds::BoundsOriginRoot;
pub use error::{GridError, LevelError};
pub use grid_world::GridWorld;
pub use model_helpers::parse_generation;
pub use models::{Direction, GridObjectKind, InvalidMove, MoveOutcome, Vec2};
