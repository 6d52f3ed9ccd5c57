use crate::core::GridObjectKind::{Box, BoxOnTarget, Ground, Player, PlayerOnTarget, Target, Wall};
use crate::core::bounded_grid::BoundedGrid;
use crate::core::{Direction, GridError, GridObjectKind, MoveOutcome, Vec2};

/// Applies one move in place. Either every cell change happens or none does.
pub fn step(
    grid: &mut BoundedGrid<GridObjectKind>,
    player: &mut Vec2,
    direction: Direction,
) -> Result<MoveOutcome, GridError> {
    let dir = direction.delta();
    let dest_pos = *player + dir;

    // off the edge behaves like a wall
    let Some(&dest) = grid.get(&dest_pos) else {
        return Ok(MoveOutcome::BumpedWall);
    };

    match dest {
        Wall => Ok(MoveOutcome::BumpedWall),
        Box | BoxOnTarget => {
            let beyond_pos = dest_pos + dir;
            let beyond = match grid.get(&beyond_pos) {
                Some(&beyond) if beyond.is_open_floor() => beyond,
                _ => return Ok(MoveOutcome::PushBlocked),
            };

            // Move box
            grid[&beyond_pos] = if beyond == Target { BoxOnTarget } else { Box };
            // Clear old box spot (player will step into it)
            grid[&dest_pos] = if dest == BoxOnTarget { Target } else { Ground };

            move_player(grid, player, dest_pos);
            Ok(MoveOutcome::Pushed {
                box_on_target: beyond == Target,
            })
        }
        Target | Ground => {
            move_player(grid, player, dest_pos);
            Ok(MoveOutcome::Walked)
        }
        kind => Err(GridError::UnexpectedCell {
            kind,
            position: dest_pos,
        }),
    }
}

fn move_player(grid: &mut BoundedGrid<GridObjectKind>, player: &mut Vec2, dest_pos: Vec2) {
    let cur = grid[&*player];
    grid[&*player] = if cur == PlayerOnTarget { Target } else { Ground };

    let dest_now = grid[&dest_pos];
    grid[&dest_pos] = if dest_now == Target { PlayerOnTarget } else { Player };

    *player = dest_pos;
}
