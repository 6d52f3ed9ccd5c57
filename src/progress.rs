use crate::persist::{PersistError, read_json, write_json};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which levels the player has solved, indexed by level number minus one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SavedProgress {
    pub levels_solved: Vec<bool>,
}

impl SavedProgress {
    /// A missing file is a fresh start, not an error.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        write_json(path, self)
    }

    pub fn is_solved(&self, level: usize) -> bool {
        level
            .checked_sub(1)
            .and_then(|index| self.levels_solved.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Returns true if the level was not already marked.
    pub fn mark_solved(&mut self, level: usize) -> bool {
        let Some(index) = level.checked_sub(1) else {
            return false;
        };
        if self.levels_solved.len() <= index {
            self.levels_solved.resize(index + 1, false);
        }
        !std::mem::replace(&mut self.levels_solved[index], true)
    }

    pub fn reset(&mut self) {
        self.levels_solved.iter_mut().for_each(|solved| *solved = false);
    }

    /// Lowest level number not yet solved, or the last level when all are solved.
    pub fn first_unsolved(&self, level_count: usize) -> usize {
        (1..=level_count)
            .find(|&level| !self.is_solved(level))
            .unwrap_or(level_count)
    }
}
