use crate::persist::{PersistError, write_json};
use crate::rules::action::{RewardRule, RewardTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_GENERATIONS: u32 = 100;
pub const DEFAULT_EXPLORATION_THRESHOLD: f32 = 0.5;

/// Everything the solver needs to know for one run, written to the parameters file before the
/// solver starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SolverParameters {
    pub level: usize,
    pub num_generations: u32,
    pub exploration_threshold: f32,
    pub rules: Vec<RewardRule>,
}

impl SolverParameters {
    pub fn new(level: usize, rewards: &RewardTable) -> Self {
        SolverParameters {
            level,
            num_generations: DEFAULT_GENERATIONS,
            exploration_threshold: DEFAULT_EXPLORATION_THRESHOLD,
            rules: rewards.rules(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<(), PersistError> {
        write_json(path, self)
    }
}
