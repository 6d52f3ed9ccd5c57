mod action;
mod parameters;
mod ruleset;

pub use action::{ActionKind, RewardRule, RewardTable};
pub use parameters::{DEFAULT_EXPLORATION_THRESHOLD, DEFAULT_GENERATIONS, SolverParameters};
pub use ruleset::{
    AUTO_SAVE_NAME, RuleSource, Ruleset, RulesetStore, level_solution_path, load_level_solution,
    to_valid_file_name,
};
