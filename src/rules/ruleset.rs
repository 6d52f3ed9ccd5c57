use crate::persist::{PersistError, read_json, write_json};
use crate::rules::action::{RewardRule, RewardTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const AUTO_SAVE_NAME: &str = "Auto Save";

/// A named, saved set of reward rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ruleset {
    pub name: String,
    pub rules: Vec<RewardRule>,
}

impl Ruleset {
    pub fn new(name: impl Into<String>, rewards: &RewardTable) -> Self {
        Ruleset {
            name: name.into(),
            rules: rewards.rules(),
        }
    }

    pub fn rewards(&self) -> RewardTable {
        RewardTable::from_rules(&self.rules)
    }
}

/// Where the rewards for a solver run come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleSource<'a> {
    /// The rules used last, kept under [`AUTO_SAVE_NAME`].
    AutoSave,
    Named(&'a str),
    /// The reference rules shipped next to a level file as `<number>.solution`.
    LevelSolution { levels_dir: &'a Path, level: usize },
}

/// Rulesets stored one JSON file per name inside a directory.
pub struct RulesetStore {
    dir: PathBuf,
}

impl RulesetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        RulesetStore { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", to_valid_file_name(name)))
    }

    pub fn save(&self, ruleset: &Ruleset) -> Result<(), PersistError> {
        if ruleset.rules.is_empty() {
            warn!("saving ruleset '{}' with no rules", ruleset.name);
        }
        write_json(&self.path_for(&ruleset.name), ruleset)
    }

    pub fn load(&self, name: &str) -> Result<Option<Ruleset>, PersistError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn delete(&self, name: &str) -> Result<bool, PersistError> {
        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(PersistError::Io { path, source }),
        }
    }

    /// Every readable ruleset, sorted by name. Unreadable files are skipped.
    pub fn load_all(&self) -> Result<Vec<Ruleset>, PersistError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut rulesets: Vec<Ruleset> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| match read_json::<Ruleset>(&path) {
                Ok(ruleset) => Some(ruleset),
                Err(err) => {
                    warn!("skipping ruleset file: {}", err);
                    None
                }
            })
            .collect();
        rulesets.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = rulesets.len(), "rulesets loaded");
        Ok(rulesets)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The auto-saved rules, or no rules when nothing was saved yet.
    pub fn load_auto_save(&self) -> Result<RewardTable, PersistError> {
        Ok(self
            .load(AUTO_SAVE_NAME)?
            .map(|ruleset| ruleset.rewards())
            .unwrap_or_default())
    }

    pub fn auto_save(&self, rewards: &RewardTable) -> Result<(), PersistError> {
        self.save(&Ruleset::new(AUTO_SAVE_NAME, rewards))
    }

    /// Resolves the rules for a run and auto-saves them, so a later run without an explicit
    /// source starts from the same rules. A level without a solution keeps the auto-saved rules.
    pub fn select(&self, source: RuleSource<'_>) -> Result<RewardTable, PersistError> {
        let rewards = match source {
            RuleSource::AutoSave => return self.load_auto_save(),
            RuleSource::Named(name) => self
                .load(name)?
                .ok_or_else(|| PersistError::RulesetNotFound(name.to_string()))?
                .rewards(),
            RuleSource::LevelSolution { levels_dir, level } => {
                match load_level_solution(levels_dir, level)? {
                    Some(solution) => solution.rewards(),
                    None => {
                        warn!(level, "no solution found for level, keeping auto-saved rules");
                        return self.load_auto_save();
                    }
                }
            }
        };
        self.auto_save(&rewards)?;
        debug!(?source, rules = rewards.rules().len(), "rules selected");
        Ok(rewards)
    }
}

pub fn level_solution_path(levels_dir: &Path, level: usize) -> PathBuf {
    levels_dir.join(format!("{}.solution", level))
}

/// The solution ruleset for a level, if one is shipped with it.
pub fn load_level_solution(levels_dir: &Path, level: usize) -> Result<Option<Ruleset>, PersistError> {
    let path = level_solution_path(levels_dir, level);
    if !path.is_file() {
        return Ok(None);
    }
    read_json(&path).map(Some)
}

/// Replaces characters that are not allowed in file names. Never returns an empty string.
pub fn to_valid_file_name(name: &str) -> String {
    const INVALID: &[char] = &['"', '\'', '/', '\\', '<', '>', '*', '|', ':', '?'];
    const RESERVED: &[&str] = &["CON", "PRN", "AUX", "NUL"];

    if name.is_empty() {
        return "_".to_string();
    }
    let upper = name.to_ascii_uppercase();
    let device = upper.len() == 4
        && (upper.starts_with("COM") || upper.starts_with("LPT"))
        && upper.as_bytes()[3].is_ascii_digit();
    if RESERVED.contains(&upper.as_str()) || device {
        return format!("_{}", name);
    }

    name.chars()
        .map(|c| if INVALID.contains(&c) || c.is_control() { '_' } else { c })
        .collect()
}
