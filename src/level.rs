use crate::core::{GridWorld, LevelError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A level definition as stored on disk.
///
/// Level files are named by their number. A line holding exactly one character switches
/// section: `N` for the name, `M` for the map rows, `I` for the instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelMap {
    pub number: usize,
    pub name: String,
    pub map_string: String,
    pub instructions: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Name,
    Map,
    Instructions,
}

impl LevelMap {
    pub fn parse(number: usize, text: &str) -> Result<LevelMap, LevelError> {
        let mut level = LevelMap {
            number,
            name: String::new(),
            map_string: String::new(),
            instructions: String::new(),
        };
        let mut section = Section::None;

        for line in text.lines() {
            let mut marker = line.chars();
            if let (Some(symbol), None) = (marker.next(), marker.next()) {
                section = match symbol {
                    'N' => Section::Name,
                    'M' => Section::Map,
                    'I' => Section::Instructions,
                    _ => Section::None,
                };
                continue;
            }

            match section {
                Section::Name => level.name.push_str(line),
                Section::Map => append_line(&mut level.map_string, line),
                Section::Instructions => append_line(&mut level.instructions, line),
                Section::None => {}
            }
        }

        if level.map_string.is_empty() {
            return Err(LevelError::MissingMap { number });
        }
        Ok(level)
    }

    pub fn load(dir: &Path, number: usize) -> Result<LevelMap, LevelError> {
        let path = level_path(dir, number);
        let text = std::fs::read_to_string(&path).map_err(|err| LevelError::Unreadable {
            number,
            message: err.to_string(),
        })?;
        LevelMap::parse(number, &text)
    }

    pub fn to_world(&self) -> Result<GridWorld, LevelError> {
        GridWorld::from_map_string(&self.map_string)
    }
}

fn append_line(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(line);
}

pub fn level_path(dir: &Path, number: usize) -> PathBuf {
    dir.join(number.to_string())
}

/// Loads levels `1, 2, 3, ...` until the first number without a file.
pub fn load_all_levels(dir: &Path) -> Vec<LevelMap> {
    let mut levels = Vec::new();
    let mut number = 1;
    while level_path(dir, number).is_file() {
        match LevelMap::load(dir, number) {
            Ok(level) => levels.push(level),
            Err(err) => warn!("skipping level {}: {}", number, err),
        }
        number += 1;
    }
    debug!(count = levels.len(), dir = %dir.display(), "levels loaded");
    levels
}
