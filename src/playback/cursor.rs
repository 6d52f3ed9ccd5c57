/// What one successful read of the generation log means for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// No lines written yet.
    Empty,
    /// Nothing new since the last read.
    Unchanged,
    /// The newest line is a generation not yet played. `generation` is its 1-based line number.
    NewGeneration { generation: usize, line: String },
    /// The sentinel was reached. `pending` is the last generation before it, if it was never
    /// played.
    Finished { pending: Option<(usize, String)> },
}

/// Tracks how far playback has got through the generation log.
#[derive(Debug, Default, Clone)]
pub struct PlaybackCursor {
    lines_seen: usize,
    last_played: Option<(usize, String)>,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies the current log contents and advances the cursor. A generation returned here
    /// is recorded as played; it is never returned again.
    pub fn observe(&mut self, lines: &[String], sentinel: &str) -> Observation {
        let Some(last) = lines.last() else {
            return Observation::Empty;
        };

        if last == sentinel {
            self.lines_seen = lines.len();
            let pending = lines
                .len()
                .checked_sub(2)
                .map(|index| (index + 1, &lines[index]))
                .filter(|(generation, _)| *generation > self.last_generation().unwrap_or(0))
                .map(|(generation, line)| (generation, line.clone()));
            if let Some(played) = &pending {
                self.last_played = Some(played.clone());
            }
            return Observation::Finished { pending };
        }

        if lines.len() <= self.lines_seen {
            return Observation::Unchanged;
        }

        self.lines_seen = lines.len();
        let generation = lines.len();
        self.last_played = Some((generation, last.clone()));
        Observation::NewGeneration {
            generation,
            line: last.clone(),
        }
    }

    pub fn last_generation(&self) -> Option<usize> {
        self.last_played.as_ref().map(|(generation, _)| *generation)
    }

    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }
}
