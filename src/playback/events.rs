use crate::core::{Direction, GridWorld, InvalidMove, MoveOutcome};
use crate::playback::PlaybackError;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    AwaitingArtifact,
    Polling,
    PlayingGeneration { generation: usize },
    Paused { generation: usize },
    Done,
    Failed,
}

/// What one generation achieved when played against the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationSummary {
    pub generation: usize,
    pub moves_applied: usize,
    pub invalid_moves: usize,
    pub reward: i64,
    pub solved: bool,
}

/// Result of a session that ran until the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackReport {
    pub generations_played: usize,
    pub last_generation: Option<usize>,
    pub solved: bool,
}

/// Trait for observing a playback session. All methods default to doing nothing.
pub trait PlaybackObserver {
    fn on_state_changed(&mut self, _state: PlaybackState) {}

    /// Called before the first move of a generation, with the level in its start state.
    fn on_generation_started(&mut self, _generation: usize, _world: &GridWorld) {}

    /// Called after each move is applied.
    fn on_move(&mut self, _direction: Direction, _outcome: MoveOutcome, _world: &GridWorld) {}

    fn on_invalid_move(&mut self, _generation: usize, _invalid: InvalidMove) {}

    /// Called at most once per session, the first time a generation solves the level.
    fn on_solved(&mut self, _generation: usize) {}

    fn on_generation_finished(&mut self, _summary: &GenerationSummary) {}

    /// Called whenever the level is put back to its start state.
    fn on_reset(&mut self, _world: &GridWorld) {}

    /// Called once, after cleanup, with the outcome of the session.
    fn on_finished(&mut self, _result: &Result<PlaybackReport, PlaybackError>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PlaybackObserver for NullObserver {}

/// Owned form of the observer callbacks, for sending across tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StateChanged(PlaybackState),
    GenerationStarted { generation: usize, map: String },
    Moved { direction: Direction, outcome: MoveOutcome, map: String },
    InvalidMove { generation: usize, invalid: InvalidMove },
    Solved { generation: usize },
    GenerationFinished(GenerationSummary),
    Reset { map: String },
    Finished(Result<PlaybackReport, String>),
}

/// Forwards every callback as a [`PlaybackEvent`]. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: UnboundedSender<PlaybackEvent>,
}

impl ChannelObserver {
    pub fn new(sender: UnboundedSender<PlaybackEvent>) -> Self {
        ChannelObserver { sender }
    }

    fn send(&self, event: PlaybackEvent) {
        let _ = self.sender.send(event);
    }
}

impl PlaybackObserver for ChannelObserver {
    fn on_state_changed(&mut self, state: PlaybackState) {
        self.send(PlaybackEvent::StateChanged(state));
    }

    fn on_generation_started(&mut self, generation: usize, world: &GridWorld) {
        self.send(PlaybackEvent::GenerationStarted {
            generation,
            map: world.to_map_string(),
        });
    }

    fn on_move(&mut self, direction: Direction, outcome: MoveOutcome, world: &GridWorld) {
        self.send(PlaybackEvent::Moved {
            direction,
            outcome,
            map: world.to_map_string(),
        });
    }

    fn on_invalid_move(&mut self, generation: usize, invalid: InvalidMove) {
        self.send(PlaybackEvent::InvalidMove { generation, invalid });
    }

    fn on_solved(&mut self, generation: usize) {
        self.send(PlaybackEvent::Solved { generation });
    }

    fn on_generation_finished(&mut self, summary: &GenerationSummary) {
        self.send(PlaybackEvent::GenerationFinished(*summary));
    }

    fn on_reset(&mut self, world: &GridWorld) {
        self.send(PlaybackEvent::Reset {
            map: world.to_map_string(),
        });
    }

    fn on_finished(&mut self, result: &Result<PlaybackReport, PlaybackError>) {
        let result = match result {
            Ok(report) => Ok(*report),
            Err(err) => Err(err.to_string()),
        };
        self.send(PlaybackEvent::Finished(result));
    }
}
