use crate::core::{Direction, GridWorld, InvalidMove, MoveOutcome};
use crate::playback::{
    ArtifactRead, CancelFlag, Clock, GenerationSummary, LineSource, PlaybackError,
    PlaybackObserver, PlaybackReport, PlaybackState, SolverHandle, SolverStatus,
};
use std::future::{Future, ready};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Clock that only moves when slept on. Sleeping returns immediately.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.nanos.fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        ready(())
    }
}

#[derive(Clone, Debug)]
pub enum Step {
    Missing,
    Locked,
    Text(&'static str),
}

/// Answers reads from a script. The last step repeats forever.
#[derive(Debug)]
pub struct ScriptedSource {
    script: Vec<Step>,
    reads: usize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Step>) -> Self {
        assert!(!script.is_empty(), "script needs at least one step");
        Self { script, reads: 0 }
    }
}

impl LineSource for ScriptedSource {
    fn read(&mut self) -> impl Future<Output = ArtifactRead> + Send {
        let step = self.script[self.reads.min(self.script.len() - 1)].clone();
        self.reads += 1;
        ready(match step {
            Step::Missing => ArtifactRead::Missing,
            Step::Locked => ArtifactRead::Unreadable(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "locked by solver",
            )),
            Step::Text(text) => ArtifactRead::Contents(text.to_string()),
        })
    }
}

#[derive(Debug, Default)]
struct FakeSolverState {
    exit_code: Option<Option<i32>>,
    killed: bool,
    diagnostics: String,
}

/// Solver stand-in. Clones share state so a test can inspect it after handing one to a driver.
#[derive(Clone, Debug, Default)]
pub struct FakeSolver {
    state: Arc<Mutex<FakeSolverState>>,
}

impl FakeSolver {
    pub fn running() -> Self {
        Self::default()
    }

    pub fn exited(code: i32, diagnostics: &str) -> Self {
        let solver = Self::default();
        {
            let mut state = solver.state.lock().unwrap();
            state.exit_code = Some(Some(code));
            state.diagnostics = diagnostics.to_string();
        }
        solver
    }

    pub fn was_killed(&self) -> bool {
        self.state.lock().unwrap().killed
    }
}

impl SolverHandle for FakeSolver {
    fn status(&mut self) -> SolverStatus {
        match self.state.lock().unwrap().exit_code {
            None => SolverStatus::Running,
            Some(code) => SolverStatus::Exited { code },
        }
    }

    fn kill(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.killed = true;
        if state.exit_code.is_none() {
            state.exit_code = Some(None);
        }
    }

    fn diagnostics(&self) -> String {
        self.state.lock().unwrap().diagnostics.clone()
    }
}

/// Keeps every callback for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub states: Vec<PlaybackState>,
    pub generations: Vec<usize>,
    pub moves: Vec<(Direction, MoveOutcome)>,
    pub invalid: Vec<InvalidMove>,
    pub solved: Vec<usize>,
    pub summaries: Vec<GenerationSummary>,
    pub resets: usize,
    pub finished: Option<Result<PlaybackReport, String>>,
    cancel_after: Option<(usize, CancelFlag)>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the session once `moves` moves have been observed.
    pub fn cancel_after_moves(moves: usize, flag: CancelFlag) -> Self {
        Self {
            cancel_after: Some((moves, flag)),
            ..Self::default()
        }
    }
}

impl PlaybackObserver for RecordingObserver {
    fn on_state_changed(&mut self, state: PlaybackState) {
        self.states.push(state);
    }

    fn on_generation_started(&mut self, generation: usize, _world: &GridWorld) {
        self.generations.push(generation);
    }

    fn on_move(&mut self, direction: Direction, outcome: MoveOutcome, _world: &GridWorld) {
        self.moves.push((direction, outcome));
        if let Some((limit, flag)) = &self.cancel_after {
            if self.moves.len() >= *limit {
                flag.cancel();
            }
        }
    }

    fn on_invalid_move(&mut self, _generation: usize, invalid: InvalidMove) {
        self.invalid.push(invalid);
    }

    fn on_solved(&mut self, generation: usize) {
        self.solved.push(generation);
    }

    fn on_generation_finished(&mut self, summary: &GenerationSummary) {
        self.summaries.push(*summary);
    }

    fn on_reset(&mut self, _world: &GridWorld) {
        self.resets += 1;
    }

    fn on_finished(&mut self, result: &Result<PlaybackReport, PlaybackError>) {
        self.finished = Some(match result {
            Ok(report) => Ok(*report),
            Err(err) => Err(err.to_string()),
        });
    }
}
