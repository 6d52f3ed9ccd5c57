use crate::core::{Direction, GridWorld, InvalidMove};
use crate::playback::artifact::{ArtifactRead, LineSource, complete_lines};
use crate::playback::clock::Clock;
use crate::playback::config::PlaybackConfig;
use crate::playback::control::{CancelFlag, PlaybackSettings};
use crate::playback::cursor::{Observation, PlaybackCursor};
use crate::playback::events::{GenerationSummary, PlaybackObserver, PlaybackReport, PlaybackState};
use crate::playback::solver::{SolverHandle, SolverStatus};
use crate::playback::PlaybackError;
use crate::rules::{ActionKind, RewardTable};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why the log has not produced a new generation, used to name a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stall {
    Empty,
    Unreadable,
    NoNewLine,
}

/// Replays the generations an external solver appends to its log against a [`GridWorld`].
///
/// A session walks through [`PlaybackState`]s: it waits for the log to appear, polls it for new
/// lines, plays each new generation move by move, and ends at the sentinel line or on failure.
/// Every suspension goes through the injected [`Clock`] and is followed by a cancellation check.
/// Whatever the outcome, the session ends with the level reset and the solver killed.
pub struct PlaybackDriver<C, S, O> {
    world: GridWorld,
    config: PlaybackConfig,
    settings: Arc<PlaybackSettings>,
    cancel: CancelFlag,
    clock: C,
    source: S,
    observer: O,
    solver: Option<Box<dyn SolverHandle>>,
    rewards: RewardTable,
    cursor: PlaybackCursor,
    state: PlaybackState,
    generations_played: usize,
    solved: bool,
}

impl<C, S, O> PlaybackDriver<C, S, O>
where
    C: Clock + Send + Sync,
    S: LineSource + Send,
    O: PlaybackObserver + Send,
{
    pub fn new(
        world: GridWorld,
        config: PlaybackConfig,
        settings: Arc<PlaybackSettings>,
        clock: C,
        source: S,
        observer: O,
    ) -> Self {
        PlaybackDriver {
            world,
            config,
            settings,
            cancel: CancelFlag::new(),
            clock,
            source,
            observer,
            solver: None,
            rewards: RewardTable::new(),
            cursor: PlaybackCursor::new(),
            state: PlaybackState::AwaitingArtifact,
            generations_played: 0,
            solved: false,
        }
    }

    /// Tracks the solver so it is killed when the session ends.
    pub fn with_solver(mut self, solver: Box<dyn SolverHandle>) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn with_rewards(mut self, rewards: RewardTable) -> Self {
        self.rewards = rewards;
        self
    }

    /// Shares a cancellation flag created before the driver.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub async fn run(&mut self) -> Result<PlaybackReport, PlaybackError> {
        info!(sentinel = %self.config.sentinel, "playback started");
        let result = self.drive().await;
        self.clean_up(&result);
        self.observer.on_finished(&result);
        result
    }

    async fn drive(&mut self) -> Result<PlaybackReport, PlaybackError> {
        self.set_state(PlaybackState::AwaitingArtifact);
        let started = self.clock.elapsed();
        let mut since_progress = started;
        let mut stall = Stall::Empty;
        let mut final_read = false;

        loop {
            self.check_cancelled()?;
            let read = self.source.read().await;

            if self.state == PlaybackState::AwaitingArtifact {
                if let ArtifactRead::Missing = read {
                    if self.solver_exited() {
                        if final_read {
                            return Err(self.solver_error());
                        }
                        final_read = true;
                        continue;
                    }
                    if self.clock.elapsed() - started >= self.config.artifact_start_timeout {
                        return Err(PlaybackError::SolverDidNotStart);
                    }
                    self.wait(self.config.poll_interval).await?;
                    continue;
                }
                info!("solver output appeared");
                self.set_state(PlaybackState::Polling);
                since_progress = self.clock.elapsed();
            }

            match read {
                ArtifactRead::Missing => {
                    warn!("solver output disappeared, retrying");
                    stall = Stall::Unreadable;
                }
                ArtifactRead::Unreadable(err) => {
                    warn!("solver output not readable yet: {}", err);
                    stall = Stall::Unreadable;
                }
                ArtifactRead::Contents(contents) => {
                    let lines = complete_lines(&contents, &self.config.sentinel);
                    match self.cursor.observe(&lines, &self.config.sentinel) {
                        Observation::Empty => stall = Stall::Empty,
                        Observation::Unchanged => stall = Stall::NoNewLine,
                        Observation::NewGeneration { generation, line } => {
                            self.play_and_reset(generation, &line).await?;
                            since_progress = self.clock.elapsed();
                            final_read = false;
                            continue;
                        }
                        Observation::Finished { pending } => {
                            if let Some((generation, line)) = pending {
                                self.play_and_reset(generation, &line).await?;
                            }
                            info!(
                                generations = self.generations_played,
                                solved = self.solved,
                                "reached end of solver output"
                            );
                            return Ok(PlaybackReport {
                                generations_played: self.generations_played,
                                last_generation: self.cursor.last_generation(),
                                solved: self.solved,
                            });
                        }
                    }
                }
            }

            // one more read after the solver exits, in case it wrote its last lines on the way out
            if self.solver_exited() {
                if final_read {
                    return Err(self.solver_error());
                }
                final_read = true;
                continue;
            }

            if self.clock.elapsed() - since_progress >= self.config.stall_timeout {
                return Err(match stall {
                    Stall::Empty => PlaybackError::ArtifactEmpty,
                    Stall::Unreadable => PlaybackError::ArtifactUnreadable,
                    Stall::NoNewLine => PlaybackError::Stalled {
                        generation: self.cursor.last_generation(),
                    },
                });
            }
            debug!(lines = self.cursor.lines_seen(), ?stall, "no new generation yet");
            self.wait(self.config.poll_interval).await?;
        }
    }

    async fn play_and_reset(&mut self, generation: usize, line: &str) -> Result<(), PlaybackError> {
        let summary = self.play_generation(generation, line).await?;
        self.generations_played += 1;
        self.observer.on_generation_finished(&summary);
        self.world.reset()?;
        self.observer.on_reset(&self.world);
        self.set_state(PlaybackState::Polling);
        Ok(())
    }

    /// Plays one generation from the level's start state. Stops early if the level is solved.
    async fn play_generation(&mut self, generation: usize, line: &str) -> Result<GenerationSummary, PlaybackError> {
        self.set_state(PlaybackState::PlayingGeneration { generation });
        info!(generation, length = line.len(), "playing generation");
        self.observer.on_generation_started(generation, &self.world);

        let mut summary = GenerationSummary {
            generation,
            ..GenerationSummary::default()
        };
        let symbols: Vec<char> = line.chars().collect();

        for (index, &symbol) in symbols.iter().enumerate() {
            let Some(direction) = Direction::from_symbol(symbol) else {
                warn!(generation, index, "skipping unrecognised move {:?}", symbol);
                summary.invalid_moves += 1;
                self.observer.on_invalid_move(generation, InvalidMove { index, symbol });
                continue;
            };

            self.wait_while_paused(generation).await?;

            let outcome = self.world.make_move(direction)?;
            let solved = self.world.is_solved();
            summary.moves_applied += 1;
            summary.reward += i64::from(self.rewards.reward_for(ActionKind::from_outcome(outcome, solved)));
            debug!(generation, index, ?direction, ?outcome, "move");
            self.observer.on_move(direction, outcome, &self.world);

            if solved {
                summary.solved = true;
                if !self.solved {
                    self.solved = true;
                    info!(generation, "level solved");
                    self.observer.on_solved(generation);
                }
                self.wait(self.config.solved_linger).await?;
                break;
            }

            if index + 1 < symbols.len() {
                self.wait(self.config.move_delay(self.settings.speed())).await?;
            }
        }

        self.wait(self.config.generation_linger).await?;
        Ok(summary)
    }

    /// Holds playback while the menu is open or the speed is zero. Time spent here does not
    /// count towards any timeout.
    async fn wait_while_paused(&mut self, generation: usize) -> Result<(), PlaybackError> {
        if !self.settings.is_paused() {
            return Ok(());
        }
        debug!(generation, "playback paused");
        self.set_state(PlaybackState::Paused { generation });
        while self.settings.is_paused() {
            self.wait(self.config.pause_check_interval).await?;
        }
        debug!(generation, "playback resumed");
        self.set_state(PlaybackState::PlayingGeneration { generation });
        Ok(())
    }

    /// Sleeps on the clock, returning early with `Cancelled` as soon as the session is cancelled.
    async fn wait(&mut self, duration: Duration) -> Result<(), PlaybackError> {
        self.check_cancelled()?;
        let cancel = self.cancel.clone();
        tokio::select! {
            _ = self.clock.sleep(duration) => {}
            _ = cancel.cancelled() => {}
        }
        self.check_cancelled()
    }

    fn check_cancelled(&self) -> Result<(), PlaybackError> {
        if self.cancel.is_cancelled() {
            return Err(PlaybackError::Cancelled);
        }
        Ok(())
    }

    fn solver_exited(&mut self) -> bool {
        self.solver.as_mut().is_some_and(|solver| !solver.is_alive())
    }

    fn solver_error(&mut self) -> PlaybackError {
        let Some(solver) = self.solver.as_mut() else {
            return PlaybackError::SolverDidNotStart;
        };
        let status = match solver.status() {
            SolverStatus::Exited { code: Some(code) } => format!("exit code {}", code),
            SolverStatus::Exited { code: None } => "terminated".to_string(),
            SolverStatus::Running => "running".to_string(),
        };
        let diagnostics = solver.diagnostics().trim().to_string();
        PlaybackError::SolverError {
            status,
            diagnostics: if diagnostics.is_empty() {
                "no diagnostics".to_string()
            } else {
                diagnostics
            },
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.observer.on_state_changed(state);
        }
    }

    /// Shared by every way a session ends: reset the level and get rid of the solver.
    fn clean_up(&mut self, result: &Result<PlaybackReport, PlaybackError>) {
        match result {
            Ok(_) => self.set_state(PlaybackState::Done),
            Err(PlaybackError::Cancelled) => {
                info!("playback cancelled");
                self.set_state(PlaybackState::Done);
            }
            Err(err) => {
                error!("playback failed: {}", err);
                self.set_state(PlaybackState::Failed);
            }
        }

        match self.world.reset() {
            Ok(()) => self.observer.on_reset(&self.world),
            Err(err) => error!("could not reset level after playback: {}", err),
        }

        if let Some(mut solver) = self.solver.take() {
            if solver.is_alive() {
                info!("stopping solver");
                solver.kill();
            }
        }
    }
}

/// A playback session running on its own task.
pub struct PlaybackHandle {
    cancel: CancelFlag,
    task: Option<JoinHandle<Result<PlaybackReport, PlaybackError>>>,
}

impl PlaybackHandle {
    pub fn spawn<C, S, O>(mut driver: PlaybackDriver<C, S, O>) -> Self
    where
        C: Clock + Send + Sync + 'static,
        S: LineSource + Send + 'static,
        O: PlaybackObserver + Send + 'static,
    {
        let cancel = driver.cancel_flag();
        let task = tokio::spawn(async move { driver.run().await });
        PlaybackHandle {
            cancel,
            task: Some(task),
        }
    }

    /// A handle with nothing playing.
    pub fn idle() -> Self {
        PlaybackHandle {
            cancel: CancelFlag::new(),
            task: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Asks the session to stop at its next suspension point. Does nothing when no session is
    /// playing, so it may be called any number of times.
    pub fn cancel(&self) {
        if self.is_playing() {
            self.cancel.cancel();
        }
    }

    /// Waits for the session to end. `None` if there was no session or it was already collected.
    pub async fn finish(&mut self) -> Option<Result<PlaybackReport, PlaybackError>> {
        let task = self.task.take()?;
        Some(match task.await {
            Ok(result) => result,
            Err(err) => {
                error!("playback task failed: {}", err);
                Err(PlaybackError::Aborted(err.to_string()))
            }
        })
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
