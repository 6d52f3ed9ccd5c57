use crate::core::{GridError, LevelError};
use thiserror::Error;

/// Why a playback session ended without reaching the sentinel.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback cancelled")]
    Cancelled,
    #[error("solver did not start: no output file appeared")]
    SolverDidNotStart,
    #[error("solver output stayed empty")]
    ArtifactEmpty,
    #[error("solver output could not be read")]
    ArtifactUnreadable,
    #[error("solver stopped producing generations{}", .generation.map(|g| format!(" after generation {g}")).unwrap_or_default())]
    Stalled { generation: Option<usize> },
    #[error("solver exited ({status}) before finishing: {diagnostics}")]
    SolverError { status: String, diagnostics: String },
    #[error("playback task stopped unexpectedly: {0}")]
    Aborted(String),
    #[error("could not launch solver: {0}")]
    Launch(#[source] std::io::Error),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Level(#[from] LevelError),
}
