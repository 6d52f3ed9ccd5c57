mod artifact;
mod clock;
mod config;
mod control;
mod cursor;
mod driver;
mod error;
mod events;
mod solver;

pub use artifact::{ArtifactRead, FileArtifact, LineSource, complete_lines};
pub use clock::{Clock, TokioClock};
pub use config::{PlaybackConfig, SENTINEL};
pub use control::{CancelFlag, PlaybackSettings};
pub use cursor::{Observation, PlaybackCursor};
pub use driver::{PlaybackDriver, PlaybackHandle};
pub use error::PlaybackError;
pub use events::{
    ChannelObserver, GenerationSummary, NullObserver, PlaybackEvent, PlaybackObserver,
    PlaybackReport, PlaybackState,
};
pub use solver::{SolverCommand, SolverHandle, SolverProcess, SolverStatus};
