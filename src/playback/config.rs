use crate::persist::{PersistError, read_json};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const SENTINEL: &str = "END";

/// Timing of the playback loop. Every wait the driver performs is one of these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Between reads of the artifact while waiting for it to appear or grow.
    #[serde(with = "millis", rename = "poll_interval_ms")]
    pub poll_interval: Duration,
    /// How long the solver gets to create the artifact.
    #[serde(with = "millis", rename = "artifact_start_timeout_ms")]
    pub artifact_start_timeout: Duration,
    /// How long the artifact may go without a new line before playback gives up.
    #[serde(with = "millis", rename = "stall_timeout_ms")]
    pub stall_timeout: Duration,
    #[serde(with = "millis", rename = "pause_check_interval_ms")]
    pub pause_check_interval: Duration,
    /// Delay between moves at speed 1.0.
    #[serde(with = "millis", rename = "base_move_delay_ms")]
    pub base_move_delay: Duration,
    /// Upper bound on the delay between moves, however low the speed.
    #[serde(with = "millis", rename = "max_move_delay_ms")]
    pub max_move_delay: Duration,
    #[serde(with = "millis", rename = "generation_linger_ms")]
    pub generation_linger: Duration,
    #[serde(with = "millis", rename = "solved_linger_ms")]
    pub solved_linger: Duration,
    pub sentinel: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            poll_interval: Duration::from_millis(100),
            artifact_start_timeout: Duration::from_secs(10),
            stall_timeout: Duration::from_secs(30),
            pause_check_interval: Duration::from_millis(100),
            base_move_delay: Duration::from_millis(300),
            max_move_delay: Duration::from_secs(10),
            generation_linger: Duration::from_secs(1),
            solved_linger: Duration::from_secs(2),
            sentinel: SENTINEL.to_string(),
        }
    }
}

impl PlaybackConfig {
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        read_json(path)
    }

    /// Delay between two moves at the given speed. Non-positive speeds mean paused and are
    /// handled before the delay is ever asked for.
    pub fn move_delay(&self, speed: f32) -> Duration {
        let delay = if speed > 0.0 && speed.is_finite() {
            let nanos = self.base_move_delay.as_nanos() as f64 / f64::from(speed);
            Duration::from_nanos(nanos.round() as u64)
        } else {
            self.base_move_delay
        };
        delay.min(self.max_move_delay)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
