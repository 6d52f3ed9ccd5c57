use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Notify;

/// User-facing playback controls shared between the UI and a running session.
#[derive(Debug)]
pub struct PlaybackSettings {
    speed_bits: AtomicU32,
    menu_open: AtomicBool,
}

impl PlaybackSettings {
    pub fn new(speed: f32) -> Arc<Self> {
        Arc::new(PlaybackSettings {
            speed_bits: AtomicU32::new(speed.to_bits()),
            menu_open: AtomicBool::new(false),
        })
    }

    pub fn speed(&self) -> f32 {
        f32::from_bits(self.speed_bits.load(Ordering::Relaxed))
    }

    /// A speed of zero or below holds playback until a positive speed is set.
    pub fn set_speed(&self, speed: f32) {
        self.speed_bits.store(speed.to_bits(), Ordering::Relaxed);
    }

    pub fn set_menu_open(&self, open: bool) {
        self.menu_open.store(open, Ordering::Relaxed);
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open.load(Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        let speed = self.speed();
        self.is_menu_open() || speed <= 0.0 || speed.is_nan()
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancellation request for one playback session. Waiters on [`CancelFlag::cancelled`] wake as
/// soon as it is set.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<CancelState>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the flag is set.
    pub async fn cancelled(&self) {
        loop {
            // registered before the check so a cancel in between is not missed
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
