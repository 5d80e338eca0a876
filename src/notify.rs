use log::debug;
use std::time::{Duration, Instant};

use crate::models::{Toast, ToastKind};

/// How long a toast stays up unless replaced or dismissed.
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Holds at most one toast and expires it after `TOAST_DURATION`.
#[derive(Default)]
pub struct Notifier {
    current: Option<(Toast, Instant)>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.show_at(message, kind, Instant::now());
    }

    /// Replace whatever is showing; the dismissal deadline restarts from `now`.
    pub fn show_at(&mut self, message: impl Into<String>, kind: ToastKind, now: Instant) {
        let toast = Toast {
            message: message.into(),
            kind,
        };
        debug!("Toast ({:?}): {}", toast.kind, toast.message);
        self.current = Some((toast, now));
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref().map(|(toast, _)| toast)
    }

    /// Auto-dismiss the toast once its time is up.
    pub fn tick(&mut self, now: Instant) {
        if let Some((_, shown_at)) = &self.current {
            if now.saturating_duration_since(*shown_at) >= TOAST_DURATION {
                self.current = None;
            }
        }
    }
}
