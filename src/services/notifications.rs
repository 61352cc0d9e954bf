use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default lifetime of a notification
pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub kind: NotificationKind,
    pub expires_at: tokio::time::Instant,
}

struct Slot {
    /// Bumped on every `show`; a timer only clears the message it was armed for
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Process-wide, single-slot, self-expiring message channel
///
/// Last write wins. Each message owns its own expiry timer; replacing a
/// message aborts the previous timer.
#[derive(Clone)]
pub struct Notifier {
    current: Arc<watch::Sender<Option<Notification>>>,
    slot: Arc<Mutex<Slot>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            current: Arc::new(tx),
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                timer: None,
            })),
        }
    }

    /// Shows `text` for the default duration
    pub fn show(&self, text: impl Into<String>, kind: NotificationKind) {
        self.show_for(text, kind, DEFAULT_DURATION);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.show(text, NotificationKind::Info);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.show(text, NotificationKind::Success);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.show(text, NotificationKind::Error);
    }

    /// Replaces the live notification and schedules its clearing after `duration`
    pub fn show_for(&self, text: impl Into<String>, kind: NotificationKind, duration: Duration) {
        let text = text.into();
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;

        tracing::debug!(kind = ?kind, text = %text, "Notification shown");
        self.current.send_replace(Some(Notification {
            text,
            kind,
            expires_at: tokio::time::Instant::now() + duration,
        }));

        let current = Arc::clone(&self.current);
        let shared = Arc::clone(&self.slot);
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let slot = shared.lock().unwrap_or_else(|e| e.into_inner());
            if slot.generation == generation {
                current.send_replace(None);
            }
        }));
    }

    /// Clears the live notification immediately
    pub fn dismiss(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.generation += 1;
        self.current.send_replace(None);
    }

    /// The live notification, if any
    pub fn current(&self) -> Option<Notification> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.current.subscribe()
    }
}
