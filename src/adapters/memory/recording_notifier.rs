//! Notification sender that records instead of sending.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::foundation::DomainError;
use crate::ports::{Notification, NotificationSender};

#[derive(Default)]
struct RecorderState {
    sent: Vec<Notification>,
    failing: bool,
    delay: Option<Duration>,
}

/// Records every notification for assertions.
///
/// Failed sends are not recorded.
#[derive(Clone, Default)]
pub struct RecordingNotificationSender {
    state: Arc<Mutex<RecorderState>>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every subsequent send fail.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Makes every subsequent send wait before recording.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.lock().sent.clone()
    }

    /// Notifications of one kind (`welcome`, `refund`, ...).
    pub fn sent_of_kind(&self, kind: &str) -> Vec<Notification> {
        self.lock()
            .sent
            .iter()
            .filter(|n| n.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn count_of_kind(&self, kind: &str) -> usize {
        self.sent_of_kind(kind).len()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send(&self, notification: Notification) -> Result<(), DomainError> {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        if state.failing {
            return Err(DomainError::external("email", "simulated send failure"));
        }
        state.sent.push(notification);
        Ok(())
    }
}
