//! # Notification Slot
//!
//! Holds at most one user-facing error message with an expiry deadline.
//! Raising a new message replaces the old one and cancels its timer, so an
//! older timer can never clear a newer message.
//!
//! The slot is plain data living inside the store state; the timer task is
//! spawned by the store (see `VotingStore::schedule_expiry`) and races the
//! cancellation token against the deadline, the same linger shape the
//! subscription registry uses.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Handle returned by `raise`, used to arm the expiry timer.
#[derive(Debug, Clone)]
pub(crate) struct ExpiryTicket {
    pub seq: u64,
    pub token: CancellationToken,
    pub ttl: Duration,
}

#[derive(Debug)]
struct ActiveNotification {
    message: String,
    expires_at: Instant,
    seq: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub(crate) struct NotificationSlot {
    current: Option<ActiveNotification>,
    next_seq: u64,
}

impl NotificationSlot {
    /// Shows `message` for `ttl`, replacing whatever was showing.
    pub fn raise(&mut self, message: impl Into<String>, ttl: Duration) -> ExpiryTicket {
        self.cancel_current();
        self.next_seq += 1;
        let token = CancellationToken::new();
        self.current = Some(ActiveNotification {
            message: message.into(),
            expires_at: Instant::now() + ttl,
            seq: self.next_seq,
            token: token.clone(),
        });
        ExpiryTicket {
            seq: self.next_seq,
            token,
            ttl,
        }
    }

    /// Dismisses the current message. Returns whether one was showing.
    pub fn clear(&mut self) -> bool {
        let had = self.current.is_some();
        self.cancel_current();
        had
    }

    /// Timer callback: clears only if `seq` is still the one showing.
    pub fn expire(&mut self, seq: u64) -> bool {
        match &self.current {
            Some(active) if active.seq == seq => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    /// The visible message, if any and not past its deadline.
    pub fn message(&self) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|active| Instant::now() < active.expires_at)
            .map(|active| active.message.as_str())
    }

    fn cancel_current(&mut self) {
        if let Some(old) = self.current.take() {
            old.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn message_hides_after_deadline() {
        let mut slot = NotificationSlot::default();
        slot.raise("boom", Duration::from_secs(5));
        assert_eq!(slot.message(), Some("boom"));

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert_eq!(slot.message(), Some("boom"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(slot.message(), None);
    }

    #[test]
    fn newer_message_survives_older_expiry() {
        let mut slot = NotificationSlot::default();
        let first = slot.raise("first", Duration::from_secs(5));
        let second = slot.raise("second", Duration::from_secs(5));

        assert!(first.token.is_cancelled());
        assert!(!slot.expire(first.seq));
        assert_eq!(slot.message(), Some("second"));

        assert!(slot.expire(second.seq));
        assert_eq!(slot.message(), None);
    }

    #[test]
    fn clear_cancels_the_timer() {
        let mut slot = NotificationSlot::default();
        let ticket = slot.raise("gone", Duration::from_secs(5));
        assert!(slot.clear());
        assert!(ticket.token.is_cancelled());
        assert!(!slot.clear());
    }
}
