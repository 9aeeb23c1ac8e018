//! Fan-out of attendee-count changes to connected WebSocket clients.
//!
//! The notifier wraps a tokio broadcast channel. It is constructed once at
//! startup and handed to the handlers through [`AppState`](crate::state::AppState),
//! so there is no init-before-use ordering to get wrong. Sends are
//! fire-and-forget: no replay for late subscribers, no acknowledgment.

use serde::Serialize;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::trace;

/// Capacity of the broadcast channel. Slow subscribers past this many
/// pending updates start seeing `RecvError::Lagged`.
const CHANNEL_CAPACITY: usize = 256;

/// Payload of the `updateAttendees` push message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeUpdate {
    pub event_id: i64,
    pub attendees: i64,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    sender: Sender<AttendeeUpdate>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribes to updates published after this call.
    pub fn subscribe(&self) -> Receiver<AttendeeUpdate> {
        self.sender.subscribe()
    }

    /// Publishes an update to every current subscriber. Returns the number
    /// of subscribers that received it; 0 when nobody is connected.
    pub fn publish(&self, update: AttendeeUpdate) -> usize {
        trace!(
            event_id = update.event_id,
            attendees = update.attendees,
            "publishing attendee update"
        );
        self.sender.send(update).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(event_id: i64, attendees: i64) -> AttendeeUpdate {
        AttendeeUpdate {
            event_id,
            attendees,
        }
    }

    #[test]
    fn publish_without_subscribers_returns_zero() {
        let notifier = Notifier::new();
        assert_eq!(notifier.publish(update(1, 1)), 0);
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let notifier = Notifier::new();
        assert_eq!(notifier.subscriber_count(), 0);

        let rx1 = notifier.subscribe();
        let rx2 = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        drop(rx1);
        drop(rx2);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn all_subscribers_receive_each_update() {
        let notifier = Notifier::new();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();

        assert_eq!(notifier.publish(update(7, 3)), 2);

        assert_eq!(rx1.recv().await.unwrap(), update(7, 3));
        assert_eq!(rx2.recv().await.unwrap(), update(7, 3));
    }

    #[tokio::test]
    async fn updates_arrive_in_publish_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.publish(update(1, 1));
        notifier.publish(update(1, 2));
        notifier.publish(update(1, 3));

        assert_eq!(rx.recv().await.unwrap().attendees, 1);
        assert_eq!(rx.recv().await.unwrap().attendees, 2);
        assert_eq!(rx.recv().await.unwrap().attendees, 3);
    }

    #[test]
    fn update_serializes_camel_case() {
        let json = serde_json::to_value(update(5, 2)).unwrap();
        assert_eq!(json["eventId"], 5);
        assert_eq!(json["attendees"], 2);
    }

    #[tokio::test]
    async fn cloned_notifier_shares_the_channel() {
        let notifier = Notifier::new();
        let clone = notifier.clone();
        let mut rx = notifier.subscribe();

        clone.publish(update(2, 1));
        assert_eq!(rx.recv().await.unwrap().event_id, 2);
    }
}
