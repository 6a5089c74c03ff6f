use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Users an event is meant for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Users(Vec<Uuid>),
}

impl Audience {
    /// Audience made of a single user.
    pub fn user(id: Uuid) -> Self {
        Audience::Users(vec![id])
    }

    /// Whether a subscriber authenticated as `user` should receive the event.
    pub fn includes(&self, user: Uuid) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Users(users) => users.contains(&user),
        }
    }
}

/// Event travelling through the live feed hub together with its audience.
#[derive(Clone, Debug)]
pub struct FeedEvent {
    pub audience: Audience,
    pub event: ServerEvent,
}

/// Broadcast hub shared by every live feed subscriber; each stream filters by audience.
pub struct SseHub {
    sender: broadcast::Sender<FeedEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, audience: Audience, event: ServerEvent) {
        let _ = self.sender.send(FeedEvent { audience, event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_membership() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(Audience::Everyone.includes(me));
        assert!(Audience::user(me).includes(me));
        assert!(!Audience::user(me).includes(other));
        assert!(Audience::Users(vec![other, me]).includes(me));
    }

    #[tokio::test]
    async fn subscribers_receive_broadcasts() {
        let hub = SseHub::new(4);
        let mut rx = hub.subscribe();
        let user = Uuid::new_v4();

        hub.broadcast(
            Audience::user(user),
            ServerEvent::new(Some("ping".into()), "{}".into()),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.audience, Audience::user(user));
        assert_eq!(received.event.event.as_deref(), Some("ping"));
    }
}
