use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::{MemberRole, MembershipFilter},
    dto::{session::SessionResponse, sse::ServerEvent},
    error::ServiceError,
    services::sse_events,
    state::{FeedEvent, SharedState},
};

/// Live feed of one user: pending hub receiver plus the events to emit first.
pub struct FeedSubscription {
    user: Uuid,
    receiver: broadcast::Receiver<FeedEvent>,
    initial: Vec<ServerEvent>,
}

impl FeedSubscription {
    pub fn initial_events(&self) -> &[ServerEvent] {
        &self.initial
    }
}

/// Subscribe `user` to the live feed and prepare the initial sessions snapshot.
///
/// The hub subscription happens before the snapshot is read so no change between the two
/// is lost; a change can at worst be delivered twice.
pub async fn subscribe_feed(
    state: &SharedState,
    user: Uuid,
) -> Result<FeedSubscription, ServiceError> {
    let store = state.require_session_store().await?;
    let receiver = state.feed().subscribe();

    let sessions = store
        .list_sessions_for_member(user, MembershipFilter::Role(MemberRole::Player))
        .await?;
    let sessions = sessions.into_iter().map(SessionResponse::from).collect();

    let initial = sse_events::sessions_snapshot_event(user, sessions)
        .into_iter()
        .collect();

    Ok(FeedSubscription {
        user,
        receiver,
        initial,
    })
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a feed subscription into an SSE response, forwarding the events addressed to
/// the subscriber and cleaning up once the client disconnects.
pub fn to_sse_stream(
    subscription: FeedSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let FeedSubscription {
        user,
        mut receiver,
        initial,
    } = subscription;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast, keeps this user's events, pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(FeedEvent { audience, event }) => {
                            if !audience.includes(user) {
                                continue;
                            }
                            if tx.send(Ok(to_event(event))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(%user, skipped, "live feed lagged; skipping events");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%user, "live feed disconnected");
    });

    let initial = initial.into_iter().map(|event| Ok(to_event(event)));
    let stream = stream::iter(initial).chain(ReceiverStream::new(rx));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::GameSessionEntity, services::sse_events::EVENT_SESSIONS_SNAPSHOT,
        state::test_support::memory_state,
    };
    use std::time::SystemTime;

    fn session_with_player(player: Uuid) -> GameSessionEntity {
        let now = SystemTime::now();
        GameSessionEntity {
            id: Uuid::new_v4(),
            title: "Catan night".into(),
            location: None,
            scheduled_time: None,
            catalog_id: "13".into(),
            min_players: Some(3),
            max_players: Some(4),
            creator: player,
            owner: player,
            hosts: vec![player],
            players: vec![player],
            teachers: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn initial_snapshot_lists_sessions_where_user_plays() {
        let state = memory_state().await;
        let store = state.require_session_store().await.unwrap();
        let me = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let mine = store.save_session(session_with_player(me)).await.unwrap();
        store
            .save_session(session_with_player(stranger))
            .await
            .unwrap();

        let subscription = subscribe_feed(&state, me).await.unwrap();
        let initial = subscription.initial_events();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].event.as_deref(), Some(EVENT_SESSIONS_SNAPSHOT));

        let payload: serde_json::Value = serde_json::from_str(&initial[0].data).unwrap();
        assert_eq!(payload["sessions"].as_array().unwrap().len(), 1);
        assert_eq!(payload["sessions"][0]["id"], mine.id.to_string());
    }

    #[tokio::test]
    async fn feed_requires_storage() {
        let state = memory_state().await;
        state.update_degraded(true);
        assert!(matches!(
            subscribe_feed(&state, Uuid::new_v4()).await,
            Err(ServiceError::Degraded)
        ));
    }
}
