use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    dto::{
        round::RoundSnapshot,
        sse::{Handshake, ServerEvent},
    },
    error::ServiceError,
    services::sse_events::{self, EVENT_HANDSHAKE},
    state::{SharedState, identity::IdentitySubscription},
};

/// Receivers feeding one client's session stream.
pub struct SessionStream {
    session_id: Uuid,
    handshake: Option<ServerEvent>,
    events: broadcast::Receiver<ServerEvent>,
    identity: IdentitySubscription,
}

/// Subscribe to the events of play session `id`.
///
/// Subscription happens before the handshake snapshot is taken so no event falls in between.
pub async fn subscribe_session(
    state: &SharedState,
    id: Uuid,
) -> Result<SessionStream, ServiceError> {
    let session = state.session(id)?;
    let events = session.events().subscribe();
    let identity = session.identity().subscribe();

    let snapshot = {
        let controller = session.controller().await;
        RoundSnapshot::new(
            id,
            controller.view(),
            session.identity().current().map(Into::into),
        )
    };
    let handshake = ServerEvent::json(
        Some(EVENT_HANDSHAKE.to_string()),
        &Handshake {
            degraded: state.is_degraded(),
            snapshot,
        },
    )
    .inspect_err(|err| tracing::warn!(error = %err, "failed to serialize SSE handshake"))
    .ok();

    Ok(SessionStream {
        session_id: id,
        handshake,
        events,
        identity,
    })
}

/// Convert a session subscription into an SSE response, forwarding round and identity
/// events until the client disconnects.
pub fn to_sse_stream(
    subscription: SessionStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let SessionStream {
        session_id,
        handshake,
        mut events,
        mut identity,
    } = subscription;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            let next = tokio::select! {
                _ = tx.closed() => break,
                recv_result = events.recv() => match recv_result {
                    Ok(payload) => payload,
                    Err(RecvError::Closed) => break,
                    // Skip lagged messages but keep the stream alive.
                    Err(RecvError::Lagged(_)) => continue,
                },
                change = identity.recv() => match change.and_then(sse_events::identity_changed_event) {
                    Some(payload) => payload,
                    None => break,
                },
            };

            if tx.send(Ok(to_event(next))).await.is_err() {
                break;
            }
        }

        tracing::info!(session = %session_id, "session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::round::CreateSessionRequest,
        services::round_service,
        state::{AppState, identity::UserIdentity},
    };

    #[tokio::test]
    async fn subscription_counts_as_listener_until_dropped() {
        let state = AppState::new(AppConfig::default());
        let id = round_service::create_session(&state, CreateSessionRequest::default())
            .await
            .unwrap()
            .session_id;
        let session = state.session(id).unwrap();

        let mut stream = subscribe_session(&state, id).await.unwrap();
        assert_eq!(session.events().listener_count(), 1);
        assert_eq!(session.identity().subscriber_count(), 1);

        let handshake = stream.handshake.take().unwrap();
        assert_eq!(handshake.event.as_deref(), Some(EVENT_HANDSHAKE));
        assert!(handshake.data.contains(r#""phase":"idle""#));

        session.identity().sign_in(UserIdentity {
            id: "fan".into(),
            display_name: None,
        });
        let change = stream.identity.recv().await.unwrap();
        let event = sse_events::identity_changed_event(change).unwrap();
        assert_eq!(event.event.as_deref(), Some("identity.changed"));

        drop(stream);
        assert_eq!(session.events().listener_count(), 0);
        assert_eq!(session.identity().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn unknown_session_cannot_be_streamed() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            subscribe_session(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
