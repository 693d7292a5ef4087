//! Server-sent event stream for dashboards.
//!
//! Each connection gets its own receiver on the [`EventBus`] and only sees
//! broadcast events and events addressed to the caller.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use examtrack_core::AppError;
use examtrack_models::DomainEvent;
use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::instrument;
use uuid::Uuid;

use crate::events::EventBus;
use crate::metrics::set_event_subscribers;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

struct Subscription {
    receiver: broadcast::Receiver<DomainEvent>,
    user_id: Uuid,
    bus: EventBus,
}

impl Subscription {
    fn new(bus: &EventBus, user_id: Uuid) -> Self {
        let receiver = bus.subscribe();
        set_event_subscribers(bus.receiver_count());
        Self {
            receiver,
            user_id,
            bus: bus.clone(),
        }
    }

    /// Next event for this user, or `None` once the bus is gone.
    async fn next_visible(&mut self) -> Option<DomainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.is_visible_to(self.user_id) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user_id, skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        set_event_subscribers(self.bus.receiver_count().saturating_sub(1));
        tracing::debug!(user_id = %self.user_id, "Event stream closed");
    }
}

fn to_sse(event: &DomainEvent) -> Option<Event> {
    match Event::default()
        .id(event.id.to_string())
        .event(event.kind.as_str())
        .json_data(event)
    {
        Ok(sse) => Some(sse),
        Err(err) => {
            tracing::error!(error = %err, kind = %event.kind, "Failed to encode event");
            None
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "Stream of domain events", content_type = "text/event-stream", body = DomainEvent),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn stream_events(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = Subscription::new(&state.events, auth_user.user_id()?);
    tracing::debug!(user_id = %subscription.user_id, "Event stream opened");

    let stream = stream::unfold(subscription, |mut subscription| async move {
        loop {
            let event = subscription.next_visible().await?;
            if let Some(sse) = to_sse(&event) {
                return Some((Ok::<_, Infallible>(sse), subscription));
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use examtrack_models::events::kinds;

    fn event(recipient: Option<Uuid>) -> DomainEvent {
        let event = DomainEvent::new(
            kinds::TRANSFER_REQUESTED,
            "batch_transfer",
            Uuid::new_v4(),
            &serde_json::json!({}),
        );
        match recipient {
            Some(id) => event.to_recipient(id),
            None => event,
        }
    }

    #[tokio::test]
    async fn test_skips_events_for_other_users() {
        let bus = EventBus::default();
        let me = Uuid::new_v4();
        let mut subscription = Subscription::new(&bus, me);

        bus.publish(event(Some(Uuid::new_v4())));
        let mine = event(Some(me));
        let mine_id = mine.id;
        bus.publish(mine);

        let received = subscription.next_visible().await.unwrap();
        assert_eq!(received.id, mine_id);
    }

    #[tokio::test]
    async fn test_lag_is_skipped() {
        let bus = EventBus::new(1);
        let mut subscription = Subscription::new(&bus, Uuid::new_v4());

        bus.publish(event(None));
        let latest = event(None);
        let latest_id = latest.id;
        bus.publish(latest);

        let received = subscription.next_visible().await.unwrap();
        assert_eq!(received.id, latest_id);
    }
}
