use std::{convert::Infallible, time::Duration};

use axum::{
    Router,
    extract::{Query, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use crate::DeploymentImpl;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub table: Option<String>,
}

/// Server-sent stream of row changes, optionally for a single table.
pub async fn stream_events(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = deployment.events().subscribe(query.table).map(|event| {
        let sse = Event::default()
            .event(event.kind.to_string())
            .json_data(&event)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to encode realtime event: {e}");
                Event::default().comment("encoding error")
            });
        Ok(sse)
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/events", get(stream_events))
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use services::services::events::ChangeKind;
    use uuid::Uuid;

    use super::*;
    use crate::deployment::tests::test_deployment;

    #[tokio::test]
    async fn test_stream_delivers_published_event() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;
        let response = stream_events(
            State(deployment.clone()),
            Query(EventsQuery {
                table: Some("messages".into()),
            }),
        )
        .await
        .into_response();
        let mut body = response.into_body().into_data_stream();

        let id = Uuid::new_v4();
        deployment
            .events()
            .publish("announcements", ChangeKind::Insert, Uuid::new_v4(), &"ignored");
        deployment.events().publish(
            "messages",
            ChangeKind::Update,
            id,
            &serde_json::json!({"read": true}),
        );

        let frame = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.contains("event: update"));
        assert!(text.contains(&id.to_string()));
        assert!(!text.contains("announcements"));
    }
}
