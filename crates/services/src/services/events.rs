//! In-process fan-out of row changes for live views.

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RealtimeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record_id: Uuid,
    #[ts(type = "unknown")]
    pub payload: serde_json::Value,
}

#[derive(Clone)]
pub struct EventService {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl Default for EventService {
    fn default() -> Self {
        Self::new()
    }
}

impl EventService {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish a change; with nobody listening the event is dropped.
    pub fn publish<T: Serialize>(&self, table: &str, kind: ChangeKind, record_id: Uuid, row: &T) {
        let payload = serde_json::to_value(row).unwrap_or(serde_json::Value::Null);
        let receivers = self
            .tx
            .send(RealtimeEvent {
                table: table.to_string(),
                kind,
                record_id,
                payload,
            })
            .unwrap_or(0);
        debug!(table, %kind, %record_id, receivers, "Published realtime event");
    }

    /// Live events, optionally restricted to one table. Lagged receivers skip
    /// what they missed.
    pub fn subscribe(
        &self,
        table: Option<String>,
    ) -> impl Stream<Item = RealtimeEvent> + Send + use<> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(move |item| {
            let event = item
                .ok()
                .filter(|e| table.as_deref().is_none_or(|t| t == e.table));
            async move { event }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_filters_by_table() {
        let events = EventService::new();
        let mut messages = Box::pin(events.subscribe(Some("messages".into())));

        let id = Uuid::new_v4();
        events.publish("announcements", ChangeKind::Insert, Uuid::new_v4(), &"ignored");
        events.publish("messages", ChangeKind::Insert, id, &serde_json::json!({"body": "Oi"}));

        let event = messages.next().await.unwrap();
        assert_eq!(event.table, "messages");
        assert_eq!(event.record_id, id);
        assert_eq!(event.payload["body"], "Oi");
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        EventService::new().publish("feed_posts", ChangeKind::Delete, Uuid::new_v4(), &());
    }
}
