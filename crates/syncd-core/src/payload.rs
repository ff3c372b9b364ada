use serde::{Deserialize, Serialize};

/// One entry in a notification envelope's `value` array.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    pub subscription_id: String,
    /// Of the form `sites/{site}/lists/{list}`.
    pub resource: String,
    pub change_type: String,
    pub client_state: String,
}

/// The Source's change-notification envelope: `{"value": [...]}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationEnvelope {
    pub value: Vec<ChangeEntry>,
}

/// Self-enqueued continuation carrying a batch's unprocessed tail plus the
/// pending cursor, per spec §4.6 "Batching and continuations".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContinuationPayload {
    pub item_ids: Vec<String>,
    pub delta_link: String,
}

/// Recognized shapes for an inbound queue message body. C7 dispatches on
/// this; anything that isn't one of these two shapes is `Unrecognized`.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Notification(NotificationEnvelope),
    Continuation(ContinuationPayload),
    Unrecognized,
}

impl InboundMessage {
    /// Parses raw message bytes into one of the two recognized shapes.
    /// Never errors: an unparseable or unrecognized body becomes
    /// `Unrecognized`, which C7 logs and acks per spec §4.7.
    pub fn parse(bytes: &[u8]) -> Self {
        let Ok(json) = serde_json::from_slice::<serde_json::Value>(bytes) else {
            return InboundMessage::Unrecognized;
        };

        if json.get("value").and_then(|v| v.as_array()).is_some() {
            if let Ok(envelope) = serde_json::from_value::<NotificationEnvelope>(json.clone()) {
                return InboundMessage::Notification(envelope);
            }
        }

        if json.get("ItemIds").is_some() && json.get("DeltaLink").is_some() {
            if let Ok(continuation) = serde_json::from_value::<ContinuationPayload>(json) {
                return InboundMessage::Continuation(continuation);
            }
        }

        InboundMessage::Unrecognized
    }
}
