// ABOUTME: Side-channel message exchanged between workers through their mailboxes
// ABOUTME: Built by the sending side and owned by the receiving mailbox until consumed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Priority;
use super::JsonMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message_type: String,
    #[serde(default)]
    pub payload: JsonMap,
    #[serde(default)]
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        message_type: impl Into<String>,
        payload: JsonMap,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            message_type: message_type.into(),
            payload,
            priority: Priority::default(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}
