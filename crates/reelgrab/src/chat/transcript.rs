use serde::Serialize;
use serde_json::{Map, Value};

use crate::page::fields::{first_present_field, first_text_field};

/// Keys that may wrap the message list, checked in order.
const CONTAINER_FIELDS: &[&str] = &["messages", "chat", "items", "data"];
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "time", "created_at", "date"];
const USERNAME_FIELDS: &[&str] = &["username", "user", "name", "author", "from"];
const TEXT_FIELDS: &[&str] = &["message", "text", "content", "body"];
const USER_ID_FIELDS: &[&str] = &["user_id", "userId", "uid", "id"];

const UNKNOWN_USER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// As sent by the server; empty when no timestamp field was present.
    pub timestamp: String,
    pub username: String,
    pub message: String,
    pub user_id: Option<String>,
}

impl ChatMessage {
    /// Read one message record. Records without any text are skipped.
    pub fn from_record(record: &Map<String, Value>) -> Option<Self> {
        let message = first_text_field(record, TEXT_FIELDS)?;
        Some(Self {
            timestamp: first_text_field(record, TIMESTAMP_FIELDS).unwrap_or_default(),
            username: first_text_field(record, USERNAME_FIELDS)
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            message,
            user_id: first_text_field(record, USER_ID_FIELDS),
        })
    }
}

/// Collect messages from a chat payload: either a list of message records or
/// an object nesting such a list under one of the container keys.
pub fn parse_chat_data(data: &Value) -> Vec<ChatMessage> {
    match data {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(ChatMessage::from_record)
            .collect(),
        Value::Object(map) => first_present_field(map, CONTAINER_FIELDS)
            .map(parse_chat_data)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
