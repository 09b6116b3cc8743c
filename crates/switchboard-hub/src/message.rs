use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server event wrapped as `{type, data}`
#[derive(Debug, Serialize)]
pub struct TypedMessage<'a, T> {
    #[serde(rename = "type")]
    pub message_type: &'a str,
    pub data: &'a T,
}

impl<'a, T: Serialize> TypedMessage<'a, T> {
    pub const fn new(message_type: &'a str, data: &'a T) -> Self {
        Self { message_type, data }
    }
}

/// Task state change pushed to a user's devices
#[derive(Debug, Serialize)]
pub struct TaskUpdate<'a, T> {
    #[serde(rename = "type")]
    pub event_type: &'a str,
    pub task_id: &'a str,
    pub user_id: &'a str,
    pub data: &'a T,
    /// RFC 3339
    pub timestamp: Timestamp,
}

impl<'a, T: Serialize> TaskUpdate<'a, T> {
    pub fn new(event_type: &'a str, task_id: &'a str, user_id: &'a str, data: &'a T) -> Self {
        Self {
            event_type,
            task_id,
            user_id,
            data,
            timestamp: Timestamp::now(),
        }
    }
}

/// Message sent by a connected client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Serialize)]
struct HeartbeatAck {
    #[serde(rename = "type")]
    message_type: &'static str,
    /// Unix seconds
    timestamp: i64,
}

/// React to one inbound text frame, returning the reply to send if any
pub(crate) fn handle_client_message(text: &str, user_id: &str) -> Option<String> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "invalid client message");
            return None;
        }
    };

    match message.message_type.as_str() {
        "heartbeat" => {
            let ack = HeartbeatAck {
                message_type: "heartbeat_ack",
                timestamp: Timestamp::now().as_second(),
            };
            serde_json::to_string(&ack).ok()
        }
        "status_update" => {
            tracing::info!(user_id, data = %message.data, "device status update");
            None
        }
        "task_progress" => {
            tracing::debug!(user_id, data = %message.data, "task progress update");
            None
        }
        other => {
            tracing::warn!(user_id, message_type = other, "unknown client message type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn heartbeat_is_acknowledged() {
        let reply = handle_client_message(r#"{"type": "heartbeat"}"#, "u1").unwrap();
        let reply: Value = serde_json::from_str(&reply).unwrap();

        assert_eq!(reply["type"], "heartbeat_ack");
        assert!(reply["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn informational_and_unknown_messages_get_no_reply() {
        assert!(handle_client_message(r#"{"type": "status_update", "data": {"battery": 80}}"#, "u1").is_none());
        assert!(handle_client_message(r#"{"type": "task_progress", "data": 0.5}"#, "u1").is_none());
        assert!(handle_client_message(r#"{"type": "dance"}"#, "u1").is_none());
    }

    #[test]
    fn malformed_messages_are_ignored() {
        assert!(handle_client_message("not json", "u1").is_none());
        assert!(handle_client_message(r#"{"data": 1}"#, "u1").is_none());
    }

    #[test]
    fn typed_message_shape() {
        let data = json!({"progress": 40});
        let encoded = serde_json::to_value(TypedMessage::new("task_progress", &data)).unwrap();

        insta::assert_json_snapshot!(encoded, @r#"
        {
          "data": {
            "progress": 40
          },
          "type": "task_progress"
        }
        "#);
    }
}
