use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque key correlating the turns of one conversation.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation message, timestamped at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

/// One increment of a streamed model reply.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A fragment of reply text.
    TextDelta(String),

    /// Generation finished.
    Stop(StopReason),

    /// Token accounting for the call.
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
}

/// Uniform envelope returned by every tool dispatch.
///
/// `mock` marks results sourced from fixed non-authoritative tables; it is
/// never a failure signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub mock: bool,
}

impl ToolOutcome {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            mock: false,
        }
    }

    pub fn mock_success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            mock: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            mock: false,
        }
    }
}

/// Catalog entry describing a tool to the router model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Per-run identity handed to a tool invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: SessionId,
    pub user_id: Option<String>,
}

/// A schedule entry read back from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub title: String,
    /// ISO 8601, e.g. "2026-03-14T20:00:00Z".
    pub start_time: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Filter for schedule lookups. All fields optional; dates are "YYYY-MM-DD".
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub event_type: Option<String>,
}

/// Payload for persisting a fan letter.
#[derive(Debug, Clone)]
pub struct NewFanLetter {
    pub session_id: String,
    pub user_id: Option<String>,
    pub category: String,
    pub message: String,
}

/// Wire event emitted on the chat stream.
///
/// Every stream is a finite sequence of these, terminated by exactly one
/// `Done` whatever happened before it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChatEvent {
    /// A node took over; `label` is the user-facing activity name.
    Status { label: String },

    /// One incremental fragment of the assistant reply.
    Token { text: String },

    /// The completed reply for this turn.
    Final {
        text: String,
        #[serde(rename = "toolUsed", skip_serializing_if = "Option::is_none")]
        tool_used: Option<String>,
    },

    /// The run failed. A `Done` still follows.
    Error { message: String },

    /// End-of-stream marker.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_outcome_failure_shape() {
        let outcome = ToolOutcome::failure("unknown tool: frobnicate");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "unknown tool: frobnicate");
        assert_eq!(json["mock"], false);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_tool_outcome_mock_flag() {
        let outcome = ToolOutcome::mock_success(serde_json::json!({"song": "x"}));
        assert!(outcome.success);
        assert!(outcome.mock);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_chat_event_wire_keys() {
        let ev = ChatEvent::Status {
            label: "routing".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "status");
        assert_eq!(json["label"], "routing");

        let ev = ChatEvent::Final {
            text: "안녕".into(),
            tool_used: Some("get_schedule".into()),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "final");
        assert_eq!(json["toolUsed"], "get_schedule");

        let ev = ChatEvent::Done;
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "done");
    }

    #[test]
    fn test_final_omits_tool_used_when_unset() {
        let ev = ChatEvent::Final {
            text: "hi".into(),
            tool_used: None,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json.get("toolUsed").is_none());
    }
}
