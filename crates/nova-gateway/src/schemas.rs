use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incoming chat request, shared by the plain and streaming endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ChatRequest {
    /// Bounds are checked before any run starts.
    pub fn validate(&self) -> Result<(), String> {
        let message_len = self.message.chars().count();
        if message_len == 0 || message_len > 2000 {
            return Err("message must be between 1 and 2000 characters".into());
        }
        let session_len = self.session_id.chars().count();
        if session_len == 0 || session_len > 100 {
            return Err("session_id must be between 1 and 100 characters".into());
        }
        Ok(())
    }
}

/// Reply from the plain chat endpoint.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub tool_used: Option<String>,
    pub timestamp: DateTime<Utc>,
}
