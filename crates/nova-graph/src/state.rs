use serde::{Deserialize, Serialize};

use nova_core::types::{ChatMessage, Role, SessionId, ToolOutcome};

/// How the router classified the user's latest message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Plain conversation, no context fetch needed.
    Chat,
    /// Needs profile or lore lookup before answering.
    Rag,
    /// Needs a tool call before answering.
    Tool,
}

/// The four nodes of the conversation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Router,
    Retriever,
    ToolRunner,
    Responder,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Router => "router",
            NodeKind::Retriever => "retriever",
            NodeKind::ToolRunner => "tool_runner",
            NodeKind::Responder => "responder",
        }
    }

    /// User-facing progress label for the status channel.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Router => "routing",
            NodeKind::Retriever => "retrieving",
            NodeKind::ToolRunner => "executing tool",
            NodeKind::Responder => "composing",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared state threaded through one graph run.
///
/// `messages` only ever grows; the router writes `intent`, `tool_name`, and
/// `tool_args` once, the retriever fills `retrieved_docs`, the tool runner
/// fills `tool_result`, and the responder appends the assistant reply.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub intent: Option<Intent>,
    pub retrieved_docs: Vec<String>,
    pub tool_name: Option<String>,
    pub tool_args: Option<serde_json::Value>,
    pub tool_result: Option<ToolOutcome>,
    pub session_id: SessionId,
    pub user_id: Option<String>,
}

impl ConversationState {
    pub fn new(
        session_id: SessionId,
        user_id: Option<String>,
        messages: Vec<ChatMessage>,
    ) -> Self {
        Self {
            messages,
            session_id,
            user_id,
            ..Default::default()
        }
    }

    /// The most recent user message text, or "" before any user turn.
    pub fn latest_user_text(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    /// The assistant reply, if the run has produced one.
    pub fn final_reply(&self) -> Option<&str> {
        match self.messages.last() {
            Some(m) if m.role == Role::Assistant => Some(m.content.as_str()),
            _ => None,
        }
    }

    /// Merge a node's partial update. Messages concatenate; every other
    /// field is overwritten only when the update carries it.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if update.intent.is_some() {
            self.intent = update.intent;
        }
        if let Some(docs) = update.retrieved_docs {
            self.retrieved_docs = docs;
        }
        if update.tool_name.is_some() {
            self.tool_name = update.tool_name;
        }
        if update.tool_args.is_some() {
            self.tool_args = update.tool_args;
        }
        if update.tool_result.is_some() {
            self.tool_result = update.tool_result;
        }
    }
}

/// Partial state returned by a node. Absent fields leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<ChatMessage>,
    pub intent: Option<Intent>,
    pub retrieved_docs: Option<Vec<String>>,
    pub tool_name: Option<String>,
    pub tool_args: Option<serde_json::Value>,
    pub tool_result: Option<ToolOutcome>,
}
