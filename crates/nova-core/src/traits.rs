use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// LLM client — OpenAI-compatible streaming.
pub trait LlmClient: Send + Sync + 'static {
    /// Open a streaming chat completion; deltas arrive until the stop marker.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// Tool — a named capability dispatchable by the agent.
pub trait Tool: Send + Sync + 'static {
    /// Tool name (used for dispatch and in the router catalog).
    fn name(&self) -> &str;

    /// One-line description shown to the router model.
    fn description(&self) -> &str;

    /// JSON Schema describing the accepted arguments.
    fn input_schema(&self) -> serde_json::Value;

    /// Run the tool; implementations parse and validate `input` themselves.
    fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> BoxFuture<'_, Result<ToolOutcome>>;
}

/// Schedule store — read side of the schedules table.
pub trait ScheduleStore: Send + Sync + 'static {
    /// List schedules matching the filter, ordered by start time.
    /// Implementations degrade to an empty list on read failure.
    fn list(&self, filter: ScheduleFilter) -> BoxFuture<'_, Result<Vec<Schedule>>>;
}

/// Fan letter store — durable write, returns the created letter id.
pub trait FanLetterStore: Send + Sync + 'static {
    fn create(&self, letter: NewFanLetter) -> BoxFuture<'_, Result<String>>;
}

/// Document index — full-text lookup for retrieval-augmented replies.
pub trait DocIndex: Send + Sync + 'static {
    /// Return up to `limit` snippets relevant to `query`.
    fn search(&self, query: &str, limit: usize) -> BoxFuture<'_, Result<Vec<String>>>;
}
