use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use nova_core::error::Result;
use nova_core::types::ToolContext;
use nova_tools::ToolRegistry;

use crate::executor::GraphNode;
use crate::state::{ConversationState, NodeKind, StateUpdate};
use crate::tap::RunTap;

/// Runs the tool the router picked. Failures land in the state as a failed
/// outcome; the responder tells the user what went wrong.
pub struct ToolRunnerNode {
    registry: Arc<ToolRegistry>,
}

impl ToolRunnerNode {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

impl GraphNode for ToolRunnerNode {
    fn kind(&self) -> NodeKind {
        NodeKind::ToolRunner
    }

    fn run<'a>(
        &'a self,
        state: &'a ConversationState,
        _tap: &'a RunTap,
    ) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            let name = state.tool_name.clone().unwrap_or_default();
            let args = state
                .tool_args
                .clone()
                .unwrap_or_else(|| serde_json::json!({}));
            let ctx = ToolContext {
                session_id: state.session_id.clone(),
                user_id: state.user_id.clone(),
            };

            let outcome = self.registry.dispatch(&name, args, ctx).await;
            info!(tool = %name, success = outcome.success, "Tool finished");

            Ok(StateUpdate {
                tool_result: Some(outcome),
                ..Default::default()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::types::{ChatMessage, SessionId};
    use nova_storage::{Database, SqliteFanLetterStore, SqliteScheduleStore};

    fn registry() -> Arc<ToolRegistry> {
        let db = Database::in_memory().unwrap();
        Arc::new(ToolRegistry::with_builtins(
            Arc::new(SqliteScheduleStore::new(db.clone())),
            Arc::new(SqliteFanLetterStore::new(db)),
        ))
    }

    fn state_with_tool(name: Option<&str>, args: Option<serde_json::Value>) -> ConversationState {
        let mut state = ConversationState::new(
            SessionId::from_str("s1"),
            Some("fan-7".into()),
            vec![ChatMessage::user("hi")],
        );
        state.tool_name = name.map(String::from);
        state.tool_args = args;
        state
    }

    #[tokio::test]
    async fn test_runs_selected_tool() {
        let node = ToolRunnerNode::new(registry());
        let state = state_with_tool(Some("get_weather"), Some(serde_json::json!({})));

        let update = node.run(&state, &RunTap::silent()).await.unwrap();

        let outcome = update.tool_result.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["location"], "Seoul");
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_failed_outcome() {
        let node = ToolRunnerNode::new(registry());
        let state = state_with_tool(Some("time_travel"), None);

        let update = node.run(&state, &RunTap::silent()).await.unwrap();

        let outcome = update.tool_result.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("unknown tool: time_travel"));
    }

    #[tokio::test]
    async fn test_missing_args_default_to_empty_object() {
        let node = ToolRunnerNode::new(registry());
        let state = state_with_tool(Some("recommend_song"), None);

        let update = node.run(&state, &RunTap::silent()).await.unwrap();

        let outcome = update.tool_result.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["mood"], "happy");
    }
}
