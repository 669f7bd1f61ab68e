use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use nova_core::config::ModelConfig;
use nova_core::error::Result;
use nova_core::traits::LlmClient;
use nova_core::types::{ChatMessage, StreamDelta, ToolDefinition};

use crate::executor::GraphNode;
use crate::prompts::router_instructions;
use crate::state::{ConversationState, Intent, NodeKind, StateUpdate};
use crate::tap::RunTap;

/// Classifies the user's latest message and, for tool turns, picks the tool
/// and its arguments. The router's own tokens are tagged so the merger can
/// drop them; fans never see classification chatter.
pub struct RouterNode {
    llm: Arc<dyn LlmClient>,
    model: ModelConfig,
    catalog: Vec<ToolDefinition>,
}

impl RouterNode {
    pub fn new(llm: Arc<dyn LlmClient>, model: ModelConfig, catalog: Vec<ToolDefinition>) -> Self {
        Self {
            llm,
            model,
            catalog,
        }
    }
}

/// Raw classification reply.
#[derive(Deserialize)]
struct RouterVerdict {
    intent: String,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    tool_args: Option<serde_json::Value>,
}

/// Resolve a raw router reply into a classification.
///
/// Anything unparseable falls back to chat rather than failing the turn; a
/// tool intent without a usable tool name is downgraded the same way.
fn resolve_verdict(raw: &str) -> (Intent, Option<String>, Option<serde_json::Value>) {
    let json_str = extract_json(raw);

    let verdict: RouterVerdict = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, reply = %raw, "Unparseable router reply, defaulting to chat");
            return (Intent::Chat, None, None);
        }
    };

    match verdict.intent.to_lowercase().as_str() {
        "chat" => (Intent::Chat, None, None),
        "rag" => (Intent::Rag, None, None),
        "tool" => match verdict.tool_name {
            Some(name) if !name.trim().is_empty() => (Intent::Tool, Some(name), verdict.tool_args),
            _ => {
                warn!("Tool intent without a tool name, downgrading to chat");
                (Intent::Chat, None, None)
            }
        },
        other => {
            warn!(intent = %other, "Unknown intent from router, defaulting to chat");
            (Intent::Chat, None, None)
        }
    }
}

/// Extract JSON from a reply that may wrap it in markdown code fences or
/// surrounding prose. Falls back to the trimmed input when no object is found.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let body = &trimmed[start + fence.len()..];
            if let Some(end) = body.find("```") {
                return body[..end].trim();
            }
        }
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &trimmed[start..=end],
        _ => trimmed,
    }
}

impl GraphNode for RouterNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Router
    }

    fn run<'a>(
        &'a self,
        state: &'a ConversationState,
        tap: &'a RunTap,
    ) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            let today = Utc::now().format("%Y-%m-%d").to_string();
            let messages = vec![
                ChatMessage::system(router_instructions(&self.catalog, &today)),
                ChatMessage::user(state.latest_user_text()),
            ];

            let mut stream = self.llm.chat_stream(&self.model, messages).await?;

            let mut raw = String::new();
            while let Some(delta) = stream.next().await {
                if let Ok(StreamDelta::TextDelta(text)) = delta {
                    tap.token(NodeKind::Router, text.clone()).await;
                    raw.push_str(&text);
                }
            }

            let (intent, tool_name, tool_args) = resolve_verdict(&raw);
            debug!(
                intent = ?intent,
                tool = tool_name.as_deref().unwrap_or("-"),
                "Intent classified"
            );

            Ok(StateUpdate {
                intent: Some(intent),
                tool_name,
                tool_args,
                ..Default::default()
            })
        })
    }
}
