use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use tracing::{debug, warn};

use nova_core::config::{ModelConfig, PersonaConfig};
use nova_core::error::Result;
use nova_core::traits::LlmClient;
use nova_core::types::{ChatMessage, StreamDelta};

use crate::executor::GraphNode;
use crate::prompts::responder_system_prompt;
use crate::state::{ConversationState, NodeKind, StateUpdate};
use crate::tap::RunTap;

/// Line shown when the model streams back nothing at all.
const EMPTY_REPLY_FALLBACK: &str =
    "Hmm, I lost my train of thought. Could you say that one more time?";

/// Writes the persona reply. This is the only node whose tokens reach the
/// user, streamed through the tap as they arrive.
pub struct ResponderNode {
    llm: Arc<dyn LlmClient>,
    model: ModelConfig,
    persona: PersonaConfig,
}

impl ResponderNode {
    pub fn new(llm: Arc<dyn LlmClient>, model: ModelConfig, persona: PersonaConfig) -> Self {
        Self {
            llm,
            model,
            persona,
        }
    }
}

impl GraphNode for ResponderNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Responder
    }

    fn run<'a>(
        &'a self,
        state: &'a ConversationState,
        tap: &'a RunTap,
    ) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            let system = responder_system_prompt(&self.persona, state);
            let mut messages = vec![ChatMessage::system(system)];
            messages.extend(state.messages.iter().cloned());

            let mut stream = self.llm.chat_stream(&self.model, messages).await?;

            let mut reply = String::new();
            while let Some(delta) = stream.next().await {
                match delta {
                    Ok(StreamDelta::TextDelta(text)) => {
                        tap.token(NodeKind::Responder, text.clone()).await;
                        reply.push_str(&text);
                    }
                    Ok(StreamDelta::Stop(reason)) => {
                        debug!(reason = ?reason, "Reply complete");
                    }
                    Ok(StreamDelta::Usage { .. }) => {}
                    Err(e) => return Err(e),
                }
            }

            if reply.is_empty() {
                warn!("Model returned an empty reply, substituting fallback line");
                reply = EMPTY_REPLY_FALLBACK.to_string();
                tap.token(NodeKind::Responder, reply.clone()).await;
            }

            Ok(StateUpdate {
                messages: vec![ChatMessage::assistant(reply)],
                ..Default::default()
            })
        })
    }
}
