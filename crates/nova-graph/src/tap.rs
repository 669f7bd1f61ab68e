use tokio::sync::mpsc;

use crate::state::NodeKind;

/// A token produced by a node's LLM stream, tagged with its origin so the
/// merger can tell responder output from router chatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEvent {
    pub node: NodeKind,
    pub text: String,
}

/// Observation taps handed to a graph run.
///
/// The two channels are independent and bounded: `lifecycle` carries the
/// node kind each time the executor enters a node, `tokens` carries tagged
/// LLM deltas. A silent tap drops everything, which is what non-streaming
/// runs use. Send failures are ignored so an abandoned consumer never
/// aborts the run.
#[derive(Clone)]
pub struct RunTap {
    lifecycle: Option<mpsc::Sender<NodeKind>>,
    tokens: Option<mpsc::Sender<TokenEvent>>,
}

impl RunTap {
    /// A tap that observes nothing.
    pub fn silent() -> Self {
        Self {
            lifecycle: None,
            tokens: None,
        }
    }

    /// A tap with live channels plus their receiving ends.
    pub fn channels(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<NodeKind>, mpsc::Receiver<TokenEvent>) {
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(capacity);
        let (token_tx, token_rx) = mpsc::channel(capacity);
        (
            Self {
                lifecycle: Some(lifecycle_tx),
                tokens: Some(token_tx),
            },
            lifecycle_rx,
            token_rx,
        )
    }

    /// Report that the executor entered a node.
    pub async fn entered(&self, node: NodeKind) {
        if let Some(tx) = &self.lifecycle {
            let _ = tx.send(node).await;
        }
    }

    /// Report one LLM token from a node.
    pub async fn token(&self, node: NodeKind, text: impl Into<String>) {
        if let Some(tx) = &self.tokens {
            let _ = tx
                .send(TokenEvent {
                    node,
                    text: text.into(),
                })
                .await;
        }
    }
}
