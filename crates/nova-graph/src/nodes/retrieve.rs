use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{info, warn};

use nova_core::error::Result;
use nova_core::traits::DocIndex;

use crate::executor::GraphNode;
use crate::state::{ConversationState, NodeKind, StateUpdate};
use crate::tap::RunTap;

/// Pulls reference passages for the responder. A broken index degrades to an
/// empty result set so the turn still produces an answer.
pub struct RetrieverNode {
    index: Arc<dyn DocIndex>,
    top_k: usize,
}

impl RetrieverNode {
    pub fn new(index: Arc<dyn DocIndex>, top_k: usize) -> Self {
        Self { index, top_k }
    }
}

impl GraphNode for RetrieverNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Retriever
    }

    fn run<'a>(
        &'a self,
        state: &'a ConversationState,
        _tap: &'a RunTap,
    ) -> BoxFuture<'a, Result<StateUpdate>> {
        Box::pin(async move {
            let query = state.latest_user_text();
            let docs = match self.index.search(query, self.top_k).await {
                Ok(docs) => {
                    info!(count = docs.len(), "Retrieved reference passages");
                    docs
                }
                Err(e) => {
                    warn!(error = %e, "Retrieval failed, continuing without context");
                    Vec::new()
                }
            };

            Ok(StateUpdate {
                retrieved_docs: Some(docs),
                ..Default::default()
            })
        })
    }
}
