pub mod respond;
pub mod retrieve;
pub mod router;
pub mod tool;

use std::sync::Arc;

pub use respond::ResponderNode;
pub use retrieve::RetrieverNode;
pub use router::RouterNode;
pub use tool::ToolRunnerNode;

use nova_core::config::{ModelConfig, PersonaConfig};
use nova_core::traits::{DocIndex, LlmClient};
use nova_tools::ToolRegistry;

use crate::executor::{standard_edges, GraphExecutor};
use crate::state::NodeKind;

/// Build the standard Nova conversation graph.
pub fn conversation_graph(
    llm: Arc<dyn LlmClient>,
    model: ModelConfig,
    registry: Arc<ToolRegistry>,
    index: Arc<dyn DocIndex>,
    persona: PersonaConfig,
    top_k: usize,
) -> GraphExecutor {
    let router = RouterNode::new(llm.clone(), model.clone(), registry.definitions());
    let retriever = RetrieverNode::new(index, top_k);
    let tool_runner = ToolRunnerNode::new(registry);
    let responder = ResponderNode::new(llm, model, persona);

    GraphExecutor::new(
        vec![
            Arc::new(router),
            Arc::new(retriever),
            Arc::new(tool_runner),
            Arc::new(responder),
        ],
        standard_edges(),
        NodeKind::Router,
    )
}
