use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use tracing::{debug, info};

use nova_core::error::{NovaError, Result};

use crate::state::{ConversationState, Intent, NodeKind, StateUpdate};
use crate::tap::RunTap;

/// One node of the conversation graph.
pub trait GraphNode: Send + Sync + 'static {
    fn kind(&self) -> NodeKind;

    /// Run the node against the current state and return a partial update.
    /// Nodes report their LLM tokens through the tap, tagged with their kind.
    fn run<'a>(
        &'a self,
        state: &'a ConversationState,
        tap: &'a RunTap,
    ) -> BoxFuture<'a, Result<StateUpdate>>;
}

/// When an edge may be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCondition {
    Always,
    IntentIs(Intent),
}

impl EdgeCondition {
    fn matches(&self, state: &ConversationState) -> bool {
        match self {
            EdgeCondition::Always => true,
            EdgeCondition::IntentIs(intent) => state.intent == Some(*intent),
        }
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: NodeKind,
    pub to: NodeKind,
    pub condition: EdgeCondition,
}

impl Edge {
    pub fn always(from: NodeKind, to: NodeKind) -> Self {
        Self {
            from,
            to,
            condition: EdgeCondition::Always,
        }
    }

    pub fn when_intent(from: NodeKind, to: NodeKind, intent: Intent) -> Self {
        Self {
            from,
            to,
            condition: EdgeCondition::IntentIs(intent),
        }
    }
}

/// Walks the conversation graph for one turn.
///
/// Starting from the entry node, the executor runs each node, merges its
/// update into the state, and follows the first outgoing edge whose
/// condition matches. A node without outgoing edges ends the run. Each node
/// runs at most once per turn; a cycle or an unmatched condition set is a
/// routing error, not a silent stop.
pub struct GraphExecutor {
    nodes: HashMap<NodeKind, Arc<dyn GraphNode>>,
    edges: Vec<Edge>,
    entry: NodeKind,
}

impl GraphExecutor {
    pub fn new(nodes: Vec<Arc<dyn GraphNode>>, edges: Vec<Edge>, entry: NodeKind) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.kind(), n)).collect();
        Self {
            nodes,
            edges,
            entry,
        }
    }

    /// Run one turn to completion and return the final state.
    pub async fn run(&self, state: ConversationState, tap: &RunTap) -> Result<ConversationState> {
        let start = Instant::now();
        let mut state = state;
        let mut current = self.entry;
        let mut visited: Vec<NodeKind> = Vec::new();

        loop {
            if visited.contains(&current) {
                return Err(NovaError::Routing(format!(
                    "node {} re-entered in the same turn",
                    current
                )));
            }
            visited.push(current);

            let node = self.nodes.get(&current).ok_or_else(|| {
                NovaError::Routing(format!("node {} is not wired into the graph", current))
            })?;

            tap.entered(current).await;
            info!(node = %current, "Entering graph node");

            let update = node.run(&state, tap).await?;
            state.apply(update);

            let outgoing: Vec<&Edge> = self.edges.iter().filter(|e| e.from == current).collect();
            if outgoing.is_empty() {
                debug!(node = %current, "No outgoing edges, turn complete");
                break;
            }

            // First matching edge wins
            let next = outgoing
                .iter()
                .find(|e| e.condition.matches(&state))
                .map(|e| e.to);

            match next {
                Some(next) => current = next,
                None => {
                    return Err(NovaError::Routing(format!(
                        "no edge out of {} matched (intent: {:?})",
                        current, state.intent
                    )));
                }
            }
        }

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            nodes = visited.len(),
            "Graph turn complete"
        );
        Ok(state)
    }
}

/// The standard Nova wiring: router fans out by intent, retrieval and tool
/// execution both feed the responder, the responder ends the turn.
pub fn standard_edges() -> Vec<Edge> {
    vec![
        Edge::when_intent(NodeKind::Router, NodeKind::Retriever, Intent::Rag),
        Edge::when_intent(NodeKind::Router, NodeKind::ToolRunner, Intent::Tool),
        Edge::when_intent(NodeKind::Router, NodeKind::Responder, Intent::Chat),
        Edge::always(NodeKind::Retriever, NodeKind::Responder),
        Edge::always(NodeKind::ToolRunner, NodeKind::Responder),
    ]
}
