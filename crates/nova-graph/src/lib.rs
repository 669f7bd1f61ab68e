pub mod executor;
pub mod nodes;
pub mod prompts;
pub mod session;
pub mod state;
pub mod stream;
pub mod tap;

pub use executor::{standard_edges, Edge, EdgeCondition, GraphExecutor, GraphNode};
pub use nodes::conversation_graph;
pub use session::SessionHistory;
pub use state::{ConversationState, Intent, NodeKind, StateUpdate};
pub use stream::{StreamMerger, TurnRequest};
pub use tap::{RunTap, TokenEvent};
