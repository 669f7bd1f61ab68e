use std::sync::Arc;

use nova_graph::StreamMerger;
use nova_storage::Database;

/// Everything a request handler needs, cloned per connection.
pub struct AppState {
    pub merger: Arc<StreamMerger>,
    pub db: Database,
    pub environment: String,
}
