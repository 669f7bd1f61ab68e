pub mod mock;
pub mod retry;
pub mod solar;
pub mod streaming;

use nova_core::config::ModelConfig;
use nova_core::traits::LlmClient;

pub use mock::ScriptedClient;
pub use retry::RetryingClient;
pub use solar::SolarClient;

/// Build the client matching a config's provider name.
pub fn create_client(config: &ModelConfig) -> Box<dyn LlmClient> {
    match config.provider.as_str() {
        // Every supported provider speaks the OpenAI-compatible chat API
        "upstage" | "solar" => Box::new(SolarClient::new()),
        _ => Box::new(SolarClient::new()),
    }
}
