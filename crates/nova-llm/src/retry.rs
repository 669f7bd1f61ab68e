use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use rand::Rng;
use tracing::{info, warn};

use nova_core::config::{ModelConfig, RetryConfig};
use nova_core::error::{NovaError, Result};
use nova_core::traits::LlmClient;
use nova_core::types::*;

/// Substrings in a request error that mark it as transient.
const TRANSIENT_MARKERS: &[&str] = &["429", "500", "502", "503", "timeout", "connection"];

/// Wraps a primary client with bounded retries, then walks a fallback model
/// chain when the primary is exhausted.
pub struct RetryingClient {
    primary: Box<dyn LlmClient>,
    fallbacks: Vec<(ModelConfig, Box<dyn LlmClient>)>,
    retry_config: RetryConfig,
}

impl RetryingClient {
    pub fn new(
        primary: Box<dyn LlmClient>,
        fallbacks: Vec<(ModelConfig, Box<dyn LlmClient>)>,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            primary,
            fallbacks,
            retry_config,
        }
    }
}

fn should_retry(e: &NovaError) -> bool {
    match e {
        NovaError::LlmRequest(msg) => TRANSIENT_MARKERS.iter().any(|m| msg.contains(m)),
        NovaError::LlmStream(_) => true,
        _ => false,
    }
}

fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = config
        .initial_backoff_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_backoff_ms);
    let jitter = rand::thread_rng().gen_range(0.8..1.2);
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl LlmClient for RetryingClient {
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        let config = config.clone();

        Box::pin(async move {
            let max_retries = self.retry_config.max_retries;

            let mut last_error = None;
            for attempt in 0..=max_retries {
                match self.primary.chat_stream(&config, messages.clone()).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => {
                        warn!(
                            model = %config.model_id,
                            attempt = attempt + 1,
                            max_retries,
                            error = %e,
                            "LLM request failed"
                        );
                        let out_of_budget = attempt == max_retries || !should_retry(&e);
                        last_error = Some(e);
                        if out_of_budget {
                            break;
                        }
                        tokio::time::sleep(backoff_delay(attempt, &self.retry_config)).await;
                    }
                }
            }

            if !self.fallbacks.is_empty() {
                info!("Primary model exhausted, trying fallbacks");
            }
            for (fb_config, fb_client) in &self.fallbacks {
                match fb_client.chat_stream(fb_config, messages.clone()).await {
                    Ok(stream) => {
                        info!(
                            model = %fb_config.model_id,
                            provider = %fb_config.provider,
                            "Serving from fallback model"
                        );
                        return Ok(stream);
                    }
                    Err(e) => {
                        warn!(model = %fb_config.model_id, error = %e, "Fallback failed");
                    }
                }
            }

            Err(last_error.unwrap_or_else(|| NovaError::LlmRequest("no usable model".into())))
        })
    }
}
