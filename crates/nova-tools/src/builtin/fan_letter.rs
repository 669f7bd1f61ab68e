use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use nova_core::error::{NovaError, Result};
use nova_core::traits::{FanLetterStore, Tool};
use nova_core::types::{NewFanLetter, ToolContext, ToolOutcome};

/// Deliver a fan letter to storage. The session and user identifiers come
/// from the tool context, not from the model-provided arguments.
pub struct SendFanLetterTool {
    store: Arc<dyn FanLetterStore>,
}

impl SendFanLetterTool {
    pub fn new(store: Arc<dyn FanLetterStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct SendFanLetterInput {
    #[serde(default)]
    message: String,
    #[serde(default)]
    category: Option<String>,
}

impl Tool for SendFanLetterTool {
    fn name(&self) -> &str {
        "send_fan_letter"
    }

    fn description(&self) -> &str {
        "Send a fan letter to Nova. Letters are stored so Nova can read them later."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The letter body"
                },
                "category": {
                    "type": "string",
                    "description": "One of support, request, question, other (default: other)"
                }
            },
            "required": ["message"]
        })
    }

    fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> BoxFuture<'_, Result<ToolOutcome>> {
        Box::pin(async move {
            let params: SendFanLetterInput = serde_json::from_value(input)
                .map_err(|e| NovaError::ToolValidation(e.to_string()))?;

            if params.message.trim().is_empty() {
                return Ok(ToolOutcome::failure("Letter message cannot be empty"));
            }

            let category = params.category.unwrap_or_else(|| "other".to_string());
            info!(category = %category, "Storing fan letter");

            let letter_id = self
                .store
                .create(NewFanLetter {
                    session_id: ctx.session_id.0,
                    user_id: ctx.user_id,
                    category,
                    message: params.message,
                })
                .await?;

            Ok(ToolOutcome::success(serde_json::json!({
                "letter_id": letter_id,
                "message": "Your letter has been delivered!",
            })))
        })
    }
}
