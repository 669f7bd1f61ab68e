use futures::future::BoxFuture;

use nova_core::error::Result;
use nova_core::traits::Tool;
use nova_core::types::{ToolContext, ToolOutcome};

/// Canned weather snapshot for Nova's home city. Mock until a real weather
/// provider is wired in.
pub struct GetWeatherTool;

impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Current weather in Seoul, where Nova lives."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn execute(
        &self,
        _input: serde_json::Value,
        _ctx: ToolContext,
    ) -> BoxFuture<'_, Result<ToolOutcome>> {
        Box::pin(async move {
            Ok(ToolOutcome::mock_success(serde_json::json!({
                "location": "Seoul",
                "temperature": 5,
                "condition": "clear",
                "humidity": 45,
                "wind_speed": 3.2,
            })))
        })
    }
}
