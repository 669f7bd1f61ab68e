use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use nova_core::error::{NovaError, Result};
use nova_core::traits::{ScheduleStore, Tool};
use nova_core::types::{ScheduleFilter, ToolContext, ToolOutcome};

/// Look up the idol's official schedule from storage.
pub struct GetScheduleTool {
    store: Arc<dyn ScheduleStore>,
}

impl GetScheduleTool {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct GetScheduleInput {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    event_type: Option<String>,
}

impl Tool for GetScheduleTool {
    fn name(&self) -> &str {
        "get_schedule"
    }

    fn description(&self) -> &str {
        "Look up Nova's official schedule: concerts, fan meetings, broadcasts, and releases."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "start_date": {
                    "type": "string",
                    "description": "Earliest date to include (YYYY-MM-DD)"
                },
                "end_date": {
                    "type": "string",
                    "description": "Latest date to include (YYYY-MM-DD)"
                },
                "event_type": {
                    "type": "string",
                    "description": "Filter by event type such as concert or fanmeeting, or \"all\" (default)"
                }
            }
        })
    }

    fn execute(
        &self,
        input: serde_json::Value,
        _ctx: ToolContext,
    ) -> BoxFuture<'_, Result<ToolOutcome>> {
        Box::pin(async move {
            let params: GetScheduleInput = serde_json::from_value(input)
                .map_err(|e| NovaError::ToolValidation(e.to_string()))?;

            let event_type = params.event_type.unwrap_or_else(|| "all".to_string());
            info!(
                start = params.start_date.as_deref().unwrap_or("-"),
                end = params.end_date.as_deref().unwrap_or("-"),
                event_type = %event_type,
                "Schedule lookup"
            );

            let schedules = self
                .store
                .list(ScheduleFilter {
                    start_date: params.start_date,
                    end_date: params.end_date,
                    event_type: Some(event_type),
                })
                .await?;

            if schedules.is_empty() {
                return Ok(ToolOutcome::success(serde_json::json!({
                    "schedules": [],
                    "message": "No schedules found for that period.",
                })));
            }

            Ok(ToolOutcome::success(serde_json::json!({
                "schedules": schedules,
                "count": schedules.len(),
            })))
        })
    }
}
