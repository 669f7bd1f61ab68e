use nova_core::config::PersonaConfig;
use nova_core::types::ToolDefinition;

use crate::state::ConversationState;

/// Assemble a system prompt from sections.
pub struct PromptBuilder {
    parts: Vec<String>,
}

impl PromptBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            parts: vec![base.into()],
        }
    }

    /// Add a titled section, skipped when the body is empty.
    pub fn with_section(mut self, title: &str, body: &str) -> Self {
        if !body.is_empty() {
            self.parts.push(format!("# {}\n\n{}", title, body.trim()));
        }
        self
    }

    pub fn build(self) -> String {
        self.parts.join("\n\n---\n\n")
    }
}

/// Instructions for the router's intent classification call.
///
/// The router must answer with bare JSON; everything else in the reply is
/// tolerated and stripped by the verdict parser.
pub fn router_instructions(tools: &[ToolDefinition], today: &str) -> String {
    let catalog = tools
        .iter()
        .map(|t| format!("- {}: {}\n  args schema: {}", t.name, t.description, t.input_schema))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are the intent router for Nova, a virtual idol chatting with fans.
Classify the user's latest message into exactly one intent.

Intents:
- "chat": small talk or anything answerable from conversation alone
- "rag": questions about Nova's profile, debut, discography, or lore
- "tool": requests one of the tools below can serve

Available tools:
{}

Today's date is {}.

Respond with ONLY valid JSON, no prose:
{{"intent": "chat" | "rag" | "tool", "tool_name": "<tool name or null>", "tool_args": {{...}}}}

Rules:
- Set tool_name and tool_args only when intent is "tool".
- Resolve relative dates ("today", "this week") against today's date.
- When unsure, prefer "chat"."#,
        catalog, today
    )
}

const PERSONA_BASE: &str = "You are {name}, a virtual idol chatting with your fans. \
Stay in character, answer in the language the fan used, and keep replies warm, \
playful, and reasonably short.";

/// System prompt for the responder: persona plus whatever context this run
/// gathered (retrieved documents, tool outcome).
pub fn responder_system_prompt(persona: &PersonaConfig, state: &ConversationState) -> String {
    let mut base = PERSONA_BASE.replace("{name}", &persona.name);
    if let Some(style) = &persona.style_prompt {
        base.push_str("\n\n");
        base.push_str(style);
    }

    let docs = state.retrieved_docs.join("\n\n");

    let tool_section = match &state.tool_result {
        Some(outcome) if outcome.success => {
            let data = outcome
                .data
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_else(|| "{}".to_string());
            let name = state.tool_name.as_deref().unwrap_or("tool");
            format!(
                "The {} tool returned:\n{}\n\nAnswer using this result.",
                name, data
            )
        }
        Some(outcome) => {
            let name = state.tool_name.as_deref().unwrap_or("tool");
            let reason = outcome.error.as_deref().unwrap_or("unknown error");
            format!(
                "The {} tool failed: {}\n\nBriefly acknowledge that you could not \
                 look that up right now, then answer as best you can without it.",
                name, reason
            )
        }
        None => String::new(),
    };

    PromptBuilder::new(base)
        .with_section("Reference notes", &docs)
        .with_section("Tool result", &tool_section)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::types::ToolOutcome;

    fn persona() -> PersonaConfig {
        PersonaConfig {
            name: "Nova".into(),
            style_prompt: None,
        }
    }

    #[test]
    fn test_router_instructions_list_tools_and_date() {
        let tools = vec![ToolDefinition {
            name: "get_weather".into(),
            description: "Current weather".into(),
            input_schema: serde_json::json!({"type": "object"}),
        }];
        let prompt = router_instructions(&tools, "2026-08-23");
        assert!(prompt.contains("- get_weather: Current weather"));
        assert!(prompt.contains("2026-08-23"));
        assert!(prompt.contains("\"intent\""));
    }

    #[test]
    fn test_responder_prompt_bare_chat() {
        let state = ConversationState::default();
        let prompt = responder_system_prompt(&persona(), &state);
        assert!(prompt.contains("You are Nova"));
        assert!(!prompt.contains("Reference notes"));
        assert!(!prompt.contains("Tool result"));
    }

    #[test]
    fn test_responder_prompt_includes_docs() {
        let state = ConversationState {
            retrieved_docs: vec!["Nova debuted in 2024.".into()],
            ..Default::default()
        };
        let prompt = responder_system_prompt(&persona(), &state);
        assert!(prompt.contains("# Reference notes"));
        assert!(prompt.contains("Nova debuted in 2024."));
    }

    #[test]
    fn test_responder_prompt_acknowledges_tool_failure() {
        let state = ConversationState {
            tool_name: Some("get_schedule".into()),
            tool_result: Some(ToolOutcome::failure("unknown tool: get_schedule")),
            ..Default::default()
        };
        let prompt = responder_system_prompt(&persona(), &state);
        assert!(prompt.contains("get_schedule tool failed"));
        assert!(prompt.contains("acknowledge"));
    }

    #[test]
    fn test_responder_prompt_carries_style_prompt() {
        let persona = PersonaConfig {
            name: "Nova".into(),
            style_prompt: Some("End every reply with a star emoji.".into()),
        };
        let prompt = responder_system_prompt(&persona, &ConversationState::default());
        assert!(prompt.contains("star emoji"));
    }
}
