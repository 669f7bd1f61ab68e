use futures::future::BoxFuture;
use rand::Rng;
use serde::Deserialize;
use tracing::info;

use nova_core::error::{NovaError, Result};
use nova_core::traits::Tool;
use nova_core::types::{ToolContext, ToolOutcome};

// Mock discography until the music catalog service exists. Outcomes carry
// mock=true so downstream consumers can tell.
const SONGS_BY_MOOD: &[(&str, &[(&str, &str)])] = &[
    (
        "happy",
        &[
            ("Shine Bright", "First Light"),
            ("Happy Day", "Luminous"),
            ("Dancing Star", "First Light"),
        ],
    ),
    (
        "sad",
        &[("Rainy Day", "Moonlight"), ("Missing You", "Luminous")],
    ),
    (
        "energetic",
        &[
            ("Power Up", "Energy"),
            ("Let's Go!", "First Light"),
            ("On Fire", "Energy"),
        ],
    ),
    (
        "calm",
        &[("Starlight", "Moonlight"), ("Peaceful Night", "Moonlight")],
    ),
    (
        "romantic",
        &[("First Love", "Luminous"), ("Heart Beat", "Luminous")],
    ),
];

/// Pool for a mood; unknown moods fall back to the happy list.
fn songs_for(mood: &str) -> &'static [(&'static str, &'static str)] {
    SONGS_BY_MOOD
        .iter()
        .find(|(m, _)| *m == mood)
        .map(|(_, songs)| *songs)
        .unwrap_or(SONGS_BY_MOOD[0].1)
}

/// Recommend one of Nova's songs for the listener's mood.
pub struct RecommendSongTool;

#[derive(Deserialize)]
struct RecommendSongInput {
    #[serde(default)]
    mood: Option<String>,
}

impl Tool for RecommendSongTool {
    fn name(&self) -> &str {
        "recommend_song"
    }

    fn description(&self) -> &str {
        "Recommend one of Nova's songs matching a mood."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "mood": {
                    "type": "string",
                    "description": "One of happy, sad, energetic, calm, romantic (default: happy)"
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
            let params: RecommendSongInput = serde_json::from_value(input)
                .map_err(|e| NovaError::ToolValidation(e.to_string()))?;

            let mood = params.mood.unwrap_or_else(|| "happy".to_string());
            let pool = songs_for(&mood);
            let (title, album) = pool[rand::thread_rng().gen_range(0..pool.len())];

            info!(mood = %mood, title = %title, "Song pick");

            Ok(ToolOutcome::mock_success(serde_json::json!({
                "song": {
                    "title": title,
                    "album": album,
                },
                "mood": mood,
            })))
        })
    }
}
