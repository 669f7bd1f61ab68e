use std::sync::Arc;

use futures::StreamExt;

use nova_core::config::{ModelConfig, PersonaConfig};
use nova_core::types::{ChatEvent, SessionId, StopReason, StreamDelta};
use nova_graph::{conversation_graph, SessionHistory, StreamMerger, TurnRequest};
use nova_llm::ScriptedClient;
use nova_storage::{Database, SqliteDocIndex, SqliteFanLetterStore, SqliteScheduleStore};
use nova_tools::ToolRegistry;

fn model() -> ModelConfig {
    ModelConfig {
        provider: "upstage".into(),
        model_id: "solar-pro2".into(),
        api_key: None,
        base_url: None,
        max_tokens: 1024,
        temperature: 0.7,
        retry: None,
    }
}

/// Full wiring over an in-memory database. The returned handle shares the
/// connection with the graph's stores, so tests can seed and inspect storage.
fn merger(llm: Arc<ScriptedClient>) -> (StreamMerger, Database) {
    let db = Database::in_memory().expect("open in-memory db");
    let registry = Arc::new(ToolRegistry::with_builtins(
        Arc::new(SqliteScheduleStore::new(db.clone())),
        Arc::new(SqliteFanLetterStore::new(db.clone())),
    ));
    let executor = conversation_graph(
        llm,
        model(),
        registry,
        Arc::new(SqliteDocIndex::new(db.clone())),
        PersonaConfig::default(),
        3,
    );
    let merger = StreamMerger::new(Arc::new(executor), Arc::new(SessionHistory::new()), 40);
    (merger, db)
}

fn request(session: &str, message: &str) -> TurnRequest {
    TurnRequest {
        session_id: SessionId::from_str(session),
        user_id: None,
        message: message.into(),
    }
}

async fn collect(merger: &StreamMerger, session: &str, message: &str) -> Vec<ChatEvent> {
    let mut stream = merger.stream_turn(request(session, message));
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}

fn statuses(events: &[ChatEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Status { label } => Some(label.as_str()),
            _ => None,
        })
        .collect()
}

fn final_event(events: &[ChatEvent]) -> (&str, Option<&str>) {
    events
        .iter()
        .find_map(|e| match e {
            ChatEvent::Final { text, tool_used } => Some((text.as_str(), tool_used.as_deref())),
            _ => None,
        })
        .expect("stream carried no final event")
}

#[tokio::test]
async fn test_schedule_turn_reports_empty_calendar() {
    let llm = Arc::new(ScriptedClient::new());
    llm.push_text(r#"{"intent":"tool","tool_name":"get_schedule","tool_args":{"event_type":"all"}}"#);
    llm.push_text("이번 주는 일정이 없어요!");
    let (merger, _db) = merger(llm.clone());

    let events = collect(&merger, "s-schedule", "이번 주 스케줄 알려줘").await;

    assert_eq!(statuses(&events), vec!["routing", "executing tool", "composing"]);
    let (text, tool_used) = final_event(&events);
    assert_eq!(text, "이번 주는 일정이 없어요!");
    assert_eq!(tool_used, Some("get_schedule"));
    assert_eq!(events.last(), Some(&ChatEvent::Done));

    // The responder was told the calendar came back empty
    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1][0]
        .content
        .contains("No schedules found for that period."));
}

#[tokio::test]
async fn test_rag_turn_grounds_reply_in_indexed_docs() {
    let llm = Arc::new(ScriptedClient::new());
    llm.push_text(r#"{"intent":"rag"}"#);
    llm.push_text("2024년에 데뷔했어요!");
    let (merger, db) = merger(llm.clone());
    SqliteDocIndex::new(db)
        .insert_document("Debut", "Nova debuted in 2024 with the single Starlight.")
        .expect("seed document");

    let events = collect(&merger, "s-rag", "When did Nova debut?").await;

    assert_eq!(statuses(&events), vec!["routing", "retrieving", "composing"]);
    let (text, tool_used) = final_event(&events);
    assert_eq!(text, "2024년에 데뷔했어요!");
    assert_eq!(tool_used, None);

    let requests = llm.requests();
    assert!(requests[1][0].content.contains("Nova debuted in 2024"));
}

#[tokio::test]
async fn test_unknown_tool_turn_still_answers() {
    let llm = Arc::new(ScriptedClient::new());
    llm.push_text(r#"{"intent":"tool","tool_name":"time_travel","tool_args":{}}"#);
    llm.push_text("미안해요, 그건 못 해요...");
    let (merger, _db) = merger(llm.clone());

    let events = collect(&merger, "s-unknown", "take me to 1999").await;

    // The failed dispatch degrades into an apologetic answer, not an error
    assert_eq!(statuses(&events), vec!["routing", "executing tool", "composing"]);
    assert!(events.iter().all(|e| !matches!(e, ChatEvent::Error { .. })));
    let (text, tool_used) = final_event(&events);
    assert_eq!(text, "미안해요, 그건 못 해요...");
    assert_eq!(tool_used, Some("time_travel"));

    let requests = llm.requests();
    assert!(requests[1][0].content.contains("time_travel tool failed"));
    assert!(requests[1][0].content.contains("unknown tool"));
}

#[tokio::test]
async fn test_streaming_and_plain_turns_agree() {
    let deltas = vec![
        StreamDelta::TextDelta("겨울 ".into()),
        StreamDelta::TextDelta("이야기".into()),
        StreamDelta::Stop(StopReason::EndTurn),
    ];
    let llm = Arc::new(ScriptedClient::new());
    llm.push_text(r#"{"intent":"chat"}"#);
    llm.push_deltas(deltas.clone());
    llm.push_text(r#"{"intent":"chat"}"#);
    llm.push_deltas(deltas);
    let (merger, _db) = merger(llm);

    let events = collect(&merger, "s-stream", "tell me a story").await;
    let (streamed, streamed_tool) = final_event(&events);

    let (plain, plain_tool) = merger
        .run_turn(request("s-plain", "tell me a story"))
        .await
        .expect("plain turn");

    assert_eq!(streamed, "겨울 이야기");
    assert_eq!(streamed, plain);
    assert_eq!(streamed_tool, plain_tool.as_deref());
}

#[tokio::test]
async fn test_song_pick_comes_from_the_sad_pool() {
    let llm = Arc::new(ScriptedClient::new());
    llm.push_text(r#"{"intent":"tool","tool_name":"recommend_song","tool_args":{"mood":"sad"}}"#);
    llm.push_text("이 노래 들어봐요");
    let (merger, _db) = merger(llm.clone());

    let events = collect(&merger, "s-song", "우울한 날엔 무슨 노래가 좋아?").await;

    let (_, tool_used) = final_event(&events);
    assert_eq!(tool_used, Some("recommend_song"));

    let requests = llm.requests();
    let prompt = &requests[1][0].content;
    assert!(
        prompt.contains("Rainy Day") || prompt.contains("Missing You"),
        "pick was not from the sad pool: {}",
        prompt
    );
}

#[tokio::test]
async fn test_fan_letter_reaches_storage() {
    let llm = Arc::new(ScriptedClient::new());
    llm.push_text(
        r#"{"intent":"tool","tool_name":"send_fan_letter","tool_args":{"message":"항상 고마워요!","category":"support"}}"#,
    );
    llm.push_text("편지 잘 받았어요, 고마워요!");
    let (merger, db) = merger(llm.clone());

    let events = collect(&merger, "s-letter", "노바에게 편지 보내줘").await;

    let (_, tool_used) = final_event(&events);
    assert_eq!(tool_used, Some("send_fan_letter"));

    let letters = SqliteFanLetterStore::new(db);
    assert_eq!(letters.count().expect("count letters"), 1);

    let requests = llm.requests();
    assert!(requests[1][0].content.contains("Your letter has been delivered!"));
}
