use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use nova_core::error::{NovaError, Result};
use nova_core::types::{ChatEvent, ChatMessage, SessionId};

use crate::executor::GraphExecutor;
use crate::session::SessionHistory;
use crate::state::{ConversationState, NodeKind};
use crate::tap::{RunTap, TokenEvent};

const CHANNEL_CAPACITY: usize = 64;

/// One incoming user turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: SessionId,
    pub user_id: Option<String>,
    pub message: String,
}

/// Runs graph turns and folds the two tap channels into the single event
/// sequence clients consume.
///
/// Lifecycle entries become deduplicated status updates; only responder
/// tokens pass through. Every stream ends with exactly one `Done`, and a
/// session records its (user, assistant) pair only when the turn produced
/// a reply.
pub struct StreamMerger {
    executor: Arc<GraphExecutor>,
    history: Arc<SessionHistory>,
    history_limit: usize,
}

impl StreamMerger {
    pub fn new(
        executor: Arc<GraphExecutor>,
        history: Arc<SessionHistory>,
        history_limit: usize,
    ) -> Self {
        Self {
            executor,
            history,
            history_limit,
        }
    }

    /// Run a turn without streaming. The state is seeded the same way as a
    /// streamed turn, but nothing is recorded in the session history; only
    /// streamed turns advance a session.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<(String, Option<String>)> {
        info!(session = %request.session_id, "Running chat turn");
        let mut messages = self.history.tail(&request.session_id, self.history_limit);
        messages.push(ChatMessage::user(request.message));
        let state = ConversationState::new(request.session_id, request.user_id, messages);

        let state = self.executor.run(state, &RunTap::silent()).await?;

        let reply = state
            .final_reply()
            .ok_or_else(|| NovaError::Internal("turn produced no reply".into()))?
            .to_string();
        Ok((reply, state.tool_name))
    }

    /// Run a turn and stream its events. The state is seeded with the
    /// session's recent history plus the new message.
    pub fn stream_turn(&self, request: TurnRequest) -> ReceiverStream<ChatEvent> {
        let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (tap, lifecycle_rx, token_rx) = RunTap::channels(CHANNEL_CAPACITY);

        let TurnRequest {
            session_id,
            user_id,
            message,
        } = request;
        info!(session = %session_id, "Streaming chat turn");

        let user_msg = ChatMessage::user(message);
        let mut messages = self.history.tail(&session_id, self.history_limit);
        messages.push(user_msg.clone());
        let state = ConversationState::new(session_id.clone(), user_id, messages);

        let executor = self.executor.clone();
        let run = tokio::spawn(async move {
            let tap = tap;
            executor.run(state, &tap).await
        });

        let history = self.history.clone();
        tokio::spawn(async move {
            merge_loop(
                out_tx,
                lifecycle_rx,
                token_rx,
                run,
                history,
                session_id,
                user_msg,
            )
            .await;
        });

        ReceiverStream::new(out_rx)
    }
}

/// Fold lifecycle and token channels into client events, then close out the
/// turn. The run task owns the tap, so both channels close when it finishes;
/// the loop drains them fully before looking at the run result.
async fn merge_loop(
    out_tx: mpsc::Sender<ChatEvent>,
    mut lifecycle_rx: mpsc::Receiver<NodeKind>,
    mut token_rx: mpsc::Receiver<TokenEvent>,
    run: JoinHandle<Result<ConversationState>>,
    history: Arc<SessionHistory>,
    session_id: SessionId,
    user_msg: ChatMessage,
) {
    let mut current: Option<NodeKind> = None;
    let mut reply = String::new();
    let mut lifecycle_open = true;
    let mut tokens_open = true;

    loop {
        tokio::select! {
            biased;
            entered = lifecycle_rx.recv(), if lifecycle_open => match entered {
                Some(node) => {
                    if current == Some(node) {
                        continue;
                    }
                    current = Some(node);
                    let status = ChatEvent::Status {
                        label: node.label().to_string(),
                    };
                    if out_tx.send(status).await.is_err() {
                        debug!("Client went away mid-stream, aborting turn");
                        run.abort();
                        return;
                    }
                }
                None => lifecycle_open = false,
            },
            token = token_rx.recv(), if tokens_open => match token {
                Some(event) => {
                    // Only the responder speaks to the user
                    if event.node != NodeKind::Responder {
                        continue;
                    }
                    reply.push_str(&event.text);
                    let token = ChatEvent::Token { text: event.text };
                    if out_tx.send(token).await.is_err() {
                        debug!("Client went away mid-stream, aborting turn");
                        run.abort();
                        return;
                    }
                }
                None => tokens_open = false,
            },
            else => break,
        }
    }

    match run.await {
        Ok(Ok(state)) => {
            if !reply.is_empty() {
                history.append_turn(
                    &session_id,
                    user_msg,
                    ChatMessage::assistant(reply.clone()),
                );
            }
            let _ = out_tx
                .send(ChatEvent::Final {
                    text: reply,
                    tool_used: state.tool_name,
                })
                .await;
        }
        Ok(Err(e)) => {
            error!(error = %e, "Graph turn failed");
            let _ = out_tx
                .send(ChatEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }
        Err(e) => {
            error!(error = %e, "Graph task panicked");
            let _ = out_tx
                .send(ChatEvent::Error {
                    message: "internal error".into(),
                })
                .await;
        }
    }

    let _ = out_tx.send(ChatEvent::Done).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    use nova_core::config::{ModelConfig, PersonaConfig};
    use nova_llm::ScriptedClient;
    use nova_storage::{Database, SqliteDocIndex, SqliteFanLetterStore, SqliteScheduleStore};
    use nova_tools::ToolRegistry;

    use crate::nodes::conversation_graph;

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

    fn merger(llm: Arc<ScriptedClient>) -> StreamMerger {
        let db = Database::in_memory().unwrap();
        let registry = Arc::new(ToolRegistry::with_builtins(
            Arc::new(SqliteScheduleStore::new(db.clone())),
            Arc::new(SqliteFanLetterStore::new(db.clone())),
        ));
        let executor = conversation_graph(
            llm,
            model(),
            registry,
            Arc::new(SqliteDocIndex::new(db)),
            PersonaConfig::default(),
            3,
        );
        StreamMerger::new(Arc::new(executor), Arc::new(SessionHistory::new()), 40)
    }

    fn request(message: &str) -> TurnRequest {
        TurnRequest {
            session_id: SessionId::from_str("s1"),
            user_id: None,
            message: message.into(),
        }
    }

    async fn collect(merger: &StreamMerger, message: &str) -> Vec<ChatEvent> {
        let mut stream = merger.stream_turn(request(message));
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

    #[tokio::test]
    async fn test_chat_turn_event_sequence() {
        let llm = Arc::new(ScriptedClient::new());
        llm.push_text(r#"{"intent":"chat"}"#);
        llm.push_deltas(vec![
            nova_core::types::StreamDelta::TextDelta("안".into()),
            nova_core::types::StreamDelta::TextDelta("녕!".into()),
            nova_core::types::StreamDelta::Stop(nova_core::types::StopReason::EndTurn),
        ]);
        let merger = merger(llm);

        let events = collect(&merger, "인사해줘").await;

        assert_eq!(statuses(&events), vec!["routing", "composing"]);

        let tokens: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::Token { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tokens, vec!["안", "녕!"]);

        assert!(matches!(
            events[events.len() - 2],
            ChatEvent::Final { ref text, ref tool_used }
                if text == "안녕!" && tool_used.is_none()
        ));
        assert_eq!(events.last(), Some(&ChatEvent::Done));
    }

    #[tokio::test]
    async fn test_router_tokens_never_reach_the_client() {
        let llm = Arc::new(ScriptedClient::new());
        llm.push_text(r#"{"intent":"chat"}"#);
        llm.push_text("hello!");
        let merger = merger(llm);

        let events = collect(&merger, "hi").await;

        for event in &events {
            if let ChatEvent::Token { text } = event {
                assert!(!text.contains("intent"), "router token leaked: {}", text);
            }
        }
    }

    #[tokio::test]
    async fn test_tool_turn_reports_tool_used() {
        let llm = Arc::new(ScriptedClient::new());
        llm.push_text(r#"{"intent":"tool","tool_name":"get_weather","tool_args":{}}"#);
        llm.push_text("서울은 지금 맑아요!");
        let merger = merger(llm);

        let events = collect(&merger, "날씨 어때?").await;

        assert_eq!(
            statuses(&events),
            vec!["routing", "executing tool", "composing"]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            ChatEvent::Final { tool_used: Some(name), .. } if name == "get_weather"
        )));
    }

    #[tokio::test]
    async fn test_failed_turn_emits_error_then_done() {
        let llm = Arc::new(ScriptedClient::new());
        llm.push_error("HTTP 503: model overloaded");
        let merger = merger(llm);

        let events = collect(&merger, "hi").await;

        assert!(events
            .iter()
            .any(|e| matches!(e, ChatEvent::Error { message } if message.contains("503"))));
        assert_eq!(events.last(), Some(&ChatEvent::Done));
        let done_count = events.iter().filter(|e| **e == ChatEvent::Done).count();
        assert_eq!(done_count, 1);
        // No pair recorded for a failed turn
        assert_eq!(merger.history.len(&SessionId::from_str("s1")), 0);
    }

    #[tokio::test]
    async fn test_history_grows_one_pair_per_turn() {
        let llm = Arc::new(ScriptedClient::new());
        llm.push_text(r#"{"intent":"chat"}"#);
        llm.push_text("first reply");
        llm.push_text(r#"{"intent":"chat"}"#);
        llm.push_text("second reply");
        let merger = merger(llm.clone());

        collect(&merger, "first question").await;
        collect(&merger, "second question").await;

        assert_eq!(merger.history.len(&SessionId::from_str("s1")), 4);

        // The second turn's responder call saw the first turn's pair
        let requests = llm.requests();
        let second_responder = &requests[3];
        let contents: Vec<&str> = second_responder
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert!(contents.contains(&"first question"));
        assert!(contents.contains(&"first reply"));
        assert!(contents.contains(&"second question"));
    }

    #[tokio::test]
    async fn test_run_turn_reads_history_but_never_writes_it() {
        let llm = Arc::new(ScriptedClient::new());
        llm.push_text(r#"{"intent":"chat"}"#);
        llm.push_text("reply one");
        llm.push_text(r#"{"intent":"chat"}"#);
        llm.push_text("reply two");
        let merger = merger(llm.clone());

        collect(&merger, "streamed question").await;
        let (reply, tool_used) = merger.run_turn(request("plain question")).await.unwrap();

        assert_eq!(reply, "reply two");
        assert!(tool_used.is_none());
        // Seeded with the streamed turn's pair plus the new message
        let requests = llm.requests();
        let responder_call = &requests[3];
        assert_eq!(responder_call.len(), 4);
        assert_eq!(responder_call[1].content, "streamed question");
        assert_eq!(responder_call[3].content, "plain question");
        // But the plain turn leaves the session untouched
        assert_eq!(merger.history.len(&SessionId::from_str("s1")), 2);
    }
}
