use std::collections::VecDeque;
use std::sync::Mutex;

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use nova_core::config::ModelConfig;
use nova_core::error::{NovaError, Result};
use nova_core::traits::LlmClient;
use nova_core::types::*;

enum Script {
    Deltas(Vec<StreamDelta>),
    RequestError(String),
}

/// A deterministic LLM client for tests. Each `chat_stream` call consumes the
/// next scripted reply in push order; calls past the end of the script fail
/// loudly instead of hanging or returning empty streams.
#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a reply streamed as one text delta followed by end-of-turn.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_deltas(vec![
            StreamDelta::TextDelta(text.into()),
            StreamDelta::Stop(StopReason::EndTurn),
        ]);
    }

    /// Script a reply with full control over the delta sequence.
    pub fn push_deltas(&self, deltas: Vec<StreamDelta>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Deltas(deltas));
    }

    /// Script a request-level failure for the next call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::RequestError(message.into()));
    }

    /// Messages sent by each call, in call order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }
}

impl LlmClient for ScriptedClient {
    fn chat_stream(
        &self,
        _config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(messages);

            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(Script::Deltas(deltas)) => {
                    let stream = futures::stream::iter(deltas.into_iter().map(Ok));
                    Ok(Box::pin(stream) as BoxStream<'_, Result<StreamDelta>>)
                }
                Some(Script::RequestError(msg)) => Err(NovaError::LlmRequest(msg)),
                None => Err(NovaError::LlmRequest("scripted replies exhausted".into())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn config() -> ModelConfig {
        ModelConfig {
            provider: "upstage".into(),
            model_id: "solar-pro2".into(),
            api_key: None,
            base_url: None,
            max_tokens: 256,
            temperature: 0.0,
            retry: None,
        }
    }

    #[tokio::test]
    async fn test_replies_pop_in_push_order() {
        let client = ScriptedClient::new();
        client.push_text("first");
        client.push_text("second");

        for expected in ["first", "second"] {
            let mut stream = client
                .chat_stream(&config(), vec![ChatMessage::user("hi")])
                .await
                .unwrap();
            match stream.next().await.unwrap().unwrap() {
                StreamDelta::TextDelta(t) => assert_eq!(t, expected),
                other => panic!("unexpected delta: {:?}", other),
            }
        }
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn test_records_request_messages() {
        let client = ScriptedClient::new();
        client.push_text("ok");
        client
            .chat_stream(&config(), vec![ChatMessage::system("sys"), ChatMessage::user("question")])
            .await
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[0][1].content, "question");
    }

    #[tokio::test]
    async fn test_exhausted_script_fails_loudly() {
        let client = ScriptedClient::new();
        let err = client
            .chat_stream(&config(), vec![ChatMessage::user("hi")])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NovaError::LlmRequest(_)));
    }

    #[tokio::test]
    async fn test_scripted_request_error() {
        let client = ScriptedClient::new();
        client.push_error("HTTP 500: upstream down");
        let err = client
            .chat_stream(&config(), vec![ChatMessage::user("hi")])
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("500"));
    }
}
