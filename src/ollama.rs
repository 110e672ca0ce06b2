use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::session::ChatMessage;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest silence tolerated between two streamed records.
const READ_TIMEOUT: Duration = Duration::from_secs(120);
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("cannot reach {url}: {source}")]
    Offline {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("model error: {0}")]
    Server(String),
    #[error("connection lost: {0}")]
    Http(#[from] reqwest::Error),
}

impl OllamaError {
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline { .. })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatRecord {
    #[serde(default)]
    message: Option<RecordMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct RecordMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: Option<String>,
}

/// One decoded unit of a streamed chat response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Chunk(String),
    Done,
}

/// Incremental decoder for the newline-delimited JSON body of `/api/chat`.
///
/// Network chunks do not line up with records, so bytes are buffered until a
/// full line is available. Blank and undecodable lines are skipped.
#[derive(Debug, Default)]
pub struct ChatStreamDecoder {
    buf: Vec<u8>,
}

impl ChatStreamDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<StreamEvent>, OllamaError> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            decode_line(&line, &mut events)?;
        }
        Ok(events)
    }

    /// Decode whatever is left once the body has ended without a newline.
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>, OllamaError> {
        let line = std::mem::take(&mut self.buf);
        let mut events = Vec::new();
        decode_line(&line, &mut events)?;
        Ok(events)
    }
}

fn decode_line(line: &[u8], events: &mut Vec<StreamEvent>) -> Result<(), OllamaError> {
    let Ok(text) = std::str::from_utf8(line) else {
        log::warn!("Skipping non-UTF-8 stream line ({} bytes)", line.len());
        return Ok(());
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    let record: ChatRecord = match serde_json::from_str(text) {
        Ok(record) => record,
        Err(e) => {
            log::debug!("Skipping undecodable stream line: {e}");
            return Ok(());
        }
    };
    if let Some(err) = record.error {
        return Err(OllamaError::Server(err));
    }
    if let Some(message) = record.message {
        if !message.content.is_empty() {
            events.push(StreamEvent::Chunk(message.content));
        }
    }
    if record.done {
        events.push(StreamEvent::Done);
    }
    Ok(())
}

/// Thin client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Names of the installed models, in the order the server lists them.
    pub async fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let url = self.endpoint("/api/tags");
        let resp = self
            .http
            .get(&url)
            .timeout(TAGS_TIMEOUT)
            .send()
            .await
            .map_err(|source| OllamaError::Offline { url, source })?;
        let tags: TagsResponse = check_status(resp).await?.json().await?;

        Ok(tags
            .models
            .into_iter()
            .filter_map(|m| m.name)
            .filter(|name| !name.is_empty())
            .collect())
    }

    /// Stream a chat completion, calling `on_chunk` for every text fragment
    /// in arrival order. Returns the full reply, or the partial reply if
    /// `cancel` was set. A single request is made; failures are not retried.
    pub async fn stream_chat<F>(
        &self,
        model: &str,
        messages: &[ChatMessage],
        cancel: &AtomicBool,
        mut on_chunk: F,
    ) -> Result<String, OllamaError>
    where
        F: FnMut(&str),
    {
        let url = self.endpoint("/api/chat");
        log::info!("POST {url} model={model} messages={}", messages.len());

        let body = ChatRequest {
            model,
            messages,
            stream: true,
        };
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| OllamaError::Offline { url, source })?;
        let resp = check_status(resp).await?;

        let mut stream = resp.bytes_stream();
        let mut decoder = ChatStreamDecoder::default();
        let mut full = String::new();
        let mut chunks = 0usize;

        let mut apply = |events: Vec<StreamEvent>, full: &mut String| -> bool {
            for event in events {
                if cancel.load(Ordering::Relaxed) {
                    log::info!("Chat stream cancelled after {chunks} chunks");
                    return true;
                }
                match event {
                    StreamEvent::Chunk(text) => {
                        on_chunk(&text);
                        full.push_str(&text);
                        chunks += 1;
                    }
                    StreamEvent::Done => return true,
                }
            }
            false
        };

        let mut stopped = false;
        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;
            if apply(decoder.push(&bytes)?, &mut full) {
                stopped = true;
                break;
            }
        }
        if !stopped {
            apply(decoder.finish()?, &mut full);
        }

        log::info!("Chat stream finished ({} chars)", full.len());
        Ok(full)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, OllamaError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(OllamaError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    fn record(content: &str, done: bool) -> String {
        format!(
            "{}\n",
            serde_json::json!({
                "model": "llama3",
                "message": {"role": "assistant", "content": content},
                "done": done,
            })
        )
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    #[test]
    fn decoder_handles_records_split_across_chunks() {
        let body = format!("{}{}", record("Hel", false), record("lo", false));
        let (a, b) = body.as_bytes().split_at(17);
        let mut decoder = ChatStreamDecoder::default();

        let mut events = decoder.push(a).unwrap();
        events.extend(decoder.push(b).unwrap());
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk("Hel".into()),
                StreamEvent::Chunk("lo".into())
            ]
        );
    }

    #[test]
    fn decoder_skips_blank_and_garbage_lines() {
        let mut decoder = ChatStreamDecoder::default();
        let body = format!("\r\nnot json\n{}", record("ok", true).replace('\n', "\r\n"));
        let events = decoder.push(body.as_bytes()).unwrap();
        assert_eq!(events, vec![StreamEvent::Chunk("ok".into()), StreamEvent::Done]);
    }

    #[test]
    fn decoder_flushes_unterminated_tail() {
        let mut decoder = ChatStreamDecoder::default();
        let body = record("tail", true);
        assert!(decoder.push(body.trim_end().as_bytes()).unwrap().is_empty());
        assert_eq!(
            decoder.finish().unwrap(),
            vec![StreamEvent::Chunk("tail".into()), StreamEvent::Done]
        );
    }

    #[test]
    fn decoder_surfaces_server_errors() {
        let mut decoder = ChatStreamDecoder::default();
        let err = decoder
            .push(b"{\"error\":\"model 'x' not found\"}\n")
            .unwrap_err();
        assert!(matches!(err, OllamaError::Server(ref m) if m.contains("not found")));
    }

    #[tokio::test]
    async fn stream_chat_concatenates_chunks_in_order() {
        let mut server = mockito::Server::new_async().await;
        let parts = ["The ", "quick ", "brown ", "fox"];
        let mut body: String = parts.iter().map(|p| record(p, false)).collect();
        body.push_str(&record("", true));

        let mock = server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama3",
                "stream": true,
                "messages": [{"role": "user", "content": "hi"}],
            })))
            .with_status(200)
            .with_header("content-type", "application/x-ndjson")
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url());
        let cancel = AtomicBool::new(false);
        let mut seen = Vec::new();
        let full = client
            .stream_chat(
                "llama3",
                &[ChatMessage::new(Role::User, "hi")],
                &cancel,
                |chunk| seen.push(chunk.to_string()),
            )
            .await
            .unwrap();

        assert_eq!(seen, parts);
        assert_eq!(full, "The quick brown fox");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stream_chat_stops_at_done() {
        let mut server = mockito::Server::new_async().await;
        let body = format!("{}{}", record("kept", true), record("ignored", false));
        let _mock = server
            .mock("POST", "/api/chat")
            .with_body(body)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url());
        let cancel = AtomicBool::new(false);
        let full = client
            .stream_chat("llama3", &[], &cancel, |_| {})
            .await
            .unwrap();
        assert_eq!(full, "kept");
    }

    #[tokio::test]
    async fn cancelled_stream_emits_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_body(record("never", false))
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url());
        let cancel = AtomicBool::new(true);
        let mut calls = 0;
        let full = client
            .stream_chat("llama3", &[], &cancel, |_| calls += 1)
            .await
            .unwrap();
        assert_eq!(calls, 0);
        assert!(full.is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_offline_once() {
        let client = OllamaClient::new(&closed_port_url());
        let cancel = AtomicBool::new(false);
        let mut calls = 0;

        let err = client
            .stream_chat("llama3", &[], &cancel, |_| calls += 1)
            .await
            .unwrap_err();
        assert!(err.is_offline());
        assert_eq!(calls, 0);

        assert!(client.list_models().await.unwrap_err().is_offline());
    }

    #[tokio::test]
    async fn missing_model_is_reported_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(404)
            .with_body(r#"{"error":"model \"nope\" not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url());
        let cancel = AtomicBool::new(false);
        let err = client
            .stream_chat("nope", &[], &cancel, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, OllamaError::Status { status, .. } if status.as_u16() == 404));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_models_returns_names_in_order() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"models":[{"name":"llama3:8b","size":1},{"size":2},{"name":"mistral:latest"}]}"#,
            )
            .create_async()
            .await;

        let client = OllamaClient::new(&format!("{}/", server.url()));
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["llama3:8b", "mistral:latest"]);
    }
}
