//! Test doubles for the decoder seam and a minimal protocol client

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{DecoderError, LangError};
use crate::infra::protocol::{Message, Notification, Request, Response, methods};
use crate::infra::transport::{MessageReader, MessageWriter};
use crate::models::lang::{
    Candidate, CandidateKind, Candidates, Diagnostics, HclRange, MarkupContent, Pos, Symbol,
    TextEdit,
};
use crate::services::decoder::{Decoder, DecoderFinder};

// ============================================================================
// Decoder doubles
// ============================================================================

#[derive(Default)]
pub struct MockDecoder {
    pub candidates: Candidates,
    pub diagnostics: Diagnostics,
    pub symbols: Vec<Symbol>,
    pub calls: Mutex<Vec<(String, Pos)>>,
}

impl MockDecoder {
    pub fn with_candidates(candidates: Candidates) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn with_symbols(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            ..Default::default()
        }
    }
}

impl Decoder for MockDecoder {
    fn candidates_at(&self, filename: &str, pos: Pos) -> (Candidates, Diagnostics) {
        self.calls
            .lock()
            .unwrap()
            .push((filename.to_string(), pos));
        (self.candidates.clone(), self.diagnostics.clone())
    }

    fn symbols(&self) -> Result<Vec<Symbol>, Diagnostics> {
        if self.diagnostics.is_empty() {
            Ok(self.symbols.clone())
        } else {
            Err(self.diagnostics.clone())
        }
    }
}

/// Finder that becomes ready on a chosen poll
pub struct MockFinder {
    ready_on_poll: Option<u32>,
    polls: AtomicU32,
    decoder: Arc<MockDecoder>,
    delay: Duration,
}

impl MockFinder {
    pub fn ready() -> Self {
        Self::ready_on_poll(1)
    }

    pub fn ready_on_poll(poll: u32) -> Self {
        Self {
            ready_on_poll: Some(poll),
            polls: AtomicU32::new(0),
            decoder: Arc::new(MockDecoder::default()),
            delay: Duration::ZERO,
        }
    }

    pub fn never_ready() -> Self {
        Self {
            ready_on_poll: None,
            ..Self::ready()
        }
    }

    pub fn with_decoder(mut self, decoder: MockDecoder) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Delay every `decoder_for_dir` call, to keep a request in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn decoder(&self) -> &MockDecoder {
        &self.decoder
    }
}

#[async_trait]
impl DecoderFinder for MockFinder {
    async fn is_core_schema_loaded(&self, _dir: &Path) -> Result<bool, LangError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.ready_on_poll.is_some_and(|ready| poll >= ready))
    }

    async fn decoder_for_dir(&self, _dir: &Path) -> Result<Arc<dyn Decoder>, DecoderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.decoder.clone())
    }
}

pub fn attribute_candidate(label: &str) -> Candidate {
    Candidate {
        label: label.to_string(),
        kind: CandidateKind::Attribute,
        detail: "Optional, number".to_string(),
        description: MarkupContent::markdown(format!("The `{label}` attribute")),
        text_edit: TextEdit {
            range: HclRange::new("main.tf", Pos::new(2, 3, 12), Pos::new(2, 3, 12)),
            new_text: label.to_string(),
            snippet: format!("{label} = ${{1}}"),
        },
    }
}

// ============================================================================
// Protocol client
// ============================================================================

pub struct TestClient<R, W> {
    reader: MessageReader<R>,
    writer: MessageWriter<W>,
}

impl<R, W> TestClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: MessageReader::new(reader),
            writer: MessageWriter::new(writer),
        }
    }

    pub async fn send_request(&mut self, id: i64, method: &str, params: Value) {
        self.writer
            .write_message(&Request::new(id, method, Some(params)))
            .await
            .unwrap();
    }

    pub async fn notify(&mut self, method: &str, params: Value) {
        self.writer
            .write_message(&Notification::new(method, Some(params)))
            .await
            .unwrap();
    }

    pub async fn send_raw(&mut self, body: &str) {
        use tokio::io::AsyncWriteExt;
        let frame = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        self.writer_mut().write_all(frame.as_bytes()).await.unwrap();
    }

    fn writer_mut(&mut self) -> &mut W {
        self.writer.get_mut()
    }

    pub async fn read_response(&mut self) -> Response {
        let json = self.reader.read_frame().await.unwrap();
        match Message::parse(&json).unwrap() {
            Message::Response(response) => response,
            other => panic!("expected response, got {other:?}"),
        }
    }

    /// Next frame, or the read error once the server closed the stream
    pub async fn try_read_response(&mut self) -> std::io::Result<Response> {
        let json = self.reader.read_frame().await?;
        match Message::parse(&json) {
            Ok(Message::Response(response)) => Ok(response),
            other => panic!("expected response, got {other:?}"),
        }
    }

    pub async fn request(&mut self, id: i64, method: &str, params: Value) -> Response {
        self.send_request(id, method, params).await;
        self.read_response().await
    }

    pub async fn initialize(&mut self, snippet_support: bool) -> Response {
        let response = self
            .request(
                0,
                methods::INITIALIZE,
                json!({
                    "processId": null,
                    "rootUri": "file:///work",
                    "capabilities": {
                        "textDocument": {
                            "completion": {
                                "completionItem": { "snippetSupport": snippet_support }
                            }
                        }
                    }
                }),
            )
            .await;
        self.notify(methods::INITIALIZED, json!({})).await;
        response
    }

    pub async fn open(&mut self, uri: &str, text: &str) {
        self.notify(
            methods::DID_OPEN,
            json!({
                "textDocument": { "uri": uri, "languageId": "terraform", "version": 1, "text": text }
            }),
        )
        .await;
    }

    pub async fn completion(&mut self, id: i64, uri: &str, line: u32, character: u32) -> Response {
        self.request(
            id,
            methods::COMPLETION,
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": line, "character": character }
            }),
        )
        .await
    }

    pub async fn document_symbol(&mut self, id: i64, uri: &str) -> Response {
        self.request(
            id,
            methods::DOCUMENT_SYMBOL,
            json!({ "textDocument": { "uri": uri } }),
        )
        .await
    }
}
