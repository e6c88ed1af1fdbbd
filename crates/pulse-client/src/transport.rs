//! Transports that deliver raw text frames from a relay hub.
//!
//! A [`Connector`] opens one [`Transport`] per connection attempt. The
//! connection manager only ever sees text frames, a transport error, or a
//! clean close, so WebSocket and SSE look identical above this layer.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use pulse_types::TransportMode;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event stream returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("transport closed: {0}")]
    Closed(String),
}

/// An open connection yielding text frames.
#[async_trait]
pub trait Transport: Send {
    /// Next frame. `None` means the remote side closed cleanly.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports. One call per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        url: &str,
        mode: TransportMode,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

/// Real network connector: WebSocket via tokio-tungstenite, SSE via reqwest.
#[derive(Debug, Clone, Default)]
pub struct NetworkConnector {
    http: reqwest::Client,
}

impl NetworkConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for NetworkConnector {
    async fn connect(
        &self,
        url: &str,
        mode: TransportMode,
    ) -> Result<Box<dyn Transport>, TransportError> {
        match mode {
            TransportMode::WebSocket => {
                let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
                Ok(Box::new(WebSocketTransport { stream }))
            }
            TransportMode::Sse => {
                let response = self
                    .http
                    .get(url)
                    .header(reqwest::header::ACCEPT, "text/event-stream")
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(TransportError::Status(response.status()));
                }
                let body = response
                    .bytes_stream()
                    .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                    .boxed();
                Ok(Box::new(SseTransport {
                    body,
                    decoder: SseDecoder::default(),
                    ready: VecDeque::new(),
                }))
            }
        }
    }
}

struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                // Invalid UTF-8 is replaced rather than dropped so the frame
                // still reaches validation and surfaces as an error event.
                Ok(Message::Binary(bytes)) => {
                    let text = String::from_utf8_lossy(&bytes);
                    if matches!(text, std::borrow::Cow::Owned(_)) {
                        tracing::warn!(len = bytes.len(), "binary frame is not valid utf-8");
                    }
                    return Some(Ok(text.into_owned()));
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "websocket closed by server");
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

struct SseTransport {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    decoder: SseDecoder,
    ready: VecDeque<String>,
}

#[async_trait]
impl Transport for SseTransport {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            if let Some(data) = self.ready.pop_front() {
                return Some(Ok(data));
            }
            match self.body.next().await? {
                Ok(chunk) => self.ready.extend(self.decoder.feed(&chunk)),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.ready.clear();
        Ok(())
    }
}

/// Largest undelimited event the SSE decoder buffers before flushing it.
pub const MAX_SSE_EVENT_BYTES: usize = 256 * 1024;

/// Incremental `text/event-stream` decoder.
///
/// Yields the `data` of each complete event. Multi-line data is joined
/// with `\n`; comments and other fields are ignored. Carriage returns are
/// stripped so CRLF streams decode the same as LF streams.
///
/// Bytes already searched for a delimiter are not searched again. When
/// more than `max_event_bytes` accumulate without a blank line, the raw
/// text is flushed as a single frame so it fails validation downstream.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    scanned: usize,
    max_event_bytes: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_event_bytes(MAX_SSE_EVENT_BYTES)
    }
}

impl SseDecoder {
    pub fn with_max_event_bytes(max_event_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_event_bytes: max_event_bytes.max(1),
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        let mut consumed = 0;
        // Back up one byte in case the delimiter straddles two chunks.
        let mut search_from = self.scanned.saturating_sub(1);
        while let Some(offset) = self.buffer[search_from..]
            .windows(2)
            .position(|w| w == b"\n\n")
        {
            let end = search_from + offset + 2;
            if let Some(data) = event_data(&String::from_utf8_lossy(&self.buffer[consumed..end])) {
                events.push(data);
            }
            consumed = end;
            search_from = end;
        }
        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_event_bytes {
            tracing::warn!(
                len = self.buffer.len(),
                max = self.max_event_bytes,
                "event stream frame exceeded buffer limit, flushing"
            );
            let overflow = std::mem::take(&mut self.buffer);
            self.scanned = 0;
            events.push(String::from_utf8_lossy(&overflow).into_owned());
        }
        events
    }
}

fn event_data(block: &str) -> Option<String> {
    let lines: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_events_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"a\":").is_empty());
        let events = decoder.feed(b"1}\n\ndata: second\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string(), "second".to_string()]);
    }

    #[test]
    fn ignores_comments_and_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b": keep-alive\n\nevent: activity\ndata: one\r\ndata: two\r\n\r\n");
        assert_eq!(events, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn multibyte_text_split_mid_character() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: café\n\n".as_bytes();
        let split = bytes.len() - 3;
        assert!(decoder.feed(&bytes[..split]).is_empty());
        assert_eq!(decoder.feed(&bytes[split..]), vec!["café".to_string()]);
    }

    #[test]
    fn delimiter_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: one\n").is_empty());
        assert_eq!(decoder.feed(b"\ndata: two\n"), vec!["one".to_string()]);
        assert_eq!(decoder.feed(b"\n"), vec!["two".to_string()]);
    }

    #[test]
    fn oversized_event_is_flushed_as_raw_text() {
        let mut decoder = SseDecoder::with_max_event_bytes(16);
        assert!(decoder.feed(b"data: 0123456").is_empty());
        let flushed = decoder.feed(b"789abcdef");
        assert_eq!(flushed, vec!["data: 0123456789abcdef".to_string()]);

        // The decoder recovers for the next well-formed event.
        assert_eq!(decoder.feed(b"data: ok\n\n"), vec!["ok".to_string()]);
    }
}
