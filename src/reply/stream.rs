//! Streaming reply bodies.
//!
//! A [`ReplyStream`] is an event source: data chunks, a terminal end, or a
//! terminal error. The [`StreamAdapter`] forwards it to the transport, caps
//! it at an optional byte budget and reports exactly one [`StreamOutcome`]
//! when the body is finished. Source errors never surface as transport
//! errors; the body is simply ended with whatever was already written.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot};

/// Event emitted by a reply stream source
#[derive(Debug)]
pub enum StreamEvent {
    Data(Bytes),
    End,
    Error(io::Error),
}

/// A type-erased source of stream events
pub type EventSource = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Fires once the adapter has finalized the body
pub type SentSignal = oneshot::Receiver<StreamOutcome>;

/// How a streamed body finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Source ended, or the byte budget was reached
    Completed { bytes: u64 },
    /// Source failed; the body was ended early
    Truncated { bytes: u64, reason: String },
    /// The transport dropped the body before it finished
    Abandoned { bytes: u64 },
}

impl StreamOutcome {
    pub fn bytes(&self) -> u64 {
        match self {
            StreamOutcome::Completed { bytes }
            | StreamOutcome::Truncated { bytes, .. }
            | StreamOutcome::Abandoned { bytes } => *bytes,
        }
    }
}

pub struct ReplyStream {
    source: EventSource,
    budget: Option<u64>,
    content_type: Option<String>,
}

impl ReplyStream {
    pub fn from_events<S>(source: S) -> Self
    where
        S: Stream<Item = StreamEvent> + Send + 'static,
    {
        Self {
            source: Box::pin(source),
            budget: None,
            content_type: None,
        }
    }

    /// Wrap a fallible byte stream. Exhaustion counts as a normal end.
    pub fn from_bytes_stream<S, E>(source: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let events = source
            .map(|item| match item {
                Ok(chunk) => StreamEvent::Data(chunk),
                Err(e) => StreamEvent::Error(io::Error::new(io::ErrorKind::Other, e)),
            })
            .chain(stream::once(async { StreamEvent::End }));
        Self::from_events(events)
    }

    /// Read an async reader to the end in chunks of `chunk_size`
    pub fn from_reader<R>(reader: R, chunk_size: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let chunk_size = chunk_size.max(1);
        let events = stream::unfold(Some(reader), move |state| async move {
            let mut reader = match state {
                Some(reader) => reader,
                None => return None,
            };
            let mut buffer = BytesMut::with_capacity(chunk_size);
            match reader.read_buf(&mut buffer).await {
                Ok(0) => Some((StreamEvent::End, None)),
                Ok(_) => Some((StreamEvent::Data(buffer.freeze()), Some(reader))),
                Err(e) => Some((StreamEvent::Error(e), None)),
            }
        });
        Self::from_events(events)
    }

    /// A stream fed from elsewhere through a [`StreamSender`]
    pub fn channel() -> (StreamSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        (StreamSender { tx }, Self::from_events(events))
    }

    pub fn once(chunk: Bytes) -> Self {
        let events: Vec<StreamEvent> = if chunk.is_empty() {
            vec![StreamEvent::End]
        } else {
            vec![StreamEvent::Data(chunk), StreamEvent::End]
        };
        Self::from_events(stream::iter(events))
    }

    pub fn empty() -> Self {
        Self::from_events(stream::iter(vec![StreamEvent::End]))
    }

    /// Forward at most `limit` bytes
    pub fn bytes(mut self, limit: u64) -> Self {
        self.budget = Some(limit);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    pub fn declared_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl std::fmt::Debug for ReplyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyStream")
            .field("budget", &self.budget)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Producer half of [`ReplyStream::channel`]
///
/// Sends after the body has been finalized are dropped silently.
#[derive(Clone)]
pub struct StreamSender {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl StreamSender {
    pub fn data(&self, chunk: impl Into<Bytes>) {
        let _ = self.tx.send(StreamEvent::Data(chunk.into()));
    }

    pub fn end(&self) {
        let _ = self.tx.send(StreamEvent::End);
    }

    pub fn error(&self, error: io::Error) {
        let _ = self.tx.send(StreamEvent::Error(error));
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Bridges a reply stream to the transport body
pub struct StreamAdapter {
    source: EventSource,
    remaining: Option<u64>,
    written: u64,
    finalized: bool,
    notify: Option<oneshot::Sender<StreamOutcome>>,
}

impl StreamAdapter {
    pub fn new(stream: ReplyStream) -> (Self, SentSignal) {
        let (tx, rx) = oneshot::channel();
        let adapter = Self {
            source: stream.source,
            remaining: stream.budget,
            written: 0,
            finalized: false,
            notify: Some(tx),
        };
        (adapter, rx)
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn finalize(&mut self, outcome: StreamOutcome) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        if let Some(tx) = self.notify.take() {
            let _ = tx.send(outcome);
        }
    }
}

impl Stream for StreamAdapter {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finalized {
                return Poll::Ready(None);
            }

            if this.remaining == Some(0) {
                let bytes = this.written;
                this.finalize(StreamOutcome::Completed { bytes });
                return Poll::Ready(None);
            }

            match this.source.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(StreamEvent::Data(chunk))) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    let chunk = match this.remaining {
                        Some(left) if (chunk.len() as u64) > left => chunk.slice(..left as usize),
                        _ => chunk,
                    };
                    let len = chunk.len() as u64;
                    this.written += len;
                    if let Some(left) = this.remaining.as_mut() {
                        *left -= len;
                    }
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Poll::Ready(Some(StreamEvent::End)) | Poll::Ready(None) => {
                    let bytes = this.written;
                    this.finalize(StreamOutcome::Completed { bytes });
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(StreamEvent::Error(e))) => {
                    log::warn!(
                        "Reply stream failed after {} bytes, ending response: {}",
                        this.written,
                        e
                    );
                    let bytes = this.written;
                    this.finalize(StreamOutcome::Truncated {
                        bytes,
                        reason: e.to_string(),
                    });
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl Drop for StreamAdapter {
    fn drop(&mut self) {
        if !self.finalized {
            log::debug!("Response body dropped after {} bytes", self.written);
            let bytes = self.written;
            self.finalize(StreamOutcome::Abandoned { bytes });
        }
    }
}
