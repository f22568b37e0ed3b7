//! The duplex transport a session's pumps run on.
//!
//! The pumps only need to receive one frame, send one text frame, and close.
//! The websocket halves produced by `WebSocket::split` implement these
//! traits; tests use an in-memory implementation.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
    #[error("transport closed")]
    Closed,
}

/// One frame read from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    /// Peer requested close.
    Close,
    /// Binary, ping, pong. Ignored by the inbound pump.
    Other,
}

#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the transport has ended.
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>>;
}

#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Send a close frame and shut the write half down.
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
impl FrameSource for SplitStream<WebSocket> {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        let frame = match self.next().await? {
            Ok(Message::Text(text)) => InboundFrame::Text(text.as_str().to_owned()),
            Ok(Message::Close(_)) => InboundFrame::Close,
            Ok(Message::Binary(_)) | Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                InboundFrame::Other
            }
            Err(e) => return Some(Err(e.into())),
        };
        Some(Ok(frame))
    }
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.send(Message::Close(None)).await?;
        SinkExt::close(self).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! Channel-backed transport for pump tests.

    use super::*;
    use tokio::sync::mpsc;

    /// What the server side wrote.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Written {
        Text(String),
        Close,
    }

    pub struct MemorySource {
        rx: mpsc::UnboundedReceiver<Result<InboundFrame, TransportError>>,
    }

    pub struct MemorySink {
        tx: mpsc::UnboundedSender<Written>,
        fail_writes: bool,
    }

    /// Test-side handle: push inbound frames, observe outbound ones.
    pub struct Peer {
        pub inbound: mpsc::UnboundedSender<Result<InboundFrame, TransportError>>,
        pub outbound: mpsc::UnboundedReceiver<Written>,
    }

    impl Peer {
        pub fn send_text(&self, text: &str) {
            let _ = self.inbound.send(Ok(InboundFrame::Text(text.to_string())));
        }

        /// Next frame written by the server.
        pub async fn next_written(&mut self) -> Option<Written> {
            self.outbound.recv().await
        }
    }

    pub fn pair() -> (MemorySource, MemorySink, Peer) {
        pair_with(false)
    }

    /// Like `pair`, but every write fails.
    pub fn broken_pair() -> (MemorySource, MemorySink, Peer) {
        pair_with(true)
    }

    fn pair_with(fail_writes: bool) -> (MemorySource, MemorySink, Peer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (
            MemorySource { rx: in_rx },
            MemorySink {
                tx: out_tx,
                fail_writes,
            },
            Peer {
                inbound: in_tx,
                outbound: out_rx,
            },
        )
    }

    #[async_trait]
    impl FrameSource for MemorySource {
        async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
            self.rx.recv().await
        }
    }

    #[async_trait]
    impl FrameSink for MemorySink {
        async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Closed);
            }
            self.tx
                .send(Written::Text(text.to_string()))
                .map_err(|_| TransportError::Closed)
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.tx
                .send(Written::Close)
                .map_err(|_| TransportError::Closed)
        }
    }
}
