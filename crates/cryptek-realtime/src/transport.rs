//! Transport seam between the connection manager and the network.
//!
//! A [`Connector`] opens a [`Link`]: a text-frame sink plus a text-frame
//! stream. The stream ending means the connection closed. The default
//! connector speaks WebSocket through `tokio-tungstenite`; [`memory_link`]
//! gives an in-process link for tests and embedding.

use std::pin::Pin;

use async_trait::async_trait;
use cryptek_common::TransportError;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An open connection, split into its outbound and inbound halves.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

/// Opens links to a URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Link, TransportError>;
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// WebSocket connector backed by `tokio-tungstenite`.
///
/// Only text frames are surfaced. Pings are answered by tungstenite,
/// binary frames are ignored, and a close frame ends the stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .sink_map_err(|e| TransportError::Protocol(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, TransportError>(WsMessage::Text(text.into()))));

        let stream = ws_read
            .take_while(|frame| future::ready(!matches!(frame, Ok(WsMessage::Close(_)))))
            .filter_map(|frame| {
                future::ready(match frame {
                    Ok(WsMessage::Text(text)) => Some(Ok(text.to_string())),
                    Ok(other) => {
                        debug!(kind = ?frame_kind(&other), "ignoring non-text frame");
                        None
                    }
                    Err(e) => Some(Err(TransportError::Protocol(e.to_string()))),
                })
            });

        Ok(Link {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

fn frame_kind(msg: &WsMessage) -> &'static str {
    match msg {
        WsMessage::Text(_) => "text",
        WsMessage::Binary(_) => "binary",
        WsMessage::Ping(_) => "ping",
        WsMessage::Pong(_) => "pong",
        WsMessage::Close(_) => "close",
        WsMessage::Frame(_) => "frame",
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// The remote end of a [`memory_link`].
///
/// Dropping it (or calling [`MemoryPeer::close`]) ends the link's stream,
/// which the manager sees as the server closing the connection.
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<Result<String, TransportError>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Deliver a text frame to the link. Returns false once the link is gone.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.inbound.send(Ok(text.into())).is_ok()
    }

    /// Deliver a transport error to the link.
    pub fn fail(&self, error: TransportError) -> bool {
        self.inbound.send(Err(error)).is_ok()
    }

    /// Wait for the next frame the link sent. `None` once the link is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Take a frame the link already sent, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    pub fn close(self) {}
}

/// Create a connected in-process link and its remote end.
pub fn memory_link() -> (Link, MemoryPeer) {
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Result<String, TransportError>>();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();

    let stream = futures_util::stream::unfold(in_rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    let sink = futures_util::sink::unfold(out_tx, |tx, text: String| async move {
        tx.send(text).map_err(|_| TransportError::Closed)?;
        Ok::<_, TransportError>(tx)
    });

    let link = Link {
        sink: Box::pin(sink),
        stream: Box::pin(stream),
    };
    let peer = MemoryPeer {
        inbound: in_tx,
        outbound: out_rx,
    };
    (link, peer)
}
