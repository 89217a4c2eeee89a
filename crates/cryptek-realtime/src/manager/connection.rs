//! Background connection driver with auto-reconnect.
//!
//! One driver runs per `connect` call. It owns the socket, forwards
//! outbound frames, dispatches inbound ones, and applies the reconnect
//! policy on abnormal closure. Cancellation is observed at every
//! suspension point: the connect handshake, the read loop, and the
//! backoff sleep.

use std::sync::Arc;
use std::time::Duration;

use cryptek_common::{SessionKey, TransportError};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::dispatch_frame;
use super::state::Shared;
use super::types::ConnectionState;
use crate::backoff::ReconnectPolicy;
use crate::protocol::{events, ConnectedPayload, DisconnectedPayload, ErrorPayload};
use crate::transport::{Connector, FrameSink, Link};

/// Upper bound on the closing handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// How a connected session ended.
enum SessionEnd {
    /// The consumer disconnected (or a newer `connect` superseded us).
    Cancelled,
    /// Abnormal closure; the reason is reported to listeners.
    Closed(String),
}

pub(crate) struct Driver {
    pub(crate) generation: u64,
    pub(crate) session: SessionKey,
    pub(crate) url: String,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) connect_timeout: Duration,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) cancel: CancellationToken,
}

impl Driver {
    pub(crate) async fn run(self) {
        // Retries made since the last successful open.
        let mut attempts: u32 = 0;

        loop {
            let still_current = self
                .shared
                .with_current(self.generation, |link| link.state = ConnectionState::Connecting)
                .is_some();
            if !still_current {
                return;
            }

            info!(session = %self.session, attempt = attempts, "connecting to chat server");
            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.open() => result,
            };

            let reason = match opened {
                Ok(link) => {
                    attempts = 0;
                    match self.serve(link).await {
                        SessionEnd::Cancelled => return,
                        SessionEnd::Closed(reason) => reason,
                    }
                }
                Err(e) => {
                    error!(session = %self.session, error = %e, "failed to connect to chat server");
                    self.emit(events::ERROR, &ErrorPayload { error: e.to_string() });
                    e.to_string()
                }
            };

            match self.policy.next(attempts) {
                Some((attempt, delay)) => {
                    attempts = attempt;
                    let still_current = self
                        .shared
                        .with_current(self.generation, |link| {
                            link.state = ConnectionState::Reconnecting;
                            link.attempts = attempt;
                        })
                        .is_some();
                    if !still_current {
                        return;
                    }

                    warn!(
                        attempt,
                        max = self.policy.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "connection lost, scheduling reconnect"
                    );
                    self.emit(
                        events::DISCONNECTED,
                        &DisconnectedPayload {
                            will_reconnect: true,
                            attempt,
                            reason: Some(reason),
                        },
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    let finished = self
                        .shared
                        .with_current(self.generation, |link| {
                            link.state = ConnectionState::Disconnected;
                            link.outbound = None;
                            link.cancel = None;
                        })
                        .is_some();
                    if !finished {
                        return;
                    }

                    error!(
                        session = %self.session,
                        attempts,
                        reason = %reason,
                        "reconnect attempts exhausted, giving up"
                    );
                    self.emit(
                        events::DISCONNECTED,
                        &DisconnectedPayload {
                            will_reconnect: false,
                            attempt: attempts,
                            reason: Some(reason),
                        },
                    );
                    return;
                }
            }
        }
    }

    async fn open(&self) -> Result<Link, TransportError> {
        match tokio::time::timeout(self.connect_timeout, self.connector.connect(&self.url)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(TransportError::Timeout(self.connect_timeout.as_secs())),
        }
    }

    /// Run one connected session until it closes or is cancelled.
    async fn serve(&self, link: Link) -> SessionEnd {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let became_live = self
            .shared
            .with_current(self.generation, |state| {
                state.state = ConnectionState::Connected;
                state.attempts = 0;
                state.outbound = Some(outbound_tx);
            })
            .is_some();
        if !became_live {
            return SessionEnd::Cancelled;
        }

        info!(session = %self.session, "connected to chat server");
        self.emit(
            events::CONNECTED,
            &ConnectedPayload {
                user_address: self.session.to_string(),
            },
        );

        let Link {
            mut sink,
            mut stream,
        } = link;

        let end = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SessionEnd::Cancelled,
                Some(text) = outbound_rx.recv() => {
                    if let Err(e) = sink.send(text).await {
                        warn!(error = %e, "send failed");
                        break SessionEnd::Closed(e.to_string());
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(text)) => {
                        self.shared.deliver_if_current(self.generation, || {
                            dispatch_frame(&self.shared.listeners, &text)
                        });
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "transport error");
                        break SessionEnd::Closed(e.to_string());
                    }
                    None => {
                        info!(session = %self.session, "chat server closed connection");
                        break SessionEnd::Closed(TransportError::Closed.to_string());
                    }
                },
            }
        };

        if matches!(end, SessionEnd::Closed(_)) {
            self.shared
                .with_current(self.generation, |state| state.outbound = None);
        }
        close_sink(&mut sink).await;
        end
    }

    /// Emit a locally generated event, unless this driver was superseded.
    fn emit<T: Serialize>(&self, event: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => {
                self.shared.deliver_if_current(self.generation, || {
                    self.shared.listeners.emit(event, &value)
                });
            }
            Err(e) => warn!(event = %event, error = %e, "failed to encode event payload"),
        }
    }
}

/// Finish the closing handshake, bounded so a dead peer cannot stall the
/// driver.
async fn close_sink(sink: &mut FrameSink) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "error while closing connection"),
        Err(_elapsed) => debug!("timed out closing connection"),
    }
}
