// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Individual Bluetooth connection handler.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::protocol::LINE_DELIMITER;
use super::transport::Peer;
use crate::error::LinkError;

/// Longest inbound line kept, excluding the delimiter.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Events emitted by the link.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Waiting for an inbound session.
    Listening,
    /// Outbound session attempt started.
    Connecting { peer: Peer },
    /// Connection established.
    Connected { peer: Peer },
    /// One framed message received, in arrival order.
    MessageReceived(String),
    /// A message was written to the peer.
    Sent(String),
    /// Connection closed; `reason` is `None` for an operator-initiated stop.
    Disconnected { reason: Option<LinkError> },
    /// Opening a session failed.
    Error(LinkError),
}

/// State of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session and no pending open.
    Idle,
    /// Passive endpoint open, waiting for a peer.
    Listening,
    /// Outbound open in progress.
    Connecting { peer: Peer },
    /// Session established.
    Connected { peer: Peer },
    /// Session being torn down.
    Disconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Listening => "Listening",
            Self::Connecting { .. } => "Connecting...",
            Self::Connected { .. } => "Connected",
            Self::Disconnecting => "Disconnecting",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Read loop for a single session.
///
/// Splits the inbound byte stream into newline-terminated lines and forwards
/// each non-empty line as [`ConnectionEvent::MessageReceived`]. Lines longer
/// than the cap are skipped up to their delimiter.
pub struct ConnectionHandler<R> {
    reader: BufReader<R>,
    peer: Peer,
    max_line_len: usize,
    event_tx: mpsc::Sender<ConnectionEvent>,
}

impl<R: AsyncRead + Unpin> ConnectionHandler<R> {
    /// Create a new connection handler.
    pub fn new(reader: R, peer: Peer, event_tx: mpsc::Sender<ConnectionEvent>) -> Self {
        Self {
            reader: BufReader::new(reader),
            peer,
            max_line_len: MAX_LINE_BYTES,
            event_tx,
        }
    }

    /// Override the line length cap.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }

    /// Run until the stream ends, returning why it ended.
    pub async fn run(mut self) -> LinkError {
        info!("Connection handler started for {}", self.peer);

        let limit = self.max_line_len as u64 + 1;
        let mut buf = Vec::new();
        let mut discarding = false;
        loop {
            buf.clear();

            let read = (&mut self.reader)
                .take(limit)
                .read_until(LINE_DELIMITER as u8, &mut buf)
                .await;
            match read {
                Ok(0) => {
                    // EOF - connection closed
                    info!("Connection closed by remote");
                    return LinkError::StreamClosed;
                }
                Ok(n) => {
                    let complete = buf.last() == Some(&(LINE_DELIMITER as u8));
                    if discarding {
                        discarding = !complete;
                        continue;
                    }
                    if !complete && n as u64 >= limit {
                        warn!(
                            "Dropping line from {} longer than {} bytes",
                            self.peer, self.max_line_len
                        );
                        discarding = true;
                        continue;
                    }

                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("Received: {}", line);

                    if self
                        .event_tx
                        .send(ConnectionEvent::MessageReceived(line.to_string()))
                        .await
                        .is_err()
                    {
                        warn!("Event receiver dropped, ending session");
                        return LinkError::StreamClosed;
                    }
                }
                Err(e) => {
                    error!("Read error: {}", e);
                    return LinkError::from_stream_io(&e);
                }
            }
        }
    }
}
