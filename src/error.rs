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

//! Error types shared across the link, codec and arena layers.

use thiserror::Error;

/// Failures of the Bluetooth serial link.
///
/// None of these are fatal: connect-side failures leave the manager idle,
/// stream failures trigger the automatic listen restart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// No adapter or the Bluetooth daemon is unreachable.
    #[error("bluetooth transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The OS refused access to the adapter or peer.
    #[error("bluetooth permission denied: {0}")]
    PermissionDenied(String),

    /// The peer was unreachable or rejected the session.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// The peer closed the stream cleanly.
    #[error("stream closed by peer")]
    StreamClosed,

    /// An I/O fault on an established stream.
    #[error("stream error: {0}")]
    StreamError(String),

    /// A write did not complete within the configured bound.
    #[error("write timed out after {0} ms")]
    WriteTimeout(u64),

    /// A write was attempted with no active session.
    #[error("not connected")]
    NotConnected,
}

impl LinkError {
    /// Classify an I/O error raised while opening a session.
    pub fn from_connect_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::ConnectFailed(err.to_string()),
        }
    }

    /// Classify an I/O error raised on an established stream.
    pub fn from_stream_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe => Self::StreamClosed,
            _ => Self::StreamError(err.to_string()),
        }
    }
}

/// A malformed inbound message or record.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a json object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for field `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("unknown message category `{0}`")]
    UnknownCategory(String),
}

/// Rejected arena updates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// An update referenced an obstacle id that is not live.
    #[error("no obstacle with id {0}")]
    LookupMiss(u32),

    /// A position fell outside the grid for the entity's footprint.
    #[error("position ({x}, {y}) is out of bounds")]
    OutOfBounds { x: i32, y: i32 },
}
