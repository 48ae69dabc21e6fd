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

//! Transport abstraction for point-to-point byte streams.

use async_trait::async_trait;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::LinkError;

/// A reliable, ordered, bidirectional byte stream.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> LinkStream for T {}

/// Owned stream handed out by a [`Transport`].
pub type BoxedStream = Box<dyn LinkStream>;

/// A remote endpoint known by name and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub name: String,
    pub address: String,
}

impl Peer {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Name if known, otherwise the address.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() || self.name == self.address {
            f.write_str(&self.address)
        } else {
            write!(f, "{} ({})", self.name, self.address)
        }
    }
}

/// Trait for session transports.
///
/// Both directions use the same well-known service identity, so either side
/// of the link may initiate.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Transport name for logging (e.g., "RFCOMM").
    fn name(&self) -> &'static str;

    /// Open the passive endpoint and wait for a single inbound session.
    ///
    /// The endpoint is released once a session is accepted, and also when the
    /// returned future is dropped.
    async fn accept(&self) -> Result<(BoxedStream, Peer), LinkError>;

    /// Open an outbound session to `peer`.
    async fn connect(&self, peer: &Peer) -> Result<BoxedStream, LinkError>;

    /// Peers previously paired with this host.
    async fn paired_peers(&self) -> Result<Vec<Peer>, LinkError>;
}
