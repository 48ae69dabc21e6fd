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

//! Bluetooth session manager.
//!
//! Owns the single active session and drives the listen/connect/restart
//! state machine. Every transition happens under one session lock; spawned
//! tasks carry the generation they were started for and give up as soon as
//! it no longer matches.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::connection::{ConnectionEvent, ConnectionHandler, ConnectionState};
use super::protocol::LINE_DELIMITER;
use super::transport::{BoxedStream, Peer, Transport};
use crate::config::BluetoothConfig;
use crate::error::LinkError;

type SharedWriter = Arc<tokio::sync::Mutex<WriteHalf<BoxedStream>>>;

/// Timing knobs for the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Delay before listening again after an unexpected drop.
    pub restart_delay: Duration,
    /// Upper bound on a single write, if any.
    pub write_timeout: Option<Duration>,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self::from(&BluetoothConfig::default())
    }
}

impl From<&BluetoothConfig> for LinkSettings {
    fn from(config: &BluetoothConfig) -> Self {
        Self {
            restart_delay: config.restart_delay(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// How a new session is opened.
#[derive(Debug, Clone)]
enum Opening {
    Listen,
    Connect(Peer),
}

struct Session {
    state: ConnectionState,
    generation: u64,
    /// Accept/connect followed by the read loop; never more than one.
    task: Option<JoinHandle<()>>,
    restart_task: Option<JoinHandle<()>>,
    writer: Option<SharedWriter>,
}

impl Session {
    /// Cancel everything in flight and return to `Idle`.
    ///
    /// Returns whether a session was connected.
    fn teardown(&mut self) -> bool {
        let was_connected = self.state.is_connected();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(task) = self.restart_task.take() {
            task.abort();
        }
        self.writer = None;
        self.generation += 1;
        self.state = ConnectionState::Idle;
        was_connected
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    settings: LinkSettings,
    session: Mutex<Session>,
    event_tx: mpsc::Sender<ConnectionEvent>,
}

/// Manager for the single Bluetooth session.
///
/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct BluetoothManager {
    inner: Arc<Inner>,
}

impl BluetoothManager {
    /// Create a new manager over `transport`, returning it with its event
    /// receiver.
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: LinkSettings,
    ) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let manager = Self {
            inner: Arc::new(Inner {
                transport,
                settings,
                session: Mutex::new(Session {
                    state: ConnectionState::Idle,
                    generation: 0,
                    task: None,
                    restart_task: None,
                    writer: None,
                }),
                event_tx,
            }),
        };
        (manager, event_rx)
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.session.lock().state.is_connected()
    }

    /// Connected peer, if any.
    pub fn peer(&self) -> Option<Peer> {
        match &self.inner.session.lock().state {
            ConnectionState::Connected { peer } => Some(peer.clone()),
            _ => None,
        }
    }

    /// Transport name for logging.
    pub fn transport_name(&self) -> &'static str {
        self.inner.transport.name()
    }

    /// Peers previously paired with this host.
    pub async fn paired_peers(&self) -> Result<Vec<Peer>, LinkError> {
        self.inner.transport.paired_peers().await
    }

    /// Wait for an inbound session, replacing any current one.
    pub fn start_listening(&self) {
        let mut session = self.inner.session.lock();
        let was_connected = session.teardown();
        Inner::begin(&self.inner, &mut session, Opening::Listen, was_connected);
    }

    /// Open an outbound session to `peer`, replacing any current one.
    pub fn connect(&self, peer: Peer) {
        let mut session = self.inner.session.lock();
        let was_connected = session.teardown();
        Inner::begin(
            &self.inner,
            &mut session,
            Opening::Connect(peer),
            was_connected,
        );
    }

    /// Close the session without restarting.
    pub async fn stop(&self) {
        let (was_connected, writer, generation) = {
            let mut session = self.inner.session.lock();
            let writer = session.writer.clone();
            let was_connected = session.teardown();
            if was_connected {
                session.state = ConnectionState::Disconnecting;
            }
            (was_connected, writer, session.generation)
        };

        if let Some(writer) = writer {
            let mut writer = writer.lock().await;
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown after stop failed: {}", e);
            }
        }

        {
            let mut session = self.inner.session.lock();
            if session.generation == generation {
                session.state = ConnectionState::Idle;
            }
        }

        if was_connected {
            info!("Session stopped");
            self.inner
                .notify(ConnectionEvent::Disconnected { reason: None });
        }
    }

    /// Close the session and listen again after the restart delay.
    pub async fn restart_listening(&self) {
        self.stop().await;
        let mut session = self.inner.session.lock();
        Inner::schedule_restart(&self.inner, &mut session);
    }

    /// Write one line to the peer.
    ///
    /// Fails with [`LinkError::NotConnected`] when there is no session. Any
    /// write failure ends the session and schedules the listen restart.
    pub async fn write(&self, line: &str) -> Result<(), LinkError> {
        let (writer, generation) = {
            let session = self.inner.session.lock();
            match &session.writer {
                Some(writer) => (writer.clone(), session.generation),
                None => return Err(LinkError::NotConnected),
            }
        };

        let text = line.trim_end_matches(['\r', LINE_DELIMITER]);
        let mut framed = String::with_capacity(text.len() + 1);
        framed.push_str(text);
        framed.push(LINE_DELIMITER);

        let result = {
            let mut writer = writer.lock().await;
            let io = async {
                writer.write_all(framed.as_bytes()).await?;
                writer.flush().await
            };
            match self.inner.settings.write_timeout {
                Some(limit) => match tokio::time::timeout(limit, io).await {
                    Ok(result) => result.map_err(|e| LinkError::from_stream_io(&e)),
                    Err(_) => Err(LinkError::WriteTimeout(limit.as_millis() as u64)),
                },
                None => io.await.map_err(|e| LinkError::from_stream_io(&e)),
            }
        };

        match result {
            Ok(()) => {
                debug!("Sent: {}", text);
                self.inner.notify(ConnectionEvent::Sent(text.to_string()));
                Ok(())
            }
            Err(e) => {
                error!("Write failed: {}", e);
                Inner::end_session(&self.inner, generation, e.clone(), true).await;
                Err(e)
            }
        }
    }
}

impl Inner {
    async fn emit(&self, event: ConnectionEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }

    /// Queue an event raised on the caller's side without waiting.
    ///
    /// The caller may be the one draining the queue, so a full queue drops
    /// the event instead of blocking.
    fn notify(&self, event: ConnectionEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Event queue full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(_)) => debug!("Event receiver dropped"),
        }
    }

    /// Start a session task for `opening` on an already torn-down session.
    fn begin(this: &Arc<Self>, session: &mut Session, opening: Opening, announce_drop: bool) {
        session.generation += 1;
        session.state = match &opening {
            Opening::Listen => ConnectionState::Listening,
            Opening::Connect(peer) => ConnectionState::Connecting { peer: peer.clone() },
        };
        let generation = session.generation;
        let inner = Arc::clone(this);
        session.task = Some(tokio::spawn(async move {
            Inner::run_session(inner, generation, opening, announce_drop).await;
        }));
    }

    async fn run_session(this: Arc<Self>, generation: u64, opening: Opening, announce_drop: bool) {
        if announce_drop {
            this.emit(ConnectionEvent::Disconnected { reason: None })
                .await;
        }

        let opened = match opening {
            Opening::Listen => {
                info!("Waiting for connections on {}...", this.transport.name());
                this.emit(ConnectionEvent::Listening).await;
                this.transport.accept().await
            }
            Opening::Connect(peer) => {
                this.emit(ConnectionEvent::Connecting { peer: peer.clone() })
                    .await;
                this.transport
                    .connect(&peer)
                    .await
                    .map(|stream| (stream, peer))
            }
        };

        let (stream, peer) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                Inner::fail_open(&this, generation, e).await;
                return;
            }
        };

        let (reader, writer) = tokio::io::split(stream);
        {
            let mut session = this.session.lock();
            if session.generation != generation {
                debug!("Discarding stale session with {}", peer);
                return;
            }
            session.writer = Some(Arc::new(tokio::sync::Mutex::new(writer)));
            session.state = ConnectionState::Connected { peer: peer.clone() };
        }

        info!("Connected to {}", peer);
        this.emit(ConnectionEvent::Connected { peer: peer.clone() })
            .await;

        let handler = ConnectionHandler::new(reader, peer, this.event_tx.clone());
        let reason = handler.run().await;
        Inner::end_session(&this, generation, reason, false).await;
    }

    async fn fail_open(this: &Arc<Self>, generation: u64, err: LinkError) {
        {
            let mut session = this.session.lock();
            if session.generation != generation {
                return;
            }
            // Our own handle; dropping it detaches.
            session.task = None;
            session.state = ConnectionState::Idle;
        }
        warn!("Failed to open session: {}", err);
        this.emit(ConnectionEvent::Error(err)).await;
    }

    /// Close the session of `generation` after a drop, then schedule the
    /// listen restart.
    ///
    /// `abort` is set when a caller's write ended the session; the session
    /// task is cancelled and the drop is reported without waiting on the
    /// event queue.
    async fn end_session(this: &Arc<Self>, generation: u64, reason: LinkError, abort: bool) {
        let closed_generation = {
            let mut session = this.session.lock();
            if session.generation != generation {
                return;
            }
            session.state = ConnectionState::Disconnecting;
            if let Some(task) = session.task.take() {
                if abort {
                    task.abort();
                }
            }
            session.writer = None;
            session.generation += 1;
            session.state = ConnectionState::Idle;
            session.generation
        };

        info!("Session ended: {}", reason);
        let event = ConnectionEvent::Disconnected {
            reason: Some(reason),
        };
        if abort {
            this.notify(event);
        } else {
            this.emit(event).await;
        }

        let mut session = this.session.lock();
        if session.generation == closed_generation {
            Inner::schedule_restart(this, &mut session);
        }
    }

    /// Re-enter `Listening` after the settling delay unless something else
    /// happens first.
    fn schedule_restart(this: &Arc<Self>, session: &mut Session) {
        if let Some(task) = session.restart_task.take() {
            task.abort();
        }
        let generation = session.generation;
        let delay = this.settings.restart_delay;
        let inner = Arc::clone(this);
        debug!("Restarting listener in {:?}", delay);

        session.restart_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut session = inner.session.lock();
            if session.generation != generation {
                return;
            }
            session.restart_task = None;
            Inner::begin(&inner, &mut session, Opening::Listen, false);
        }));
    }
}
