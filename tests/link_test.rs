//! Connection manager tests over an in-memory transport.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::{mpsc, Mutex};

use arena_remote::bluetooth::{
    BluetoothManager, BoxedStream, ConnectionEvent, ConnectionState, LinkSettings, Peer,
    Transport,
};
use arena_remote::error::LinkError;

const UNREACHABLE: &str = "00:00:00:00:00:00";

/// Transport whose peers are test-held duplex pipes.
struct ChannelTransport {
    inbound: Mutex<mpsc::Receiver<(DuplexStream, Peer)>>,
    dialed: mpsc::UnboundedSender<(Peer, DuplexStream)>,
    buffer: usize,
}

#[async_trait]
impl Transport for ChannelTransport {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn accept(&self) -> Result<(BoxedStream, Peer), LinkError> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some((stream, peer)) => Ok((Box::new(stream), peer)),
            None => Err(LinkError::TransportUnavailable("closed".to_string())),
        }
    }

    async fn connect(&self, peer: &Peer) -> Result<BoxedStream, LinkError> {
        if peer.address == UNREACHABLE {
            return Err(LinkError::ConnectFailed("host is down".to_string()));
        }
        let (local, remote) = tokio::io::duplex(self.buffer);
        let _ = self.dialed.send((peer.clone(), remote));
        Ok(Box::new(local))
    }

    async fn paired_peers(&self) -> Result<Vec<Peer>, LinkError> {
        Ok(vec![robot(), Peer::new("Simulator", "22:22:22:22:22:22")])
    }
}

struct Harness {
    manager: BluetoothManager,
    events: mpsc::Receiver<ConnectionEvent>,
    inbound: mpsc::Sender<(DuplexStream, Peer)>,
    dialed: mpsc::UnboundedReceiver<(Peer, DuplexStream)>,
}

fn robot() -> Peer {
    Peer::new("MDP-Robot", "11:11:11:11:11:11")
}

fn harness_with(settings: LinkSettings, buffer: usize) -> Harness {
    let (inbound_tx, inbound_rx) = mpsc::channel(4);
    let (dialed_tx, dialed_rx) = mpsc::unbounded_channel();
    let transport = Arc::new(ChannelTransport {
        inbound: Mutex::new(inbound_rx),
        dialed: dialed_tx,
        buffer,
    });
    let (manager, events) = BluetoothManager::new(transport, settings);
    Harness {
        manager,
        events,
        inbound: inbound_tx,
        dialed: dialed_rx,
    }
}

fn harness(restart_delay: Duration) -> Harness {
    harness_with(
        LinkSettings {
            restart_delay,
            write_timeout: Some(Duration::from_secs(1)),
        },
        1024,
    )
}

impl Harness {
    /// Open an inbound session as `peer`, returning the remote end.
    async fn dial_in(&self, peer: Peer) -> DuplexStream {
        let (local, remote) = tokio::io::duplex(1024);
        self.inbound.send((local, peer)).await.unwrap();
        remote
    }

    async fn next_event(&mut self) -> ConnectionEvent {
        tokio::time::timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn listen_and_accept(&mut self) -> DuplexStream {
        self.manager.start_listening();
        assert_eq!(self.next_event().await, ConnectionEvent::Listening);
        let remote = self.dial_in(robot()).await;
        assert_eq!(
            self.next_event().await,
            ConnectionEvent::Connected { peer: robot() }
        );
        remote
    }
}

async fn read_line(stream: &mut DuplexStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("timed out reading")
        .unwrap();
    line
}

#[tokio::test]
async fn test_listen_accept_receive_and_write() {
    let mut h = harness(Duration::from_millis(20));
    assert_eq!(h.manager.state(), ConnectionState::Idle);

    let mut remote = h.listen_and_accept().await;
    assert!(h.manager.is_connected());
    assert_eq!(h.manager.peer(), Some(robot()));

    remote
        .write_all(b"{\"status\":\"ready\"}\nmove:done\n")
        .await
        .unwrap();
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::MessageReceived("{\"status\":\"ready\"}".to_string())
    );
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::MessageReceived("move:done".to_string())
    );

    h.manager.write("move:up\n").await.unwrap();
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Sent("move:up".to_string())
    );
    assert_eq!(read_line(&mut remote).await, "move:up\n");
}

#[tokio::test]
async fn test_auto_restart_after_remote_drop() {
    let mut h = harness(Duration::from_millis(50));
    let remote = h.listen_and_accept().await;

    drop(remote);
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Disconnected {
            reason: Some(LinkError::StreamClosed)
        }
    );
    assert_eq!(h.manager.state(), ConnectionState::Idle);

    assert_eq!(h.next_event().await, ConnectionEvent::Listening);
    assert_eq!(h.manager.state(), ConnectionState::Listening);

    let _remote = h.dial_in(robot()).await;
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connected { peer: robot() }
    );
}

#[tokio::test]
async fn test_connect_while_connected_replaces_session() {
    let mut h = harness(Duration::from_millis(20));
    let mut first = h.listen_and_accept().await;

    let simulator = Peer::new("Simulator", "22:22:22:22:22:22");
    h.manager.connect(simulator.clone());
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Disconnected { reason: None }
    );
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connecting {
            peer: simulator.clone()
        }
    );
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connected {
            peer: simulator.clone()
        }
    );

    // The old session is closed from our side.
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(2), first.read(&mut buf))
        .await
        .expect("old session still open")
        .unwrap();
    assert_eq!(n, 0);

    let (peer, mut second) = h.dialed.recv().await.unwrap();
    assert_eq!(peer, simulator);
    h.manager.write("start").await.unwrap();
    assert_eq!(read_line(&mut second).await, "start\n");
}

#[tokio::test]
async fn test_connect_failure_returns_to_idle() {
    let mut h = harness(Duration::from_millis(10));
    let peer = Peer::new("", UNREACHABLE);

    h.manager.connect(peer.clone());
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connecting { peer }
    );
    assert!(matches!(
        h.next_event().await,
        ConnectionEvent::Error(LinkError::ConnectFailed(_))
    ));
    assert_eq!(h.manager.state(), ConnectionState::Idle);

    // Open failures do not trigger the listen restart.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.manager.state(), ConnectionState::Idle);
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_write_when_not_connected() {
    let mut h = harness(Duration::from_millis(10));
    assert_eq!(h.manager.write("move:up").await, Err(LinkError::NotConnected));

    h.manager.start_listening();
    assert_eq!(h.next_event().await, ConnectionEvent::Listening);
    assert_eq!(h.manager.write("move:up").await, Err(LinkError::NotConnected));
}

#[tokio::test]
async fn test_stop_does_not_restart() {
    let mut h = harness(Duration::from_millis(10));
    let mut remote = h.listen_and_accept().await;

    h.manager.stop().await;
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Disconnected { reason: None }
    );
    assert_eq!(h.manager.state(), ConnectionState::Idle);

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(2), remote.read(&mut buf))
        .await
        .expect("session still open")
        .unwrap();
    assert_eq!(n, 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.manager.state(), ConnectionState::Idle);
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_action_listens_again() {
    let mut h = harness(Duration::from_millis(20));
    let _remote = h.listen_and_accept().await;

    h.manager.restart_listening().await;
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Disconnected { reason: None }
    );
    assert_eq!(h.next_event().await, ConnectionEvent::Listening);
    assert_eq!(h.manager.state(), ConnectionState::Listening);
}

#[tokio::test]
async fn test_user_connect_cancels_pending_restart() {
    let mut h = harness(Duration::from_millis(200));
    let remote = h.listen_and_accept().await;

    drop(remote);
    assert!(matches!(
        h.next_event().await,
        ConnectionEvent::Disconnected { reason: Some(_) }
    ));

    let simulator = Peer::new("Simulator", "22:22:22:22:22:22");
    h.manager.connect(simulator.clone());
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connecting {
            peer: simulator.clone()
        }
    );
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connected {
            peer: simulator.clone()
        }
    );

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        h.manager.state(),
        ConnectionState::Connected { peer: simulator }
    );
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_stalled_write_times_out_and_restarts() {
    let mut h = harness_with(
        LinkSettings {
            restart_delay: Duration::from_millis(20),
            write_timeout: Some(Duration::from_millis(50)),
        },
        8,
    );
    let peer = Peer::new("Stalled", "33:33:33:33:33:33");
    h.manager.connect(peer.clone());
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connecting { peer: peer.clone() }
    );
    assert_eq!(h.next_event().await, ConnectionEvent::Connected { peer });
    // Keep the remote end open but never read from it.
    let _remote = h.dialed.recv().await.unwrap();

    let long = "x".repeat(64);
    assert_eq!(h.manager.write(&long).await, Err(LinkError::WriteTimeout(50)));
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Disconnected {
            reason: Some(LinkError::WriteTimeout(50))
        }
    );
    assert_eq!(h.next_event().await, ConnectionEvent::Listening);
}

#[tokio::test]
async fn test_full_event_queue_does_not_block_caller() {
    let mut h = harness_with(
        LinkSettings {
            restart_delay: Duration::from_millis(20),
            write_timeout: Some(Duration::from_secs(1)),
        },
        1 << 20,
    );
    h.manager.connect(robot());
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connecting { peer: robot() }
    );
    assert_eq!(
        h.next_event().await,
        ConnectionEvent::Connected { peer: robot() }
    );
    let (_, mut remote) = h.dialed.recv().await.unwrap();

    // More lines than the event queue holds, and nobody draining it.
    let burst = "{\"status\":\"x\"}\n".repeat(100);
    remote.write_all(burst.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let written = tokio::time::timeout(Duration::from_secs(2), h.manager.write("move:up")).await;
    assert_eq!(written, Ok(Ok(())));
    assert_eq!(read_line(&mut remote).await, "move:up\n");

    tokio::time::timeout(Duration::from_secs(2), h.manager.stop())
        .await
        .expect("stop blocked on the event queue");
    assert_eq!(h.manager.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_paired_peers_are_listed() {
    let h = harness(Duration::from_millis(10));
    let peers = h.manager.paired_peers().await.unwrap();
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0], robot());
    assert_eq!(h.manager.transport_name(), "channel");
}
