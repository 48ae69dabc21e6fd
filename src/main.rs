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

//! Arena Remote console application.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_remote::arena::{GridGeometry, PointerOutcome, PointerTracker};
use arena_remote::bluetooth::{BluetoothManager, LinkSettings, Message, Peer, RfcommTransport};
use arena_remote::config::Config;
use arena_remote::error::LinkError;
use arena_remote::events::EventProcessor;
use arena_remote::state::AppState;
use arena_remote::tilt::TiltController;
use arena_remote::ui::{self, ConsoleAction, RobotAction, TiltAction};

/// Everything the console loop drives.
struct App {
    manager: BluetoothManager,
    processor: EventProcessor,
    tilt: TiltController,
    pointer: PointerTracker,
    peers: Vec<Peer>,
}

impl App {
    fn state(&self) -> &Arc<AppState> {
        self.processor.state()
    }

    /// Encode and send one message, reporting failures to the operator.
    async fn send(&self, message: Message) {
        let line = match message.to_line() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode message: {}", e);
                return;
            }
        };
        match self.manager.write(&line).await {
            Ok(()) => {}
            Err(LinkError::NotConnected) => {
                warn!("Dropping message, not connected");
                println!("Not connected to a device");
            }
            Err(e) => println!("Send failed: {}", e),
        }
    }

    async fn resolve_peer(&mut self, target: &str) -> Option<Peer> {
        let Ok(index) = target.parse::<usize>() else {
            return Some(Peer::new("", target));
        };
        if self.peers.is_empty() {
            self.refresh_peers().await;
        }
        let peer = index.checked_sub(1).and_then(|i| self.peers.get(i)).cloned();
        if peer.is_none() {
            println!("No paired device #{} (see `peers`)", index);
        }
        peer
    }

    async fn refresh_peers(&mut self) {
        match self.manager.paired_peers().await {
            Ok(peers) => self.peers = peers,
            Err(e) => println!("Could not list paired devices: {}", e),
        }
    }

    fn print_status(&self) {
        let state = self.state();
        println!("Link:   {}", self.manager.state().as_str());
        if let Some(device) = state.get_device_name() {
            println!("Device: {}", device);
        }
        println!(
            "Robot:  {}",
            state.get_robot_status().unwrap_or_else(|| "-".to_string())
        );
        println!(
            "Tilt:   {}   Drag lock: {}",
            if state.is_tilt_enabled() { "on" } else { "off" },
            if self.processor.arena().is_drag_locked() { "on" } else { "off" }
        );
    }

    fn report(&self, outcome: PointerOutcome) {
        match outcome {
            PointerOutcome::None => println!("Nothing there"),
            PointerOutcome::Selected(id) => println!("Selected obstacle #{}", id),
            PointerOutcome::EmptyCell { x, y } => println!("Empty cell ({}, {})", x, y),
            PointerOutcome::RobotMoved(robot) => println!("{}", robot),
            PointerOutcome::ObstacleMoved(id) => {
                if let Some(obstacle) = self.processor.arena().obstacle(id) {
                    println!("{}", obstacle);
                }
            }
            PointerOutcome::ObstacleRemoved(obstacle) => println!("Removed {}", obstacle),
        }
    }

    /// Handle one console action. Returns `false` to quit.
    async fn handle_action(&mut self, action: ConsoleAction) -> bool {
        match action {
            ConsoleAction::Listen => self.manager.start_listening(),
            ConsoleAction::Peers => {
                self.refresh_peers().await;
                if self.peers.is_empty() {
                    println!("No paired devices");
                }
                for (i, peer) in self.peers.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, peer);
                }
            }
            ConsoleAction::Connect(target) => {
                if let Some(peer) = self.resolve_peer(&target).await {
                    self.manager.connect(peer);
                }
            }
            ConsoleAction::Disconnect => self.manager.restart_listening().await,
            ConsoleAction::Status => self.print_status(),
            ConsoleAction::Move(movement) => {
                if self.state().is_tilt_enabled() {
                    println!("Movement buttons are disabled while tilt control is on");
                } else {
                    self.send(Message::movement(movement)).await;
                }
            }
            ConsoleAction::Start => self.send(Message::start()).await,
            ConsoleAction::Send(text) => self.send(Message::command(text)).await,
            ConsoleAction::Tilt(TiltAction::Enable(enabled)) => {
                if self.state().set_tilt_enabled(enabled) {
                    self.tilt.reset();
                    info!("Tilt control {}", if enabled { "enabled" } else { "disabled" });
                } else {
                    println!("Connect to a device before enabling tilt control");
                }
            }
            ConsoleAction::Tilt(TiltAction::Sample { x, y }) => {
                if self.state().is_tilt_enabled() && self.manager.is_connected() {
                    if let Some(movement) = self.tilt.sample(x, y, Instant::now()) {
                        self.send(Message::movement(movement)).await;
                    }
                }
            }
            ConsoleAction::SendObstacles => {
                let arena = self.processor.arena();
                if !self.manager.is_connected() {
                    println!("Not connected to a device");
                } else if arena.obstacles().is_empty() {
                    println!("No obstacles to send");
                } else {
                    let message = Message::obstacles(arena.obstacles());
                    self.send(message).await;
                }
            }
            ConsoleAction::Add {
                width,
                height,
                face,
            } => {
                let arena = self.processor.arena_mut();
                let id = arena.add_centered(width, height, face);
                if let Some(obstacle) = arena.obstacle(id) {
                    println!("Added {}", obstacle);
                }
            }
            ConsoleAction::Place { x, y } => match self.processor.arena_mut().add_obstacle(x, y) {
                Ok(id) => println!("Added obstacle #{}", id),
                Err(e) => println!("Cannot place obstacle: {}", e),
            },
            ConsoleAction::Select(id) => match self.processor.arena_mut().select(id) {
                Ok(()) => println!("Selected obstacle #{}", id),
                Err(e) => println!("{}", e),
            },
            ConsoleAction::Edit {
                width,
                height,
                face,
            } => {
                let arena = self.processor.arena_mut();
                match arena.selected().map(|o| o.id()) {
                    Some(id) => {
                        if let Err(e) = arena.edit_obstacle(id, width, height, face) {
                            println!("{}", e);
                        }
                    }
                    None => println!("No obstacle selected"),
                }
            }
            ConsoleAction::Delete => {
                let arena = self.processor.arena_mut();
                match arena.selected().map(|o| o.id()) {
                    Some(id) => {
                        if let Some(obstacle) = arena.remove_obstacle(id) {
                            println!("Removed {}", obstacle);
                        }
                    }
                    None => println!("No obstacle selected"),
                }
            }
            ConsoleAction::MoveObstacle { id, x, y } => {
                if let Err(e) = self.processor.arena_mut().move_obstacle(id, x, y) {
                    println!("{}", e);
                }
            }
            ConsoleAction::Clear => self.processor.arena_mut().clear_obstacles(),
            ConsoleAction::ClearAll => self.processor.arena_mut().clear_all(),
            ConsoleAction::Robot(action) => self.handle_robot(action),
            ConsoleAction::Lock(locked) => {
                self.processor.arena_mut().set_drag_locked(locked);
                println!("Drag lock {}", if locked { "on" } else { "off" });
            }
            ConsoleAction::Tap { x, y } => {
                let outcome = self.pointer.tap(self.processor.arena_mut(), x, y);
                self.report(outcome);
            }
            ConsoleAction::Drag { from, to } => {
                let arena = self.processor.arena_mut();
                let grabbed = self.pointer.pointer_down(arena, from.0, from.1);
                if !self.pointer.is_dragging() {
                    self.report(grabbed);
                } else {
                    self.pointer.pointer_move(arena, to.0, to.1);
                    let outcome = self.pointer.pointer_up(arena);
                    self.report(outcome);
                }
            }
            ConsoleAction::Show => print!("{}", ui::render_arena(self.processor.arena())),
            ConsoleAction::Log => {
                for line in self.state().log_lines() {
                    println!("{}", line);
                }
            }
            ConsoleAction::Help => println!("{}", ui::HELP),
            ConsoleAction::Quit => return false,
        }
        true
    }

    fn handle_robot(&mut self, action: RobotAction) {
        let arena = self.processor.arena_mut();
        match action {
            RobotAction::Spawn => println!("{}", arena.spawn_robot()),
            RobotAction::Remove => {
                if arena.remove_robot().is_none() {
                    println!("No robot on the arena");
                }
            }
            RobotAction::Rotate(rotation) => match arena.rotate_robot(rotation) {
                Some(robot) => println!("{}", robot),
                None => println!("No robot on the arena"),
            },
            RobotAction::Place { x, y, facing } => match arena.update_robot(x, y, facing) {
                Ok(robot) => println!("{}", robot),
                Err(e) => println!("{}", e),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arena_remote=info".parse()?),
        )
        .init();

    info!("Starting Arena Remote v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    // Create application state
    let state = AppState::new(config.log.max_lines);

    // Initialize Bluetooth
    let transport = Arc::new(RfcommTransport::new(&config.bluetooth).await?);
    let (manager, mut event_rx) =
        BluetoothManager::new(transport, LinkSettings::from(&config.bluetooth));
    if config.bluetooth.listen_on_startup {
        manager.start_listening();
    }

    let mut app = App {
        manager,
        processor: EventProcessor::new(state),
        tilt: TiltController::from_config(&config.tilt),
        pointer: PointerTracker::new(GridGeometry::fit(ui::CANVAS_SIZE, ui::CANVAS_SIZE)),
        peers: Vec::new(),
    };

    // Start console
    let mut action_rx = ui::run_console();

    info!("Ready.");

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                if app.processor.process_event(event) {
                    print!("{}", ui::render_arena(app.processor.arena()));
                }
            }
            Some(action) = action_rx.recv() => {
                if !app.handle_action(action).await {
                    info!("Quit requested");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    app.manager.stop().await;
    info!("Arena Remote stopped");
    Ok(())
}
