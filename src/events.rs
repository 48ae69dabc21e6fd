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

//! Event processing and message dispatch.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::arena::{Arena, Direction};
use crate::bluetooth::{ConnectionEvent, Message};
use crate::error::ArenaError;
use crate::state::{AppState, ConnectionStatus};

/// Applies connection events to the arena and the shared state.
pub struct EventProcessor {
    arena: Arena,
    state: Arc<AppState>,
}

impl EventProcessor {
    /// Create a new event processor over an empty arena.
    pub fn new(state: Arc<AppState>) -> Self {
        Self::with_arena(Arena::new(), state)
    }

    pub fn with_arena(arena: Arena, state: Arc<AppState>) -> Self {
        Self { arena, state }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Process a single event.
    ///
    /// Returns `true` when the arena changed and should be redrawn.
    pub fn process_event(&mut self, event: ConnectionEvent) -> bool {
        match event {
            ConnectionEvent::Listening => {
                info!("Waiting for the robot to connect");
                self.state.set_status(ConnectionStatus::Listening);
                false
            }
            ConnectionEvent::Connecting { peer } => {
                info!("Connecting to {}", peer);
                self.state.set_status(ConnectionStatus::Connecting);
                false
            }
            ConnectionEvent::Connected { peer } => {
                info!("Device connected: {}", peer);
                self.state.set_connected(peer.display_name().to_string());
                false
            }
            ConnectionEvent::Disconnected { reason } => {
                match reason {
                    Some(reason) => info!("Device disconnected: {}", reason),
                    None => info!("Device disconnected"),
                }
                self.state.set_disconnected();
                false
            }
            ConnectionEvent::Error(e) => {
                error!("Connection error: {}", e);
                self.state.set_error();
                false
            }
            ConnectionEvent::Sent(text) => {
                self.state.log_message(&format!("Sent: {}", text));
                false
            }
            ConnectionEvent::MessageReceived(line) => {
                self.state.log_message(&format!("Received: {}", line));
                self.handle_line(&line)
            }
        }
    }

    /// Decode and apply one received line.
    fn handle_line(&mut self, line: &str) -> bool {
        let message = match Message::from_line(line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping unparseable message {:?}: {}", line, e);
                return false;
            }
        };

        match message {
            Message::Status(status) => {
                info!("Robot status: {}", status);
                self.state.set_robot_status(status);
                false
            }
            Message::Target {
                obstacle_id,
                target_id,
            } => self.handle_target(obstacle_id, &target_id),
            Message::Location { x, y, facing } => self.handle_location(x, y, facing),
            other => {
                debug!("Ignoring {:?} from robot", other.category());
                false
            }
        }
    }

    fn handle_target(&mut self, obstacle_id: u32, target_id: &str) -> bool {
        match self.arena.set_recognized_target(obstacle_id, target_id) {
            Ok(()) => {
                info!("Obstacle {} recognized as {}", obstacle_id, target_id);
                true
            }
            Err(ArenaError::LookupMiss(id)) => {
                warn!("Target {} reported for unknown obstacle {}", target_id, id);
                false
            }
            Err(e) => {
                warn!("Target update rejected: {}", e);
                false
            }
        }
    }

    fn handle_location(&mut self, x: i32, y: i32, facing: Direction) -> bool {
        match self.arena.update_robot(x, y, facing) {
            Ok(robot) => {
                debug!("Robot moved to {}", robot);
                true
            }
            Err(e) => {
                warn!("Robot update rejected: {}", e);
                false
            }
        }
    }
}
