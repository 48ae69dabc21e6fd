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

//! Application state management.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Connection status as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Listening,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Listening => "Listening",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Error",
        }
    }
}

/// Bounded, newest-first message log.
#[derive(Debug)]
pub struct MessageLog {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl MessageLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines),
            max_lines,
        }
    }

    /// Prepend `text` stamped with `at`, dropping the oldest line when full.
    pub fn push_at(&mut self, at: DateTime<Local>, text: &str) {
        if self.max_lines == 0 {
            return;
        }
        self.lines
            .push_front(format!("[{}] {}", at.format("%H:%M:%S"), text));
        self.lines.truncate(self.max_lines);
    }

    pub fn push(&mut self, text: &str) {
        self.push_at(Local::now(), text);
    }

    /// Lines, newest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current connection status.
    pub connection_status: RwLock<ConnectionStatus>,

    /// Connected peer name.
    pub connected_device: RwLock<Option<String>>,

    /// Last status text reported by the robot.
    pub robot_status: RwLock<Option<String>>,

    /// Whether tilt control is enabled.
    pub tilt_enabled: RwLock<bool>,

    /// Recent sent and received messages.
    pub message_log: RwLock<MessageLog>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_log_capacity(20)
    }
}

impl AppState {
    pub fn new(max_log_lines: usize) -> Arc<Self> {
        Arc::new(Self::with_log_capacity(max_log_lines))
    }

    fn with_log_capacity(max_lines: usize) -> Self {
        Self {
            connection_status: RwLock::new(ConnectionStatus::Disconnected),
            connected_device: RwLock::new(None),
            robot_status: RwLock::new(None),
            tilt_enabled: RwLock::new(false),
            message_log: RwLock::new(MessageLog::new(max_lines)),
        }
    }

    pub fn set_connected(&self, device_name: String) {
        *self.connection_status.write() = ConnectionStatus::Connected;
        *self.connected_device.write() = Some(device_name);
    }

    pub fn set_disconnected(&self) {
        *self.connection_status.write() = ConnectionStatus::Disconnected;
        *self.connected_device.write() = None;
        // Tilt only runs while connected.
        *self.tilt_enabled.write() = false;
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        *self.connection_status.write() = status;
    }

    pub fn set_error(&self) {
        *self.connection_status.write() = ConnectionStatus::Error;
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.connection_status.read()
    }

    pub fn is_connected(&self) -> bool {
        self.get_status() == ConnectionStatus::Connected
    }

    pub fn get_device_name(&self) -> Option<String> {
        self.connected_device.read().clone()
    }

    pub fn set_robot_status(&self, status: String) {
        *self.robot_status.write() = Some(status);
    }

    pub fn get_robot_status(&self) -> Option<String> {
        self.robot_status.read().clone()
    }

    /// Enable or disable tilt control. Enabling requires a connection.
    pub fn set_tilt_enabled(&self, enabled: bool) -> bool {
        let allowed = !enabled || self.is_connected();
        if allowed {
            *self.tilt_enabled.write() = enabled;
        }
        allowed
    }

    pub fn is_tilt_enabled(&self) -> bool {
        *self.tilt_enabled.read()
    }

    pub fn log_message(&self, text: &str) {
        self.message_log.write().push(text);
    }

    /// Snapshot of the message log, newest first.
    pub fn log_lines(&self) -> Vec<String> {
        self.message_log.read().lines().map(str::to_string).collect()
    }
}
