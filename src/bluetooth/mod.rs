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

//! Bluetooth communication module.
//!
//! Handles the serial link to the robot and the messages sent over it.

mod connection;
mod protocol;
mod rfcomm;
mod server;
mod transport;

pub use connection::{ConnectionEvent, ConnectionHandler, ConnectionState, MAX_LINE_BYTES};
pub use protocol::{
    Category, Message, Movement, ObstacleBatch, ObstacleRecord, CONTROL_START, DEFAULT_MODE,
    LINE_DELIMITER,
};
pub use rfcomm::{RfcommTransport, SPP_UUID};
pub use server::{BluetoothManager, LinkSettings};
pub use transport::{BoxedStream, LinkStream, Peer, Transport};
