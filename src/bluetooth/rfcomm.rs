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

//! Bluetooth RFCOMM transport backed by BlueZ.

use async_trait::async_trait;
use bluer::rfcomm::{Profile, Role, SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::transport::{BoxedStream, Peer, Transport};
use crate::config::BluetoothConfig;
use crate::error::LinkError;

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Map a BlueZ error onto the link taxonomy.
fn map_bluer(err: bluer::Error) -> LinkError {
    match err.kind {
        bluer::ErrorKind::NotAuthorized | bluer::ErrorKind::NotPermitted => {
            LinkError::PermissionDenied(err.to_string())
        }
        _ => LinkError::TransportUnavailable(err.to_string()),
    }
}

/// RFCOMM serial-port transport on the default adapter.
pub struct RfcommTransport {
    session: Session,
    adapter: Adapter,
    service_name: String,
    channel: u8,
}

impl RfcommTransport {
    /// Connect to BlueZ and prepare the default adapter.
    pub async fn new(config: &BluetoothConfig) -> Result<Self, LinkError> {
        info!("Initializing Bluetooth transport...");

        // Create BlueZ session
        let session = Session::new().await.map_err(map_bluer)?;
        info!("BlueZ session created");

        // Get the default adapter
        let adapter = session.default_adapter().await.map_err(map_bluer)?;
        info!("Using Bluetooth adapter: {}", adapter.name());

        // Ensure adapter is powered on
        if !adapter.is_powered().await.map_err(map_bluer)? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await.map_err(map_bluer)?;
        }

        adapter
            .set_alias(config.device_name.clone())
            .await
            .map_err(map_bluer)?;
        adapter.set_pairable(true).await.map_err(map_bluer)?;
        info!("Bluetooth name set to: {}", config.device_name);

        Ok(Self {
            session,
            adapter,
            service_name: config.service_name.clone(),
            channel: config.channel,
        })
    }

    /// Alias of a known device, falling back to its address.
    async fn peer_for(&self, address: Address) -> Peer {
        let name = match self.adapter.device(address) {
            Ok(device) => device.alias().await.unwrap_or_default(),
            Err(e) => {
                debug!("No device record for {}: {}", address, e);
                String::new()
            }
        };
        Peer::new(name, address.to_string())
    }

    fn server_profile(&self) -> Profile {
        Profile {
            uuid: SPP_UUID,
            name: Some(self.service_name.clone()),
            channel: Some(u16::from(self.channel)),
            role: Some(Role::Server),
            require_authentication: Some(false),
            require_authorization: Some(false),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Transport for RfcommTransport {
    fn name(&self) -> &'static str {
        "RFCOMM"
    }

    async fn accept(&self) -> Result<(BoxedStream, Peer), LinkError> {
        // Registering the profile publishes the SDP record; dropping the
        // handle withdraws it.
        let mut handle = self
            .session
            .register_profile(self.server_profile())
            .await
            .map_err(map_bluer)?;
        info!(
            "Listening for {} (UUID: {}) on channel {}",
            self.service_name, SPP_UUID, self.channel
        );

        let request = handle.next().await.ok_or_else(|| {
            LinkError::TransportUnavailable("profile registration closed".to_string())
        })?;
        let address = request.device();
        let stream = request
            .accept()
            .map_err(|e| LinkError::ConnectFailed(e.to_string()))?;
        drop(handle);

        info!("Connection from: {}", address);
        Ok((Box::new(stream), self.peer_for(address).await))
    }

    async fn connect(&self, peer: &Peer) -> Result<BoxedStream, LinkError> {
        let address: Address = peer
            .address
            .parse()
            .map_err(|e| LinkError::ConnectFailed(format!("{}: {}", peer.address, e)))?;

        info!("Connecting to {} on channel {}", peer, self.channel);
        let stream = Stream::connect(SocketAddr::new(address, self.channel))
            .await
            .map_err(|e| LinkError::from_connect_io(&e))?;
        Ok(Box::new(stream))
    }

    async fn paired_peers(&self) -> Result<Vec<Peer>, LinkError> {
        let mut peers = Vec::new();

        for address in self.adapter.device_addresses().await.map_err(map_bluer)? {
            let device = match self.adapter.device(address) {
                Ok(device) => device,
                Err(e) => {
                    warn!("Skipping device {}: {}", address, e);
                    continue;
                }
            };
            if device.is_paired().await.unwrap_or(false) {
                let name = device.alias().await.unwrap_or_else(|_| address.to_string());
                peers.push(Peer::new(name, address.to_string()));
            }
        }

        Ok(peers)
    }
}
