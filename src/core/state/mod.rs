//! Global compositor state.
//!
//! `CompositorState` is the `wayland-server` dispatch target. It owns the
//! protocol-independent `DataDeviceState` plus the tables that map the
//! core's plain identifiers back to live protocol objects.

use std::collections::HashMap;

use wayland_server::backend::{ClientData, ClientId, DisconnectReason};
use wayland_server::protocol::{
    wl_data_device::WlDataDevice, wl_data_offer::WlDataOffer, wl_data_source::WlDataSource,
    wl_surface::WlSurface,
};
use wayland_server::{Client, Resource};

use crate::core::config::DataDeviceConfig;
use crate::core::data::ids::{ClientKey, IdCounter, OfferId, SeatId, SourceId, SurfaceKey};
use crate::core::data::DataDeviceState;
use crate::core::traits::ProtocolState;
use crate::util::logging::WAYLAND;

mod data_device;
mod flush;

// ============================================================================
// Client State
// ============================================================================

/// Data stored with each Wayland client
#[derive(Debug, Default, Clone)]
pub struct ClientState;

impl ClientData for ClientState {
    fn initialized(&self, client_id: ClientId) {
        tracing::info!(target: WAYLAND, "Client initialized: {:?}", client_id);
    }

    fn disconnected(&self, client_id: ClientId, reason: DisconnectReason) {
        let reason_str = match reason {
            DisconnectReason::ConnectionClosed => "connection closed",
            DisconnectReason::ProtocolError(_) => "protocol error",
        };
        tracing::info!(target: WAYLAND, "Client disconnected: {:?} ({})", client_id, reason_str);
    }
}

// ============================================================================
// Protocol object tables
// ============================================================================

/// Live protocol objects backing the core's identifiers.
#[derive(Debug, Default)]
pub struct DataResources {
    pub sources: HashMap<SourceId, WlDataSource>,
    pub offers: HashMap<OfferId, WlDataOffer>,
    pub devices: HashMap<(SeatId, ClientKey), Vec<WlDataDevice>>,
}

impl DataResources {
    /// The device events for `client` on `seat` are sent on.
    pub fn device(&self, seat: SeatId, client: ClientKey) -> Option<&WlDataDevice> {
        self.devices
            .get(&(seat, client))
            .and_then(|devices| devices.iter().find(|device| device.is_alive()))
    }

    pub fn remove_device(&mut self, seat: SeatId, client: ClientKey, device: &WlDataDevice) {
        if let Some(devices) = self.devices.get_mut(&(seat, client)) {
            devices.retain(|d| d != device);
            if devices.is_empty() {
                self.devices.remove(&(seat, client));
            }
        }
    }
}

pub struct CompositorState {
    /// Selection and drag'n'drop state machine
    pub data: DataDeviceState,

    /// Seat created at startup
    pub seat: SeatId,

    pub resources: DataResources,

    /// Surfaces known to the compositor, by core key
    pub surfaces: HashMap<SurfaceKey, WlSurface>,

    clients: HashMap<ClientId, ClientKey>,
    client_ids: IdCounter,
    surface_ids: IdCounter,
    serial: u32,
}

impl CompositorState {
    pub fn new(config: Option<DataDeviceConfig>) -> Self {
        let config = config.unwrap_or_default();
        let seat_name = config.seat_name.clone();
        let mut data = DataDeviceState::new(config);
        let seat = data.init_data_device(&seat_name);

        Self {
            data,
            seat,
            resources: DataResources::default(),
            surfaces: HashMap::new(),
            clients: HashMap::new(),
            client_ids: IdCounter::default(),
            surface_ids: IdCounter::default(),
            serial: 0,
        }
    }

    /// Generate next serial for Wayland events
    pub fn next_serial(&mut self) -> u32 {
        let serial = self.serial;
        self.serial = self.serial.wrapping_add(1);
        serial
    }

    /// Stable core key for a client, assigned on first sight.
    pub fn client_key(&mut self, client: &ClientId) -> ClientKey {
        if let Some(key) = self.clients.get(client) {
            return *key;
        }
        let key = ClientKey(self.client_ids.next());
        self.clients.insert(client.clone(), key);
        key
    }

    /// Allocate the key for a new `wl_surface`.
    pub fn next_surface_key(&mut self) -> SurfaceKey {
        SurfaceKey(self.surface_ids.next())
    }

    pub fn surface_key(surface: &WlSurface) -> Option<SurfaceKey> {
        surface.data::<SurfaceKey>().copied()
    }

    /// Seat a protocol object belongs to, falling back to the startup seat.
    pub fn seat_of<R: Resource>(&self, resource: &R) -> SeatId {
        resource.data::<SeatId>().copied().unwrap_or(self.seat)
    }
}

impl ProtocolState for CompositorState {
    type Client = ClientId;

    fn client_disconnected(&mut self, client: ClientId) {
        let Some(key) = self.clients.remove(&client) else {
            return;
        };
        self.data.client_disconnected(key);

        let data = &self.data;
        self.resources.sources.retain(|id, _| data.source(*id).is_some());
        self.resources.offers.retain(|id, _| data.offer(*id).is_some());
        self.resources.devices.retain(|(_, owner), _| *owner != key);
        self.surfaces.retain(|_, surface| {
            surface.client().map_or(true, |c: Client| c.id() != client)
        });
    }
}
