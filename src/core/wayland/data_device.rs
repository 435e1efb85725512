//! wl_data_device_manager and related protocols implementation
//!
//! The data device manager handles clipboard operations and drag-and-drop.
//! Requests are forwarded to `CompositorState`, which drives the
//! selection/drag state machine and flushes the resulting events.

use std::collections::HashMap;
use std::os::unix::io::{AsFd, OwnedFd};

use wayland_server::{
    backend::{ClientId, GlobalId},
    protocol::{
        wl_data_device::{self, WlDataDevice},
        wl_data_device_manager::{self, DndAction, WlDataDeviceManager},
        wl_data_offer::{self, WlDataOffer},
        wl_data_source::{self, WlDataSource},
    },
    Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource,
};

use crate::core::data::ids::{ClientKey, OfferId, SeatId, SourceId};
use crate::core::data::transport::{DataTransport, TransportError};
use crate::core::state::CompositorState;

/// User data of a `wl_data_device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceData {
    pub seat: SeatId,
    pub client: ClientKey,
}

/// Forwards reads to the client owning the source.
pub struct WaylandTransport<'a> {
    sources: &'a HashMap<SourceId, WlDataSource>,
}

impl<'a> WaylandTransport<'a> {
    pub fn new(sources: &'a HashMap<SourceId, WlDataSource>) -> Self {
        Self { sources }
    }
}

impl DataTransport for WaylandTransport<'_> {
    fn send(&mut self, source: SourceId, mime_type: &str, fd: OwnedFd, action: DndAction) -> Result<(), TransportError> {
        let resource = self
            .sources
            .get(&source)
            .filter(|resource| resource.is_alive())
            .ok_or(TransportError::SourceUnavailable(source))?;
        tracing::debug!("Asking {} for {} ({:?})", source, mime_type, action);
        resource.send(mime_type.to_string(), fd.as_fd());
        Ok(())
    }
}

// ============================================================================
// wl_data_device_manager implementation
// ============================================================================

impl GlobalDispatch<WlDataDeviceManager, ()> for CompositorState {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlDataDeviceManager>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<WlDataDeviceManager, ()> for CompositorState {
    fn request(
        state: &mut Self,
        client: &Client,
        _resource: &WlDataDeviceManager,
        request: wl_data_device_manager::Request,
        _data: &(),
        dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            wl_data_device_manager::Request::CreateDataSource { id } => {
                let key = state.client_key(&client.id());
                let source = state.data.create_source(key);
                let resource = data_init.init(id, source);
                state.add_data_source(source, resource);
            }
            wl_data_device_manager::Request::GetDataDevice { id, seat } => {
                let data = DeviceData {
                    seat: state.seat_of(&seat),
                    client: state.client_key(&client.id()),
                };
                let device = data_init.init(id, data);
                state.add_data_device(data, device);
                tracing::debug!("Created data device for {}", data.seat);
            }
            _ => {}
        }
        state.flush_data_device(dhandle);
    }
}

// ============================================================================
// wl_data_source implementation
// ============================================================================

impl Dispatch<WlDataSource, SourceId> for CompositorState {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &WlDataSource,
        request: wl_data_source::Request,
        data: &SourceId,
        dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        state.handle_source_request(resource, *data, request);
        state.flush_data_device(dhandle);
    }

    fn destroyed(state: &mut Self, _client: ClientId, _resource: &WlDataSource, data: &SourceId) {
        state.source_destroyed(*data);
    }
}

// ============================================================================
// wl_data_device implementation
// ============================================================================

impl Dispatch<WlDataDevice, DeviceData> for CompositorState {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &WlDataDevice,
        request: wl_data_device::Request,
        data: &DeviceData,
        dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        state.handle_device_request(resource, data, request);
        state.flush_data_device(dhandle);
    }

    fn destroyed(state: &mut Self, _client: ClientId, resource: &WlDataDevice, data: &DeviceData) {
        state.device_destroyed(resource, data);
    }
}

// ============================================================================
// wl_data_offer implementation
// ============================================================================

impl Dispatch<WlDataOffer, OfferId> for CompositorState {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &WlDataOffer,
        request: wl_data_offer::Request,
        data: &OfferId,
        dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        state.handle_offer_request(resource, *data, request);
        state.flush_data_device(dhandle);
    }

    fn destroyed(state: &mut Self, _client: ClientId, _resource: &WlDataOffer, data: &OfferId) {
        state.offer_destroyed(*data);
    }
}

/// Register wl_data_device_manager global
pub fn register_data_device_manager(display: &DisplayHandle, version: u32) -> GlobalId {
    display.create_global::<CompositorState, WlDataDeviceManager, ()>(version.clamp(1, 3), ())
}
