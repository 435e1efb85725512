//! Data device requests and input hooks.
//!
//! Contains the `CompositorState` methods the `wl_data_*` dispatch impls
//! forward to, and the entry points the surrounding compositor calls when
//! keyboard or pointer focus changes.

use wayland_server::protocol::wl_data_device_manager::DndAction;
use wayland_server::protocol::{wl_data_device, wl_data_offer, wl_data_source};
use wayland_server::{Resource, WEnum};

use super::*;
use crate::core::data::action::Modifiers;
use crate::core::data::session::{DndState, DragTarget};
use crate::core::errors::{DataDeviceError, ProtocolViolation};
use crate::core::wayland::data_device::{DeviceData, WaylandTransport};
use crate::util::logging::{DATA_DEVICE, DND};

/// Action bits as sent by the client. Unknown bits are kept so the core
/// can reject them.
fn raw_actions(actions: WEnum<DndAction>) -> DndAction {
    match actions {
        WEnum::Value(actions) => actions,
        WEnum::Unknown(bits) => DndAction::from_bits_retain(bits),
    }
}

fn offer_error(violation: &ProtocolViolation) -> u32 {
    match violation {
        ProtocolViolation::InvalidFinish(_) => wl_data_offer::Error::InvalidFinish.into(),
        ProtocolViolation::InvalidActionMask(_) => wl_data_offer::Error::InvalidActionMask.into(),
        ProtocolViolation::InvalidAction => wl_data_offer::Error::InvalidAction.into(),
        ProtocolViolation::UnknownMimeType { .. }
        | ProtocolViolation::InvalidSource(_)
        | ProtocolViolation::InvalidOffer(_) => {
            wl_data_offer::Error::InvalidOffer.into()
        }
    }
}

fn source_error(violation: &ProtocolViolation) -> u32 {
    match violation {
        ProtocolViolation::InvalidActionMask(_) => wl_data_source::Error::InvalidActionMask.into(),
        _ => wl_data_source::Error::InvalidSource.into(),
    }
}

/// Log a failed request. Protocol violations are posted on `resource`.
fn report<R: Resource>(resource: &R, err: DataDeviceError, code: fn(&ProtocolViolation) -> u32) {
    match err {
        DataDeviceError::Protocol(violation) => {
            tracing::warn!(target: DATA_DEVICE, "Protocol error on {}: {}", resource.id(), violation);
            resource.post_error(code(&violation), violation.to_string());
        }
        err if err.is_benign() => {
            tracing::debug!(target: DATA_DEVICE, "Ignoring request on {}: {}", resource.id(), err);
        }
        err => {
            tracing::warn!(target: DATA_DEVICE, "Request on {} failed: {}", resource.id(), err);
        }
    }
}

impl CompositorState {
    // =========================================================================
    // Request handlers
    // =========================================================================

    /// Register a freshly created `wl_data_source`.
    ///
    /// Sources from a pre-v3 manager cannot set actions and behave as copy.
    pub fn add_data_source(&mut self, source: SourceId, resource: WlDataSource) {
        if resource.version() < 3 {
            if let Err(err) = self.data.source_set_actions(source, DndAction::Copy) {
                tracing::warn!(target: DATA_DEVICE, "Legacy {}: {}", source, err);
            }
        }
        self.resources.sources.insert(source, resource);
    }

    pub fn handle_source_request(&mut self, resource: &WlDataSource, source: SourceId, request: wl_data_source::Request) {
        let result = match request {
            wl_data_source::Request::Offer { mime_type } => self.data.source_offer(source, mime_type),
            wl_data_source::Request::SetActions { dnd_actions } => {
                self.data.source_set_actions(source, raw_actions(dnd_actions))
            }
            wl_data_source::Request::Destroy => Ok(()),
            _ => Ok(()),
        };
        if let Err(err) = result {
            report(resource, err, source_error);
        }
    }

    pub fn source_destroyed(&mut self, source: SourceId) {
        self.resources.sources.remove(&source);
        if let Err(err) = self.data.destroy_source(source) {
            tracing::debug!(target: DATA_DEVICE, "{}: {}", source, err);
        }
    }

    /// Register a freshly created `wl_data_device`.
    pub fn add_data_device(&mut self, data: DeviceData, resource: WlDataDevice) {
        if let Err(err) = self.data.register_data_device(data.seat, data.client, resource.version()) {
            tracing::warn!(target: DATA_DEVICE, "Cannot bind data device: {}", err);
            return;
        }
        self.resources
            .devices
            .entry((data.seat, data.client))
            .or_default()
            .push(resource);
    }

    pub fn handle_device_request(&mut self, resource: &WlDataDevice, data: &DeviceData, request: wl_data_device::Request) {
        match request {
            wl_data_device::Request::StartDrag { source, origin, icon, serial } => {
                let source_id = source.as_ref().and_then(|s| s.data::<SourceId>().copied());
                let origin_key = Self::surface_key(&origin);
                let icon_key = icon.as_ref().and_then(Self::surface_key);
                tracing::debug!(
                    target: DND,
                    "Start drag: serial={}, source={:?}, icon={:?}",
                    serial,
                    source_id,
                    icon_key
                );

                match self.data.start_dnd(data.seat, source_id, data.client, origin_key, icon_key) {
                    Ok(_) => {}
                    Err(err @ DataDeviceError::RoleConflict { .. }) => {
                        resource.post_error(wl_data_device::Error::Role, err.to_string());
                    }
                    Err(DataDeviceError::Protocol(violation)) => match &source {
                        Some(source) => report(source, violation.into(), source_error),
                        None => report(resource, violation.into(), source_error),
                    },
                    Err(err) => {
                        tracing::warn!(target: DND, "Drag refused: {}", err);
                        if let Some(source) = source.filter(|s| s.is_alive()) {
                            source.cancelled();
                        }
                    }
                }
            }
            wl_data_device::Request::SetSelection { source, serial } => {
                let source_id = source.as_ref().and_then(|s| s.data::<SourceId>().copied());
                tracing::debug!(target: DATA_DEVICE, "Set selection: serial={}, source={:?}", serial, source_id);
                if let Err(err) = self.data.set_data_device_selection(data.seat, source_id) {
                    match &source {
                        Some(source) => report(source, err, source_error),
                        None => report(resource, err, source_error),
                    }
                }
            }
            wl_data_device::Request::Release => {
                tracing::debug!(target: DATA_DEVICE, "Data device released");
            }
            _ => {}
        }
    }

    pub fn device_destroyed(&mut self, resource: &WlDataDevice, data: &DeviceData) {
        self.resources.remove_device(data.seat, data.client, resource);
        if let Err(err) = self.data.unregister_data_device(data.seat, data.client) {
            tracing::debug!(target: DATA_DEVICE, "{}", err);
        }
    }

    pub fn handle_offer_request(&mut self, resource: &WlDataOffer, offer: OfferId, request: wl_data_offer::Request) {
        let result = match request {
            wl_data_offer::Request::Accept { serial: _, mime_type } => self.data.offer_accept(offer, mime_type),
            wl_data_offer::Request::Receive { mime_type, fd } => {
                let mut transport = WaylandTransport::new(&self.resources.sources);
                self.data.offer_receive(offer, mime_type, fd, &mut transport)
            }
            wl_data_offer::Request::Finish => self.data.offer_finish(offer),
            wl_data_offer::Request::SetActions {
                dnd_actions,
                preferred_action,
            } => self
                .data
                .offer_set_actions(offer, raw_actions(dnd_actions), raw_actions(preferred_action)),
            wl_data_offer::Request::Destroy => Ok(()),
            _ => Ok(()),
        };
        if let Err(err) = result {
            report(resource, err, offer_error);
        }
    }

    pub fn offer_destroyed(&mut self, offer: OfferId) {
        self.resources.offers.remove(&offer);
        if let Err(err) = self.data.destroy_offer(offer) {
            tracing::trace!(target: DATA_DEVICE, "{}", err);
        }
    }

    // =========================================================================
    // Compositor entry points
    // =========================================================================

    /// Keyboard focus moved. The selection follows it.
    pub fn keyboard_focus(&mut self, surface: Option<&WlSurface>) {
        let client = surface.and_then(Resource::client).map(|client| self.client_key(&client.id()));
        if let Err(err) = self.data.set_data_device_focus(self.seat, client) {
            tracing::warn!(target: DATA_DEVICE, "Keyboard focus: {}", err);
        }
    }

    /// The pointer entered `surface` at surface-local `x`, `y`, or left
    /// every surface. Only matters while a drag is active.
    pub fn pointer_focus(&mut self, surface: Option<&WlSurface>, x: f64, y: f64) {
        if self.data.active_drag(self.seat).is_none() {
            return;
        }
        let target = match surface {
            Some(surface) => match (Self::surface_key(surface), surface.client()) {
                (Some(key), Some(client)) => {
                    Some(DragTarget::new(self.client_key(&client.id()), key, x, y))
                }
                _ => None,
            },
            None => None,
        };
        if let Err(err) = self.data.set_drag_focus(self.seat, target) {
            tracing::warn!(target: DND, "Pointer focus: {}", err);
        }
    }

    /// Pointer motion. Returns whether a drag consumed it.
    pub fn pointer_motion(&mut self, time: u32, x: f64, y: f64) -> bool {
        if self.data.active_drag(self.seat).is_none() {
            return false;
        }
        self.data.drag_motion(self.seat, time, x, y).is_ok()
    }

    /// The grabbing button was released. Returns how the drag ended, if
    /// one was active.
    pub fn pointer_released(&mut self) -> Option<DndState> {
        self.data.active_drag(self.seat)?;
        match self.data.drop_dnd(self.seat) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!(target: DND, "Drop failed: {}", err);
                None
            }
        }
    }

    pub fn keyboard_modifiers(&mut self, modifiers: Modifiers) {
        if let Err(err) = self.data.set_modifiers(self.seat, modifiers) {
            tracing::warn!(target: DND, "Modifiers: {}", err);
        }
    }
}
