//! Data device state.
//!
//! `DataDeviceState` owns every source, offer and seat of the data device
//! in id-keyed tables. Offers and sessions refer to sources by id only, so
//! destroying a source is a table removal followed by cancellation of
//! whatever still pointed at it.
//!
//! The impl is split by concern:
//! - `sources`: source creation, metadata updates, destruction
//! - `selection`: clipboard and selection focus
//! - `dnd`: drag sessions, focus, motion, drop
//! - `offers`: requests made by recipients on their offers

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::action::{ActionChooser, Modifiers};
use super::device::{DeviceBinding, SeatDataDevice};
use super::events::{ClientMessage, DataDeviceEvent, EventQueue, ServerDndEvent};
use super::ids::{ClientKey, IdCounter, OfferId, SeatId, SourceId, SurfaceKey};
use super::metadata::SourceMetadata;
use super::offer::{DataOffer, OfferBacking, OfferKind};
use super::source::DataSource;
use crate::core::config::DataDeviceConfig;
use crate::core::errors::{DataDeviceError, Result};
use crate::core::surface::role::{RoleRegistry, SurfaceRoles};
use crate::core::traits::ProtocolState;
use crate::util::logging::DATA_DEVICE;

mod dnd;
mod offers;
mod selection;
mod sources;

pub struct DataDeviceState {
    config: DataDeviceConfig,
    seats: HashMap<SeatId, SeatDataDevice>,
    sources: HashMap<SourceId, DataSource>,
    offers: HashMap<OfferId, DataOffer>,
    chooser: ActionChooser,
    roles: Box<dyn RoleRegistry>,
    queue: EventQueue,
    seat_ids: IdCounter,
    source_ids: IdCounter,
    offer_ids: IdCounter,
    session_ids: IdCounter,
}

impl fmt::Debug for DataDeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataDeviceState")
            .field("seats", &self.seats)
            .field("sources", &self.sources)
            .field("offers", &self.offers)
            .finish_non_exhaustive()
    }
}

impl Default for DataDeviceState {
    fn default() -> Self {
        Self::new(DataDeviceConfig::default())
    }
}

impl DataDeviceState {
    pub fn new(config: DataDeviceConfig) -> Self {
        Self::with_roles(config, Box::new(SurfaceRoles::new()))
    }

    /// Use an external surface role registry.
    pub fn with_roles(config: DataDeviceConfig, roles: Box<dyn RoleRegistry>) -> Self {
        let chooser = config.action_policy.into_chooser();
        Self {
            config,
            seats: HashMap::new(),
            sources: HashMap::new(),
            offers: HashMap::new(),
            chooser,
            roles,
            queue: EventQueue::default(),
            seat_ids: IdCounter::default(),
            source_ids: IdCounter::default(),
            offer_ids: IdCounter::default(),
            session_ids: IdCounter::default(),
        }
    }

    pub fn config(&self) -> &DataDeviceConfig {
        &self.config
    }

    /// Replace the action chooser used for every later negotiation.
    pub fn set_action_chooser<F>(&mut self, chooser: F)
    where
        F: Fn(DndAction, DndAction, Modifiers) -> DndAction + 'static,
    {
        self.chooser = Box::new(chooser);
    }

    pub fn roles(&self) -> &dyn RoleRegistry {
        self.roles.as_ref()
    }

    pub fn roles_mut(&mut self) -> &mut dyn RoleRegistry {
        self.roles.as_mut()
    }

    /// A surface went away. A drag using it as icon keeps going without one.
    pub fn surface_destroyed(&mut self, surface: SurfaceKey) {
        self.roles.surface_destroyed(surface);
        for dev in self.seats.values_mut() {
            if let Some(session) = dev.active_drag.as_mut() {
                if session.icon == Some(surface) {
                    session.icon = None;
                }
            }
        }
    }

    // =========================================================================
    // Seats and devices
    // =========================================================================

    /// Initialize the data device of a new seat.
    pub fn init_data_device(&mut self, name: &str) -> SeatId {
        let id = SeatId(self.seat_ids.next());
        self.seats.insert(id, SeatDataDevice::new(id, name));
        tracing::info!(target: DATA_DEVICE, "Initialized data device for {} ({})", id, name);
        id
    }

    pub fn seat(&self, seat: SeatId) -> Result<&SeatDataDevice> {
        self.seats.get(&seat).ok_or(DataDeviceError::UnknownSeat(seat))
    }

    fn seat_mut(&mut self, seat: SeatId) -> Result<&mut SeatDataDevice> {
        self.seats.get_mut(&seat).ok_or(DataDeviceError::UnknownSeat(seat))
    }

    pub fn seats(&self) -> impl Iterator<Item = &SeatDataDevice> {
        self.seats.values()
    }

    /// A client created a `wl_data_device` for `seat`.
    pub fn register_data_device(&mut self, seat: SeatId, client: ClientKey, version: u32) -> Result<()> {
        let dev = self.seat_mut(seat)?;
        let binding = dev
            .devices
            .entry(client)
            .or_insert(DeviceBinding { version, count: 0 });
        binding.count += 1;
        let first = binding.count == 1;
        let focused = dev.focus == Some(client);
        tracing::debug!("{} bound a data device on {} (v{})", client, seat, version);

        if first && focused {
            self.refresh_selection_offer(seat);
        }
        Ok(())
    }

    /// A client released one of its `wl_data_device` objects for `seat`.
    pub fn unregister_data_device(&mut self, seat: SeatId, client: ClientKey) -> Result<()> {
        let dev = self.seat_mut(seat)?;
        let Some(binding) = dev.devices.get_mut(&client) else {
            return Ok(());
        };
        binding.count = binding.count.saturating_sub(1);
        if binding.count > 0 {
            return Ok(());
        }
        dev.devices.remove(&client);
        tracing::debug!("{} has no data device left on {}", client, seat);
        self.forget_recipient(seat, client);
        Ok(())
    }

    /// Drop everything `client` was being offered on `seat`, without
    /// sending it anything.
    fn forget_recipient(&mut self, seat: SeatId, client: ClientKey) {
        let Some(dev) = self.seats.get_mut(&seat) else {
            return;
        };
        if dev.focus == Some(client) {
            if let Some(offer) = dev.selection_offer.take() {
                self.offers.remove(&offer);
            }
        }
        let drag_focused = dev
            .active_drag
            .as_ref()
            .and_then(|session| session.focus)
            .is_some_and(|focus| focus.client == client);
        if drag_focused {
            if let Some(mut session) = dev.active_drag.take() {
                self.leave_focus(&mut session, false);
                self.put_drag(session);
            }
        }
    }

    // =========================================================================
    // Offers
    // =========================================================================

    pub fn offer(&self, offer: OfferId) -> Option<&DataOffer> {
        self.offers.get(&offer)
    }

    pub fn source(&self, source: SourceId) -> Option<&DataSource> {
        self.sources.get(&source)
    }

    /// Create an offer for `recipient` if it has a data device on `seat`,
    /// and queue its announcement.
    fn create_offer(
        &mut self,
        seat: SeatId,
        recipient: ClientKey,
        backing: OfferBacking,
        kind: OfferKind,
        metadata: Arc<SourceMetadata>,
    ) -> Option<OfferId> {
        let version = self.seats.get(&seat)?.device_version(recipient)?;
        let legacy = version < 3;
        let id = OfferId(self.offer_ids.next());

        let source_actions = match kind {
            OfferKind::Drag(_) if !legacy => metadata.dnd_action,
            _ => DndAction::empty(),
        };
        self.queue.send(ClientMessage::DataOffer {
            seat,
            client: recipient,
            offer: id,
            mime_types: metadata.mime_types.clone(),
            source_actions,
        });
        self.offers
            .insert(id, DataOffer::new(id, seat, recipient, backing, kind, metadata, legacy));
        tracing::debug!("Created {} for {} on {}", id, recipient, seat);
        Some(id)
    }

    // =========================================================================
    // Event channel
    // =========================================================================

    pub fn take_events(&mut self) -> Vec<DataDeviceEvent> {
        self.queue.take_events()
    }

    pub fn take_server_events(&mut self) -> Vec<ServerDndEvent> {
        self.queue.take_server_events()
    }

    pub fn take_client_messages(&mut self) -> Vec<ClientMessage> {
        self.queue.take_client_messages()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.queue.is_empty()
    }
}

impl ProtocolState for DataDeviceState {
    type Client = ClientKey;

    /// Tear down everything a disconnected client owned or was offered,
    /// cancelling drags that depended on it.
    fn client_disconnected(&mut self, client: ClientKey) {
        tracing::info!(target: DATA_DEVICE, "{} disconnected, cleaning up data device state", client);

        let owned: Vec<SourceId> = self
            .sources
            .values()
            .filter(|source| source.client == client)
            .map(|source| source.id)
            .collect();
        for source in owned {
            let _ = self.destroy_source(source);
        }

        let seats: Vec<SeatId> = self.seats.keys().copied().collect();
        for seat in seats {
            self.cancel_drags_from(seat, client);

            let abandoned: Vec<OfferId> = self.seats[&seat]
                .dropped
                .keys()
                .filter(|offer| self.offers.get(offer).is_some_and(|o| o.recipient == client))
                .copied()
                .collect();
            for offer in abandoned {
                let _ = self.destroy_offer(offer);
            }

            self.forget_recipient(seat, client);
            if let Some(dev) = self.seats.get_mut(&seat) {
                dev.devices.remove(&client);
                if dev.focus == Some(client) {
                    dev.focus = None;
                }
            }
        }

        self.offers.retain(|_, offer| offer.recipient != client);
    }
}

#[cfg(test)]
mod tests;
