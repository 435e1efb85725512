use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::DataDeviceState;
use crate::core::data::device::Selection;
use crate::core::data::events::{CancelReason, DataDeviceEvent, SelectionKind};
use crate::core::data::ids::{ClientKey, SeatId, SourceId};
use crate::core::data::metadata::SourceMetadata;
use crate::core::data::source::DataSource;
use crate::core::errors::{DataDeviceError, Result};
use crate::util::logging::DATA_DEVICE;

impl DataDeviceState {
    pub fn create_source(&mut self, client: ClientKey) -> SourceId {
        let id = SourceId(self.source_ids.next());
        self.sources.insert(id, DataSource::new(id, client));
        self.queue.emit(DataDeviceEvent::NewSource { source: id, client });
        tracing::debug!("{} created {}", client, id);
        id
    }

    pub fn source_offer(&mut self, source: SourceId, mime_type: String) -> Result<()> {
        tracing::debug!("{} offers mime type {}", source, mime_type);
        self.sources
            .get_mut(&source)
            .ok_or(DataDeviceError::SourceGone(source))?
            .offer_mime_type(mime_type)
    }

    pub fn source_set_actions(&mut self, source: SourceId, actions: DndAction) -> Result<()> {
        tracing::debug!("{} set dnd actions {:?}", source, actions);
        self.sources
            .get_mut(&source)
            .ok_or(DataDeviceError::SourceGone(source))?
            .set_actions(actions)
    }

    /// Access the metadata of a data source.
    ///
    /// `reader` sees the snapshot current at the time of the call.
    pub fn with_source_metadata<T, F>(&self, source: SourceId, reader: F) -> Result<T>
    where
        F: FnOnce(&SourceMetadata) -> T,
    {
        self.sources
            .get(&source)
            .map(|s| reader(s.metadata()))
            .ok_or(DataDeviceError::SourceGone(source))
    }

    /// The client destroyed a source, or its owner went away.
    ///
    /// Anything built on top of it is torn down before this returns: the
    /// selection it backed is cleared and a drag it backed is cancelled.
    pub fn destroy_source(&mut self, source: SourceId) -> Result<()> {
        let removed = self.sources.remove(&source).ok_or(DataDeviceError::SourceGone(source))?;
        tracing::debug!(target: DATA_DEVICE, "{} destroyed (usage {:?})", source, removed.usage);

        let seats: Vec<SeatId> = self.seats.keys().copied().collect();
        for seat in seats {
            self.release_source_on_seat(seat, source);
        }
        self.offers.retain(|_, offer| offer.source() != Some(source));
        Ok(())
    }

    fn release_source_on_seat(&mut self, seat: SeatId, source: SourceId) {
        let Some(dev) = self.seats.get_mut(&seat) else {
            return;
        };

        if dev.selection_source() == Some(source) {
            dev.selection = None;
            self.refresh_selection_offer(seat);
            self.queue.emit(DataDeviceEvent::SelectionChanged {
                seat,
                selection: SelectionKind::Cleared,
            });
        }

        let Some(dev) = self.seats.get_mut(&seat) else {
            return;
        };
        if dev.active_drag.as_ref().and_then(|s| s.source()) == Some(source) {
            if let Some(session) = dev.active_drag.take() {
                self.cancel_session(session, CancelReason::SourceDestroyed);
            }
        }

        if let Some(dev) = self.seats.get_mut(&seat) {
            dev.dropped.retain(|offer, session| {
                let keep = session.source() != Some(source);
                if !keep {
                    tracing::debug!("{} lost its source before finishing", offer);
                }
                keep
            });
        }
    }

    /// Whether `source` is currently the selection of any seat.
    pub fn is_selection(&self, source: SourceId) -> bool {
        self.seats
            .values()
            .any(|dev| matches!(dev.selection, Some(Selection::Client(id)) if id == source))
    }
}
