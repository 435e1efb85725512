use std::sync::Arc;

use super::DataDeviceState;
use crate::core::data::device::Selection;
use crate::core::data::events::{ClientMessage, DataDeviceEvent, SelectionKind};
use crate::core::data::ids::{ClientKey, SeatId, SourceId};
use crate::core::data::metadata::SourceMetadata;
use crate::core::data::offer::{OfferBacking, OfferKind};
use crate::core::data::source::SourceUsage;
use crate::core::data::transport::{BoxedProvider, ContentProvider};
use crate::core::errors::{DataDeviceError, ProtocolViolation, Result};
use crate::util::logging::SELECTION;

impl DataDeviceState {
    /// Set the selection of `seat` to a client source, or clear it.
    ///
    /// A source that was the selection before and still exists is told it
    /// was cancelled.
    pub fn set_data_device_selection(&mut self, seat: SeatId, source: Option<SourceId>) -> Result<()> {
        self.seat(seat)?;
        if let Some(id) = source {
            let src = self.sources.get(&id).ok_or(DataDeviceError::SourceGone(id))?;
            match src.usage {
                SourceUsage::Unused => {}
                SourceUsage::Selection(on) if on == seat => {}
                _ => return Err(ProtocolViolation::InvalidSource(id).into()),
            }
        }
        self.replace_selection(seat, source.map(Selection::Client))
    }

    /// Set a compositor-provided selection for this seat.
    ///
    /// Reads from clients are served synchronously by `provider`.
    pub fn set_compositor_selection<P>(&mut self, seat: SeatId, metadata: SourceMetadata, provider: P) -> Result<()>
    where
        P: ContentProvider + 'static,
    {
        self.seat(seat)?;
        let selection = Selection::Compositor {
            metadata: Arc::new(metadata),
            provider: BoxedProvider(Box::new(provider)),
        };
        self.replace_selection(seat, Some(selection))
    }

    /// Set the data device focus to a certain client for a given seat.
    ///
    /// The previous client's selection offer is withdrawn before the new
    /// client gets its own.
    pub fn set_data_device_focus(&mut self, seat: SeatId, client: Option<ClientKey>) -> Result<()> {
        let dev = self.seat_mut(seat)?;
        if dev.focus == client {
            return Ok(());
        }
        tracing::debug!(target: SELECTION, "{} selection focus {:?} -> {:?}", seat, dev.focus, client);
        dev.focus = client;
        self.refresh_selection_offer(seat);
        Ok(())
    }

    fn replace_selection(&mut self, seat: SeatId, selection: Option<Selection>) -> Result<()> {
        let new_source = selection.as_ref().and_then(Selection::source);
        let kind = match &selection {
            None => SelectionKind::Cleared,
            Some(Selection::Client(id)) => SelectionKind::Client(*id),
            Some(Selection::Compositor { .. }) => SelectionKind::Compositor,
        };

        let dev = self.seat_mut(seat)?;
        let previous = std::mem::replace(&mut dev.selection, selection);

        if let Some(old) = previous.as_ref().and_then(Selection::source) {
            if Some(old) != new_source {
                if let Some(src) = self.sources.get_mut(&old) {
                    src.usage = SourceUsage::Unused;
                    self.queue.send(ClientMessage::SourceCancelled { source: old });
                }
            }
        }
        if let Some(src) = new_source.and_then(|id| self.sources.get_mut(&id)) {
            src.usage = SourceUsage::Selection(seat);
        }

        self.refresh_selection_offer(seat);
        self.queue.emit(DataDeviceEvent::SelectionChanged { seat, selection: kind });
        tracing::info!(target: SELECTION, "{} selection is now {:?}", seat, kind);
        Ok(())
    }

    /// Withdraw the current selection offer and, if a focused client has a
    /// data device, hand it a fresh one (or tell it there is no selection).
    pub(super) fn refresh_selection_offer(&mut self, seat: SeatId) {
        let Some(dev) = self.seats.get_mut(&seat) else {
            return;
        };
        if let Some(old) = dev.selection_offer.take() {
            self.offers.remove(&old);
        }

        let Some(dev) = self.seats.get(&seat) else {
            return;
        };
        let Some(client) = dev.focus.filter(|client| dev.has_device(*client)) else {
            return;
        };
        let content = match &dev.selection {
            None => None,
            Some(Selection::Client(id)) => self
                .sources
                .get(id)
                .map(|src| (OfferBacking::Source(*id), src.snapshot())),
            Some(Selection::Compositor { metadata, .. }) => {
                Some((OfferBacking::CompositorSelection, Arc::clone(metadata)))
            }
        };

        let offer = content.and_then(|(backing, metadata)| {
            self.create_offer(seat, client, backing, OfferKind::Selection, metadata)
        });
        if let Some(dev) = self.seats.get_mut(&seat) {
            dev.selection_offer = offer;
        }
        self.queue.send(ClientMessage::Selection { seat, client, offer });
    }
}
