use std::os::unix::io::OwnedFd;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::DataDeviceState;
use crate::core::data::device::Selection;
use crate::core::data::events::ClientMessage;
use crate::core::data::ids::OfferId;
use crate::core::data::offer::{OfferBacking, OfferKind};
use crate::core::data::session::{DndSession, DragOrigin};
use crate::core::data::transport::DataTransport;
use crate::core::errors::{DataDeviceError, ProtocolViolation, Result};

impl DataDeviceState {
    /// The recipient accepted a MIME type, or rejected the drag with `None`.
    pub fn offer_accept(&mut self, offer: OfferId, mime_type: Option<String>) -> Result<()> {
        let entry = self.offers.get_mut(&offer).ok_or(DataDeviceError::OfferGone(offer))?;
        entry.accept(mime_type.clone())?;
        tracing::debug!("{} accepted {:?}", offer, mime_type);

        if let (OfferKind::Drag(_), Some(source)) = (entry.kind, entry.source()) {
            if self.sources.contains_key(&source) {
                self.queue.send(ClientMessage::SourceTarget { source, mime_type });
            }
        }
        Ok(())
    }

    /// The recipient declared the actions it supports and the one it prefers.
    pub fn offer_set_actions(&mut self, offer: OfferId, actions: DndAction, preferred: DndAction) -> Result<()> {
        let entry = self.offers.get_mut(&offer).ok_or(DataDeviceError::OfferGone(offer))?;
        if entry.kind == OfferKind::Selection {
            return Err(ProtocolViolation::InvalidOffer(offer).into());
        }
        entry.set_actions(actions, preferred)?;
        let seat = entry.seat;
        tracing::debug!("{} set actions {:?}, preferred {:?}", offer, actions, preferred);

        let Some(dev) = self.seats.get_mut(&seat) else {
            return Ok(());
        };
        let current = dev
            .active_drag
            .as_ref()
            .is_some_and(|session| session.current_offer == Some(offer));
        if current {
            if let Some(mut session) = dev.active_drag.take() {
                self.recompute_action(&mut session);
                self.put_drag(session);
            }
        } else if let Some(mut session) = dev.dropped.remove(&offer) {
            self.recompute_action(&mut session);
            if let Some(dev) = self.seats.get_mut(&seat) {
                dev.dropped.insert(offer, session);
            }
        }
        Ok(())
    }

    /// The recipient wants the content in `mime_type`, written to `fd`.
    ///
    /// Client sources go through `transport`; compositor content is written
    /// by its provider before this returns. Unknown MIME types are ignored
    /// and the descriptor is closed.
    pub fn offer_receive(
        &mut self,
        offer: OfferId,
        mime_type: String,
        fd: OwnedFd,
        transport: &mut dyn DataTransport,
    ) -> Result<()> {
        let entry = self.offers.get(&offer).ok_or(DataDeviceError::OfferGone(offer))?;
        if !entry.advertised.offers(&mime_type) {
            tracing::warn!("{} asked for unadvertised mime type {}", offer, mime_type);
            return Ok(());
        }
        let seat = entry.seat;
        let backing = entry.backing;
        let action = match entry.kind {
            OfferKind::Selection => DndAction::empty(),
            OfferKind::Drag(_) => self
                .drag_session_for(offer)
                .map(|session| session.negotiated_action)
                .unwrap_or(DndAction::empty()),
        };
        tracing::debug!("{} receive {} ({:?})", offer, mime_type, action);

        match backing {
            OfferBacking::Source(source) => {
                if !self.sources.contains_key(&source) {
                    return Err(DataDeviceError::SourceGone(source));
                }
                transport.send(source, &mime_type, fd, action)?;
            }
            OfferBacking::ServerDrag => {
                let dev = self.seat_mut(seat)?;
                let session = match dev.active_drag.as_mut() {
                    Some(session) if session.current_offer == Some(offer) => Some(session),
                    _ => dev.dropped.get_mut(&offer),
                };
                if let Some(DragOrigin::Server { provider, .. }) = session.map(|s| &mut s.origin) {
                    provider.0.send(&mime_type, fd)?;
                }
            }
            OfferBacking::CompositorSelection => {
                let dev = self.seat_mut(seat)?;
                if let Some(Selection::Compositor { provider, .. }) = dev.selection.as_mut() {
                    provider.0.send(&mime_type, fd)?;
                }
            }
        }
        Ok(())
    }

    /// The recipient is done with a dropped offer.
    pub fn offer_finish(&mut self, offer: OfferId) -> Result<()> {
        let entry = self.offers.get(&offer).ok_or(DataDeviceError::OfferGone(offer))?;
        let seat = entry.seat;
        let accepted = entry.accepted_mime_type.is_some();

        let dev = self.seat_mut(seat)?;
        let resolved = dev.dropped.get(&offer).is_some_and(|session| {
            let action = session.negotiated_action;
            !action.is_empty() && action != DndAction::Ask
        });
        if !accepted || !resolved {
            return Err(ProtocolViolation::InvalidFinish(offer).into());
        }

        if let Some(session) = dev.dropped.remove(&offer) {
            self.offers.remove(&offer);
            self.complete_transfer(session);
        }
        Ok(())
    }

    /// The recipient destroyed its offer.
    pub fn destroy_offer(&mut self, offer: OfferId) -> Result<()> {
        let entry = self.offers.remove(&offer).ok_or(DataDeviceError::OfferGone(offer))?;
        tracing::debug!("{} destroyed by {}", offer, entry.recipient);

        let Some(dev) = self.seats.get_mut(&entry.seat) else {
            return Ok(());
        };
        if dev.selection_offer == Some(offer) {
            dev.selection_offer = None;
        }
        let current = dev
            .active_drag
            .as_ref()
            .is_some_and(|session| session.current_offer == Some(offer));
        if current {
            if let Some(mut session) = dev.active_drag.take() {
                session.current_offer = None;
                self.clear_target(&mut session, entry.accepted_mime_type.is_some());
                self.put_drag(session);
            }
            return Ok(());
        }

        if let Some(session) = dev.dropped.remove(&offer) {
            if entry.legacy && entry.accepted_mime_type.is_some() {
                self.complete_transfer(session);
            } else {
                self.abandon_transfer(session);
            }
        }
        Ok(())
    }

    fn drag_session_for(&self, offer: OfferId) -> Option<&DndSession> {
        let seat = self.offers.get(&offer)?.seat;
        let dev = self.seats.get(&seat)?;
        match dev.active_drag.as_ref() {
            Some(session) if session.current_offer == Some(offer) => Some(session),
            _ => dev.dropped.get(&offer),
        }
    }
}
