use std::sync::Arc;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::action::all_actions;
use super::ids::{ClientKey, OfferId, SeatId, SessionId, SourceId};
use super::metadata::{validate_action_mask, SourceMetadata};
use crate::core::errors::{ProtocolViolation, Result};

/// Where an offer's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferBacking {
    Source(SourceId),
    /// Content of a server-initiated drag on the offer's seat.
    ServerDrag,
    /// Compositor-provided selection on the offer's seat.
    CompositorSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferKind {
    Selection,
    Drag(SessionId),
}

/// An ephemeral, per-recipient view of a source.
#[derive(Debug, Clone)]
pub struct DataOffer {
    pub id: OfferId,
    pub seat: SeatId,
    pub recipient: ClientKey,
    pub backing: OfferBacking,
    pub kind: OfferKind,
    /// What was announced to the recipient when the offer was created.
    pub advertised: Arc<SourceMetadata>,
    pub accepted_mime_type: Option<String>,
    pub accepted_actions: DndAction,
    pub preferred_action: DndAction,
    /// Created for a pre-v3 data device: no action negotiation, implicit copy.
    pub legacy: bool,
}

impl DataOffer {
    pub fn new(
        id: OfferId,
        seat: SeatId,
        recipient: ClientKey,
        backing: OfferBacking,
        kind: OfferKind,
        advertised: Arc<SourceMetadata>,
        legacy: bool,
    ) -> Self {
        let implicit = if legacy { DndAction::Copy } else { DndAction::empty() };
        Self {
            id,
            seat,
            recipient,
            backing,
            kind,
            advertised,
            accepted_mime_type: None,
            accepted_actions: implicit,
            preferred_action: implicit,
            legacy,
        }
    }

    pub fn source(&self) -> Option<SourceId> {
        match self.backing {
            OfferBacking::Source(id) => Some(id),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<SessionId> {
        match self.kind {
            OfferKind::Drag(session) => Some(session),
            OfferKind::Selection => None,
        }
    }

    /// Record the recipient's MIME type choice. `None` rejects the drag.
    pub fn accept(&mut self, mime_type: Option<String>) -> Result<()> {
        if let Some(mime) = &mime_type {
            if !self.advertised.offers(mime) {
                return Err(ProtocolViolation::UnknownMimeType {
                    offer: self.id,
                    mime_type: mime.clone(),
                }
                .into());
            }
        }
        self.accepted_mime_type = mime_type;
        Ok(())
    }

    pub fn set_actions(&mut self, actions: DndAction, preferred: DndAction) -> Result<()> {
        validate_action_mask(actions)?;
        let single = preferred.bits().count_ones() <= 1;
        if !single || !all_actions().contains(preferred) || !actions.contains(preferred) {
            return Err(ProtocolViolation::InvalidAction.into());
        }
        self.accepted_actions = actions;
        self.preferred_action = preferred;
        Ok(())
    }
}
