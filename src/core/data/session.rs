//! Drag'n'drop session state machine.
//!
//! ```text
//! Announced <-> Dragging -> Dropped
//!     \            \
//!      +------------+----> Cancelled
//! ```
//!
//! `Announced` means nobody is being offered the content (no focus, or the
//! focused client has no data device). Every focus change goes back through
//! `Announced` before a new offer is created, so a session never holds two
//! offers at once. Terminal sessions are taken off the seat and cannot be
//! focused again.

use std::sync::Arc;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::ids::{ClientKey, OfferId, SeatId, SessionId, SourceId, SurfaceKey};
use super::metadata::SourceMetadata;
use super::offer::DataOffer;
use super::transport::BoxedProvider;
use crate::util::logging::DND;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DndState {
    Announced,
    Dragging,
    Dropped,
    Cancelled,
}

impl DndState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DndState::Dropped | DndState::Cancelled)
    }

    pub fn can_become(&self, next: DndState) -> bool {
        use DndState::*;
        match (self, next) {
            (Dropped | Cancelled, _) => false,
            (_, Cancelled) => true,
            (Announced, Dragging) | (Dragging, Dragging) | (Dragging, Announced) => true,
            (Dragging, Dropped) => true,
            _ => false,
        }
    }
}

/// Who started the drag and where its content lives.
#[derive(Debug)]
pub enum DragOrigin {
    Client {
        client: ClientKey,
        /// `None` for a drag confined to the origin client.
        source: Option<SourceId>,
        surface: Option<SurfaceKey>,
    },
    Server {
        metadata: Arc<SourceMetadata>,
        provider: BoxedProvider,
    },
}

/// Where the pointer currently is during a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragTarget {
    pub client: ClientKey,
    pub surface: SurfaceKey,
    pub x: f64,
    pub y: f64,
}

impl DragTarget {
    pub fn new(client: ClientKey, surface: SurfaceKey, x: f64, y: f64) -> Self {
        Self { client, surface, x, y }
    }

    fn same_surface(&self, other: &DragTarget) -> bool {
        self.client == other.client && self.surface == other.surface
    }
}

/// What happens when the origin releases the drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Deliver to the focused recipient.
    Drop { recipient: ClientKey, mime_type: Option<String> },
    Cancel,
}

#[derive(Debug)]
pub struct DndSession {
    pub id: SessionId,
    pub seat: SeatId,
    pub origin: DragOrigin,
    pub icon: Option<SurfaceKey>,
    pub focus: Option<DragTarget>,
    pub current_offer: Option<OfferId>,
    pub negotiated_action: DndAction,
    state: DndState,
}

impl DndSession {
    pub fn new(id: SessionId, seat: SeatId, origin: DragOrigin, icon: Option<SurfaceKey>) -> Self {
        Self {
            id,
            seat,
            origin,
            icon,
            focus: None,
            current_offer: None,
            negotiated_action: DndAction::empty(),
            state: DndState::Announced,
        }
    }

    pub fn state(&self) -> DndState {
        self.state
    }

    /// Move to `next`. Returns false (and stays put) on an illegal transition.
    pub fn transition(&mut self, next: DndState) -> bool {
        if !self.state.can_become(next) {
            tracing::warn!(target: DND, "{}: refused transition {:?} -> {:?}", self.id, self.state, next);
            return false;
        }
        tracing::debug!(target: DND, "{}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        true
    }

    pub fn source(&self) -> Option<SourceId> {
        match &self.origin {
            DragOrigin::Client { source, .. } => *source,
            DragOrigin::Server { .. } => None,
        }
    }

    pub fn origin_client(&self) -> Option<ClientKey> {
        match &self.origin {
            DragOrigin::Client { client, .. } => Some(*client),
            DragOrigin::Server { .. } => None,
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self.origin, DragOrigin::Server { .. })
    }

    /// A client drag without a source only ever targets its own client.
    pub fn is_client_local(&self) -> bool {
        matches!(self.origin, DragOrigin::Client { source: None, .. })
    }

    pub fn is_same_focus(&self, target: Option<&DragTarget>) -> bool {
        match (&self.focus, target) {
            (None, None) => true,
            (Some(current), Some(next)) => current.same_surface(next),
            _ => false,
        }
    }

    /// Decide the result of a drop given the current offer, if any.
    pub fn drop_outcome(&self, offer: Option<&DataOffer>) -> DropOutcome {
        if self.state != DndState::Dragging {
            return DropOutcome::Cancel;
        }
        let Some(focus) = self.focus else {
            return DropOutcome::Cancel;
        };
        match offer {
            Some(offer) => match &offer.accepted_mime_type {
                Some(mime) if !self.negotiated_action.is_empty() => DropOutcome::Drop {
                    recipient: focus.client,
                    mime_type: Some(mime.clone()),
                },
                _ => DropOutcome::Cancel,
            },
            None if self.is_client_local() => DropOutcome::Drop {
                recipient: focus.client,
                mime_type: None,
            },
            None => DropOutcome::Cancel,
        }
    }
}
