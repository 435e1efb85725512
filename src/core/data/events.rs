//! Outbound event queues.
//!
//! The state machine never calls out while it transitions. Everything it
//! wants to tell the compositor or the clients is queued here and drained
//! by the surrounding event loop after the request has been processed.

use std::collections::VecDeque;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::ids::{ClientKey, OfferId, SeatId, SessionId, SourceId, SurfaceKey};

/// What a seat's selection currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Cleared,
    Client(SourceId),
    Compositor,
}

/// Why a drag ended without a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The origin aborted the drag.
    Aborted,
    /// Dropped while nobody had accepted a MIME type and an action.
    NotAccepted,
    /// The backing source was destroyed mid-drag.
    SourceDestroyed,
    /// The client that started the drag disconnected.
    OriginDisconnected,
}

/// Events that are generated by interactions of the clients with the data device
#[derive(Debug, Clone, PartialEq)]
pub enum DataDeviceEvent {
    NewSource {
        source: SourceId,
        client: ClientKey,
    },
    SelectionChanged {
        seat: SeatId,
        selection: SelectionKind,
    },
    DragStarted {
        seat: SeatId,
        session: SessionId,
        source: Option<SourceId>,
        /// `None` for server-initiated drags.
        origin: Option<ClientKey>,
        icon: Option<SurfaceKey>,
    },
    DragMotion {
        seat: SeatId,
        session: SessionId,
        recipient: Option<ClientKey>,
        x: f64,
        y: f64,
    },
    Dropped {
        seat: SeatId,
        session: SessionId,
        recipient: ClientKey,
        action: DndAction,
        mime_type: Option<String>,
    },
    Cancelled {
        seat: SeatId,
        session: SessionId,
        reason: CancelReason,
    },
}

/// Event generated by the interactions of clients with a server initiated drag'n'drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerDndEvent {
    /// The negotiated action changed.
    Action { seat: SeatId, action: DndAction },
    Dropped { seat: SeatId },
    Cancelled { seat: SeatId },
    /// The destination finished reading the content.
    Finished { seat: SeatId },
}

/// Protocol events to deliver to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Introduce a new offer to `client`, with its MIME types and the
    /// source's actions.
    DataOffer {
        seat: SeatId,
        client: ClientKey,
        offer: OfferId,
        mime_types: Vec<String>,
        source_actions: DndAction,
    },
    Selection {
        seat: SeatId,
        client: ClientKey,
        offer: Option<OfferId>,
    },
    Enter {
        seat: SeatId,
        client: ClientKey,
        surface: SurfaceKey,
        x: f64,
        y: f64,
        offer: Option<OfferId>,
    },
    Leave {
        seat: SeatId,
        client: ClientKey,
    },
    Motion {
        seat: SeatId,
        client: ClientKey,
        time: u32,
        x: f64,
        y: f64,
    },
    Drop {
        seat: SeatId,
        client: ClientKey,
    },
    OfferAction {
        offer: OfferId,
        action: DndAction,
    },
    SourceTarget {
        source: SourceId,
        mime_type: Option<String>,
    },
    SourceAction {
        source: SourceId,
        action: DndAction,
    },
    SourceCancelled {
        source: SourceId,
    },
    SourceDropPerformed {
        source: SourceId,
    },
    SourceFinished {
        source: SourceId,
    },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<DataDeviceEvent>,
    server_events: VecDeque<ServerDndEvent>,
    messages: VecDeque<ClientMessage>,
}

impl EventQueue {
    pub fn emit(&mut self, event: DataDeviceEvent) {
        tracing::trace!("data device event: {:?}", event);
        self.events.push_back(event);
    }

    pub fn emit_server(&mut self, event: ServerDndEvent) {
        tracing::trace!("server dnd event: {:?}", event);
        self.server_events.push_back(event);
    }

    pub fn send(&mut self, message: ClientMessage) {
        self.messages.push_back(message);
    }

    pub fn take_events(&mut self) -> Vec<DataDeviceEvent> {
        self.events.drain(..).collect()
    }

    pub fn take_server_events(&mut self) -> Vec<ServerDndEvent> {
        self.server_events.drain(..).collect()
    }

    pub fn take_client_messages(&mut self) -> Vec<ClientMessage> {
        self.messages.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.server_events.is_empty() && self.messages.is_empty()
    }
}
