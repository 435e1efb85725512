//! Per-seat data device state.

use std::collections::HashMap;
use std::sync::Arc;

use super::action::Modifiers;
use super::ids::{ClientKey, OfferId, SeatId, SourceId};
use super::metadata::SourceMetadata;
use super::session::DndSession;
use super::transport::BoxedProvider;

/// The content currently held as a seat's clipboard.
#[derive(Debug)]
pub enum Selection {
    Client(SourceId),
    Compositor {
        metadata: Arc<SourceMetadata>,
        provider: BoxedProvider,
    },
}

impl Selection {
    pub fn source(&self) -> Option<SourceId> {
        match self {
            Selection::Client(id) => Some(*id),
            Selection::Compositor { .. } => None,
        }
    }
}

/// A client's `wl_data_device` objects on one seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceBinding {
    pub version: u32,
    pub count: usize,
}

#[derive(Debug)]
pub struct SeatDataDevice {
    pub id: SeatId,
    pub name: String,
    /// Client receiving the selection offer.
    pub focus: Option<ClientKey>,
    pub selection: Option<Selection>,
    pub selection_offer: Option<OfferId>,
    pub active_drag: Option<DndSession>,
    /// Dropped sessions waiting for the destination to finish, keyed by offer.
    pub dropped: HashMap<OfferId, DndSession>,
    pub modifiers: Modifiers,
    pub(crate) devices: HashMap<ClientKey, DeviceBinding>,
}

impl SeatDataDevice {
    pub fn new(id: SeatId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            focus: None,
            selection: None,
            selection_offer: None,
            active_drag: None,
            dropped: HashMap::new(),
            modifiers: Modifiers::default(),
            devices: HashMap::new(),
        }
    }

    pub fn device_version(&self, client: ClientKey) -> Option<u32> {
        self.devices.get(&client).map(|binding| binding.version)
    }

    pub fn has_device(&self, client: ClientKey) -> bool {
        self.devices.contains_key(&client)
    }

    pub fn selection_source(&self) -> Option<SourceId> {
        self.selection.as_ref().and_then(Selection::source)
    }
}
