use std::sync::Arc;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::ids::{ClientKey, SeatId, SourceId};
use super::metadata::{MetadataCell, SourceMetadata};
use crate::core::errors::{DataDeviceError, ProtocolViolation, Result};

/// How a source is currently being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceUsage {
    #[default]
    Unused,
    Selection(SeatId),
    Drag(SeatId),
    /// Its drag was dropped or cancelled; the metadata is frozen.
    Finalized,
}

/// A client-owned advertisement of transferable content.
#[derive(Debug)]
pub struct DataSource {
    pub id: SourceId,
    pub client: ClientKey,
    metadata: MetadataCell,
    /// Action last negotiated for this source's drag.
    pub current_action: DndAction,
    pub usage: SourceUsage,
}

impl DataSource {
    pub fn new(id: SourceId, client: ClientKey) -> Self {
        Self {
            id,
            client,
            metadata: MetadataCell::default(),
            current_action: DndAction::empty(),
            usage: SourceUsage::Unused,
        }
    }

    pub fn metadata(&self) -> &SourceMetadata {
        self.metadata.get()
    }

    pub fn snapshot(&self) -> Arc<SourceMetadata> {
        self.metadata.snapshot()
    }

    pub fn offer_mime_type(&mut self, mime_type: String) -> Result<()> {
        self.ensure_mutable()?;
        if !self.metadata.add_mime_type(mime_type) {
            tracing::debug!("{} offered a duplicate mime type", self.id);
        }
        Ok(())
    }

    /// Actions can only be declared before the source is put to use.
    pub fn set_actions(&mut self, actions: DndAction) -> Result<()> {
        self.ensure_mutable()?;
        if matches!(self.usage, SourceUsage::Selection(_) | SourceUsage::Drag(_)) {
            return Err(ProtocolViolation::InvalidSource(self.id).into());
        }
        self.metadata.set_actions(actions)
    }

    fn ensure_mutable(&self) -> Result<()> {
        match self.usage {
            SourceUsage::Finalized => Err(DataDeviceError::SourceFinalized(self.id)),
            _ => Ok(()),
        }
    }
}
