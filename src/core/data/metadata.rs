//! Data source metadata snapshots.
//!
//! A source's metadata is an immutable [`SourceMetadata`] value behind an
//! `Arc`. Every client update builds a new value and swaps it in, so a
//! reader always sees one consistent snapshot.

use std::sync::Arc;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::action::all_actions;
use crate::core::errors::{ProtocolViolation, Result};

/// The metadata describing a data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    /// The MIME types supported by this source, in the order they were offered
    pub mime_types: Vec<String>,
    /// The drag'n'drop actions supported by this source
    pub dnd_action: DndAction,
}

impl Default for SourceMetadata {
    fn default() -> Self {
        Self {
            mime_types: Vec::new(),
            dnd_action: DndAction::empty(),
        }
    }
}

impl SourceMetadata {
    pub fn new<I, S>(mime_types: I, dnd_action: DndAction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut metadata = Self {
            mime_types: Vec::new(),
            dnd_action,
        };
        for mime_type in mime_types {
            let mime_type = mime_type.into();
            if !metadata.offers(&mime_type) {
                metadata.mime_types.push(mime_type);
            }
        }
        metadata
    }

    pub fn offers(&self, mime_type: &str) -> bool {
        self.mime_types.iter().any(|m| m == mime_type)
    }
}

/// Holder of the current metadata snapshot of one source.
#[derive(Debug, Clone, Default)]
pub struct MetadataCell {
    current: Arc<SourceMetadata>,
}

impl MetadataCell {
    pub fn new(metadata: SourceMetadata) -> Self {
        Self {
            current: Arc::new(metadata),
        }
    }

    pub fn snapshot(&self) -> Arc<SourceMetadata> {
        Arc::clone(&self.current)
    }

    pub fn get(&self) -> &SourceMetadata {
        &self.current
    }

    /// Add a MIME type. Returns false if it was already offered.
    pub fn add_mime_type(&mut self, mime_type: String) -> bool {
        if self.current.offers(&mime_type) {
            return false;
        }
        let mut next = SourceMetadata::clone(&self.current);
        next.mime_types.push(mime_type);
        self.current = Arc::new(next);
        true
    }

    pub fn set_actions(&mut self, dnd_action: DndAction) -> Result<()> {
        validate_action_mask(dnd_action)?;
        let next = SourceMetadata {
            mime_types: self.current.mime_types.clone(),
            dnd_action,
        };
        self.current = Arc::new(next);
        Ok(())
    }
}

pub(crate) fn validate_action_mask(actions: DndAction) -> Result<()> {
    if all_actions().contains(actions) {
        Ok(())
    } else {
        Err(ProtocolViolation::InvalidActionMask(actions.bits()).into())
    }
}
