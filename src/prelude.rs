//! Common imports and types used throughout the crate.

pub use std::collections::HashMap;
pub use std::sync::Arc;

pub use crate::core::data::{
    ClientKey, DataDeviceEvent, DndAction, DndState, DragTarget, OfferId, SeatId, SourceId, SourceMetadata,
    SurfaceKey,
};
pub use crate::core::{CompositorState, DataDeviceConfig, DataDeviceError, DataDeviceState};

pub type Result<T> = crate::core::errors::Result<T>;
