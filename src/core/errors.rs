//! Core error types

use thiserror::Error;

use crate::core::data::ids::{OfferId, SeatId, SourceId, SurfaceKey};
use crate::core::data::transport::TransportError;

/// Data device errors
#[derive(Error, Debug)]
pub enum DataDeviceError {
    #[error("data source {0} was already destroyed")]
    SourceGone(SourceId),

    #[error("data offer {0} is no longer live")]
    OfferGone(OfferId),

    #[error("a drag is already in progress on {0}")]
    SeatBusy(SeatId),

    #[error("unknown seat {0}")]
    UnknownSeat(SeatId),

    #[error("no drag in progress on {0}")]
    NoActiveDrag(SeatId),

    #[error("{surface} already has the {role} role")]
    RoleConflict {
        surface: SurfaceKey,
        role: &'static str,
    },

    #[error("data source {0} can no longer be modified")]
    SourceFinalized(SourceId),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("transfer failed: {0}")]
    Transport(#[from] TransportError),
}

impl DataDeviceError {
    /// Errors that only mean "the object went away first". Callers treat
    /// these as no-ops rather than failures.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::SourceGone(_) | Self::OfferGone(_))
    }
}

/// Client misuse of the data device protocol.
///
/// These are never recovered locally; the protocol layer posts the
/// matching error on the offending resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("{offer} accepted mime type {mime_type:?} that was never offered")]
    UnknownMimeType { offer: OfferId, mime_type: String },

    #[error("action mask {0:#x} contains unknown actions")]
    InvalidActionMask(u32),

    #[error("preferred action is not a single action within the accepted set")]
    InvalidAction,

    #[error("finish requested on {0} before a drop with a resolved action")]
    InvalidFinish(OfferId),

    #[error("{0} cannot be used here")]
    InvalidSource(SourceId),

    #[error("{0} is not a drag offer")]
    InvalidOffer(OfferId),
}

/// Result type for data device operations
pub type Result<T> = std::result::Result<T, DataDeviceError>;
