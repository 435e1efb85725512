//! Clipboard selection and drag'n'drop for Wayland seats.
//!
//! This is the protocol-independent half of `wl_data_device`: sources,
//! offers, per-seat selection and drag sessions, and action negotiation.
//! The state machine consumes requests and focus notifications and queues
//! what has to be sent back; `core::wayland::data_device` plugs it into
//! `wayland-server`.

pub mod action;
pub mod device;
pub mod events;
pub mod ids;
pub mod metadata;
pub mod offer;
pub mod session;
pub mod source;
pub mod state;
pub mod transport;

pub use action::{default_action_chooser, ActionChooser, ActionPolicy, Modifiers, MoveModifier};
pub use device::{SeatDataDevice, Selection};
pub use events::{CancelReason, ClientMessage, DataDeviceEvent, SelectionKind, ServerDndEvent};
pub use ids::{ClientKey, OfferId, SeatId, SessionId, SourceId, SurfaceKey};
pub use metadata::SourceMetadata;
pub use offer::DataOffer;
pub use session::{DndSession, DndState, DragTarget};
pub use source::DataSource;
pub use state::DataDeviceState;
pub use transport::{ContentProvider, DataTransport, TransportError};
pub use wayland_server::protocol::wl_data_device_manager::DndAction;
