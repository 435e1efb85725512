pub mod config;
pub mod data;
pub mod errors;
pub mod state;
pub mod surface;
pub mod traits;
pub mod wayland;

// Re-export key types
pub use config::DataDeviceConfig;
pub use data::DataDeviceState;
pub use errors::{DataDeviceError, ProtocolViolation};
pub use state::CompositorState;
