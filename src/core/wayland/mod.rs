//! Wayland protocol implementations.
//!
//! `data_device` carries the selection and drag'n'drop protocol; the seat
//! and compositor globals give clients the objects those requests name.

pub mod compositor;
pub mod data_device;
pub mod seat;

use wayland_server::DisplayHandle;

use crate::core::state::CompositorState;

/// Create every global this crate implements.
pub fn register_globals(display: &DisplayHandle, state: &CompositorState) {
    let config = state.data.config();
    compositor::register_compositor(display);
    seat::register_seat(display, state.seat, &config.seat_name);
    data_device::register_data_device_manager(display, config.manager_version);
    tracing::info!(target: crate::util::logging::WAYLAND, "Registered data device globals");
}
