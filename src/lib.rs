// Per-seat clipboard selection and drag'n'drop for Wayland compositors.
//
// The state machine in core::data is independent of the wire protocol;
// core::wayland plugs it into wayland-server.

pub mod core;
pub mod prelude;
pub mod util;
