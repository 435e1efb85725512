//! wl_seat protocol implementation.
//!
//! The seat global only exists so clients can name a seat when asking for
//! a data device. It advertises no input capabilities: pointer and
//! keyboard delivery belong to the embedding compositor, which reports
//! focus through the `CompositorState` entry points.

use wayland_server::{
    backend::GlobalId,
    protocol::{wl_keyboard, wl_pointer, wl_seat, wl_touch},
    Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource,
};

use crate::core::data::ids::SeatId;
use crate::core::state::CompositorState;
use crate::util::logging::WAYLAND;

/// Seat global data
#[derive(Debug, Clone)]
pub struct SeatGlobal {
    pub seat: SeatId,
    pub name: String,
}

// ============================================================================
// wl_seat
// ============================================================================

impl GlobalDispatch<wl_seat::WlSeat, SeatGlobal> for CompositorState {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        client: &Client,
        resource: New<wl_seat::WlSeat>,
        global_data: &SeatGlobal,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let seat = data_init.init(resource, global_data.seat);
        seat.capabilities(wl_seat::Capability::empty());
        if seat.version() >= 2 {
            seat.name(global_data.name.clone());
        }
        tracing::debug!(target: WAYLAND, "Bound wl_seat {} for {:?}", global_data.seat, client.id());
    }
}

impl Dispatch<wl_seat::WlSeat, SeatId> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_seat::WlSeat,
        request: wl_seat::Request,
        _data: &SeatId,
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            wl_seat::Request::GetPointer { id } => {
                data_init.init(id, ());
                tracing::warn!(target: WAYLAND, "wl_pointer requested from a seat without pointer");
            }
            wl_seat::Request::GetKeyboard { id } => {
                data_init.init(id, ());
                tracing::warn!(target: WAYLAND, "wl_keyboard requested from a seat without keyboard");
            }
            wl_seat::Request::GetTouch { id } => {
                data_init.init(id, ());
                tracing::warn!(target: WAYLAND, "wl_touch requested from a seat without touch");
            }
            wl_seat::Request::Release => {
                tracing::debug!(target: WAYLAND, "wl_seat released");
            }
            _ => {}
        }
    }
}

// Inert input objects handed out to clients that ask anyway.

impl Dispatch<wl_pointer::WlPointer, ()> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_pointer::WlPointer,
        _request: wl_pointer::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
    }
}

impl Dispatch<wl_keyboard::WlKeyboard, ()> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_keyboard::WlKeyboard,
        _request: wl_keyboard::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
    }
}

impl Dispatch<wl_touch::WlTouch, ()> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_touch::WlTouch,
        _request: wl_touch::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
    }
}

/// Register the wl_seat global for `seat`.
pub fn register_seat(display: &DisplayHandle, seat: SeatId, name: &str) -> GlobalId {
    let global = SeatGlobal {
        seat,
        name: name.to_string(),
    };
    display.create_global::<CompositorState, wl_seat::WlSeat, SeatGlobal>(7, global)
}
