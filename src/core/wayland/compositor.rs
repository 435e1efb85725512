//! wl_compositor protocol implementation.
//!
//! Surfaces only need an identity here: drag origins, drag icons and
//! enter events all refer to them. Content is not composited, so buffer,
//! damage and region state is accepted and discarded.

use wayland_server::{
    backend::{ClientId, GlobalId},
    protocol::{wl_callback, wl_compositor, wl_region, wl_surface},
    Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New,
};

use crate::core::data::ids::SurfaceKey;
use crate::core::state::CompositorState;
use crate::util::logging::WAYLAND;

impl GlobalDispatch<wl_compositor::WlCompositor, ()> for CompositorState {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<wl_compositor::WlCompositor>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<wl_compositor::WlCompositor, ()> for CompositorState {
    fn request(
        state: &mut Self,
        _client: &Client,
        _resource: &wl_compositor::WlCompositor,
        request: wl_compositor::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            wl_compositor::Request::CreateSurface { id } => {
                let key = state.next_surface_key();
                let surface = data_init.init(id, key);
                state.surfaces.insert(key, surface);
                tracing::trace!(target: WAYLAND, "Created {}", key);
            }
            wl_compositor::Request::CreateRegion { id } => {
                data_init.init(id, ());
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_surface::WlSurface, SurfaceKey> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_surface::WlSurface,
        request: wl_surface::Request,
        _data: &SurfaceKey,
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        if let wl_surface::Request::Frame { callback } = request {
            data_init.init(callback, ()).done(0);
        }
    }

    fn destroyed(state: &mut Self, _client: ClientId, _resource: &wl_surface::WlSurface, data: &SurfaceKey) {
        state.surfaces.remove(data);
        state.data.surface_destroyed(*data);
    }
}

impl Dispatch<wl_region::WlRegion, ()> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_region::WlRegion,
        _request: wl_region::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
    }
}

impl Dispatch<wl_callback::WlCallback, ()> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_callback::WlCallback,
        _request: wl_callback::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
    }
}

/// Register wl_compositor global
pub fn register_compositor(display: &DisplayHandle) -> GlobalId {
    display.create_global::<CompositorState, wl_compositor::WlCompositor, ()>(4, ())
}
