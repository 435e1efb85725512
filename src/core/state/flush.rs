//! Delivery of queued data device messages as protocol events.

use wayland_server::DisplayHandle;

use super::*;
use crate::core::data::events::ClientMessage;
use crate::util::logging::DATA_DEVICE;

impl CompositorState {
    /// Send every queued data device message to its client.
    ///
    /// Call after anything that changes focus or drives a drag; request
    /// handlers flush on their own.
    pub fn flush_data_device(&mut self, dh: &DisplayHandle) {
        for message in self.data.take_client_messages() {
            self.deliver(dh, message);
        }
    }

    fn deliver(&mut self, dh: &DisplayHandle, message: ClientMessage) {
        match message {
            ClientMessage::DataOffer {
                seat,
                client,
                offer,
                mime_types,
                source_actions,
            } => {
                let Some(device) = self.resources.device(seat, client) else {
                    tracing::debug!(target: DATA_DEVICE, "{} has no device for {}", client, offer);
                    return;
                };
                let Some(owner) = device.client() else {
                    return;
                };
                let resource = match owner.create_resource::<WlDataOffer, OfferId, CompositorState>(
                    dh,
                    device.version(),
                    offer,
                ) {
                    Ok(resource) => resource,
                    Err(err) => {
                        tracing::warn!(target: DATA_DEVICE, "Failed to create {}: {:?}", offer, err);
                        return;
                    }
                };
                device.data_offer(&resource);
                for mime_type in mime_types {
                    resource.offer(mime_type);
                }
                if resource.version() >= 3 && !source_actions.is_empty() {
                    resource.source_actions(source_actions);
                }
                self.resources.offers.insert(offer, resource);
            }
            ClientMessage::Selection { seat, client, offer } => {
                if let Some(device) = self.resources.device(seat, client) {
                    device.selection(offer.and_then(|id| self.resources.offers.get(&id)));
                }
            }
            ClientMessage::Enter {
                seat,
                client,
                surface,
                x,
                y,
                offer,
            } => {
                let serial = self.next_serial();
                let Some(wl_surface) = self.surfaces.get(&surface) else {
                    tracing::debug!(target: DATA_DEVICE, "Enter on unknown {}", surface);
                    return;
                };
                if let Some(device) = self.resources.device(seat, client) {
                    let offer = offer.and_then(|id| self.resources.offers.get(&id));
                    device.enter(serial, wl_surface, x, y, offer);
                }
            }
            ClientMessage::Leave { seat, client } => {
                if let Some(device) = self.resources.device(seat, client) {
                    device.leave();
                }
            }
            ClientMessage::Motion {
                seat,
                client,
                time,
                x,
                y,
            } => {
                if let Some(device) = self.resources.device(seat, client) {
                    device.motion(time, x, y);
                }
            }
            ClientMessage::Drop { seat, client } => {
                if let Some(device) = self.resources.device(seat, client) {
                    device.drop();
                }
            }
            ClientMessage::OfferAction { offer, action } => {
                if let Some(resource) = self.resources.offers.get(&offer) {
                    if resource.version() >= 3 {
                        resource.action(action);
                    }
                }
            }
            ClientMessage::SourceTarget { source, mime_type } => {
                if let Some(resource) = self.resources.sources.get(&source) {
                    resource.target(mime_type);
                }
            }
            ClientMessage::SourceAction { source, action } => {
                if let Some(resource) = self.resources.sources.get(&source) {
                    if resource.version() >= 3 {
                        resource.action(action);
                    }
                }
            }
            ClientMessage::SourceCancelled { source } => {
                if let Some(resource) = self.resources.sources.get(&source) {
                    resource.cancelled();
                }
            }
            ClientMessage::SourceDropPerformed { source } => {
                if let Some(resource) = self.resources.sources.get(&source) {
                    if resource.version() >= 3 {
                        resource.dnd_drop_performed();
                    }
                }
            }
            ClientMessage::SourceFinished { source } => {
                if let Some(resource) = self.resources.sources.get(&source) {
                    if resource.version() >= 3 {
                        resource.dnd_finished();
                    }
                }
            }
        }
    }
}
