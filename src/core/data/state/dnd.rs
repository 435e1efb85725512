use std::sync::Arc;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::DataDeviceState;
use crate::core::config::IconConflictPolicy;
use crate::core::data::action::{clamp_action, Modifiers};
use crate::core::data::events::{CancelReason, ClientMessage, DataDeviceEvent, ServerDndEvent};
use crate::core::data::ids::{ClientKey, SeatId, SessionId, SourceId, SurfaceKey};
use crate::core::data::metadata::SourceMetadata;
use crate::core::data::offer::{OfferBacking, OfferKind};
use crate::core::data::session::{DndSession, DndState, DragOrigin, DragTarget, DropOutcome};
use crate::core::data::source::SourceUsage;
use crate::core::data::transport::{BoxedProvider, ContentProvider};
use crate::core::errors::{DataDeviceError, ProtocolViolation, Result};
use crate::core::surface::role::SurfaceRole;
use crate::util::logging::DND;

impl DataDeviceState {
    /// Start a drag'n'drop on behalf of a client.
    ///
    /// `source` may be `None`, in which case the drag only ever enters
    /// surfaces of `origin`. The session starts unfocused.
    pub fn start_dnd(
        &mut self,
        seat: SeatId,
        source: Option<SourceId>,
        origin: ClientKey,
        origin_surface: Option<SurfaceKey>,
        icon: Option<SurfaceKey>,
    ) -> Result<SessionId> {
        self.ensure_idle(seat)?;
        if let Some(id) = source {
            let src = self.sources.get(&id).ok_or(DataDeviceError::SourceGone(id))?;
            if src.usage != SourceUsage::Unused {
                return Err(ProtocolViolation::InvalidSource(id).into());
            }
        }
        let icon = self.claim_icon(icon)?;
        if let Some(src) = source.and_then(|id| self.sources.get_mut(&id)) {
            src.usage = SourceUsage::Drag(seat);
        }

        let id = SessionId(self.session_ids.next());
        let origin_kind = DragOrigin::Client {
            client: origin,
            source,
            surface: origin_surface,
        };
        self.begin_session(DndSession::new(id, seat, origin_kind, icon), source, Some(origin));
        Ok(id)
    }

    /// Start a drag'n'drop from content controlled by the compositor.
    ///
    /// There is no client source: `metadata` is what recipients are
    /// offered, and `provider` writes the content when one of them reads.
    pub fn start_server_dnd<P>(
        &mut self,
        seat: SeatId,
        metadata: SourceMetadata,
        provider: P,
        icon: Option<SurfaceKey>,
    ) -> Result<SessionId>
    where
        P: ContentProvider + 'static,
    {
        self.ensure_idle(seat)?;
        let icon = self.claim_icon(icon)?;

        let id = SessionId(self.session_ids.next());
        let origin = DragOrigin::Server {
            metadata: Arc::new(metadata),
            provider: BoxedProvider(Box::new(provider)),
        };
        self.begin_session(DndSession::new(id, seat, origin, icon), None, None);
        Ok(id)
    }

    fn ensure_idle(&self, seat: SeatId) -> Result<()> {
        if self.seat(seat)?.active_drag.is_some() {
            tracing::warn!(target: DND, "Refusing a second drag on {}", seat);
            return Err(DataDeviceError::SeatBusy(seat));
        }
        Ok(())
    }

    fn claim_icon(&mut self, icon: Option<SurfaceKey>) -> Result<Option<SurfaceKey>> {
        let Some(surface) = icon else {
            return Ok(None);
        };
        match self.roles.give_role(surface, SurfaceRole::DndIcon) {
            Ok(()) => Ok(Some(surface)),
            Err(err) => match self.config.icon_conflict {
                IconConflictPolicy::Reject => Err(err),
                IconConflictPolicy::DropIcon => {
                    tracing::warn!(target: DND, "Dropping drag icon: {}", err);
                    Ok(None)
                }
            },
        }
    }

    fn begin_session(&mut self, session: DndSession, source: Option<SourceId>, origin: Option<ClientKey>) {
        let seat = session.seat;
        tracing::info!(
            target: DND,
            "Drag started on {}: {} source={:?} origin={:?} icon={:?}",
            seat,
            session.id,
            source,
            origin,
            session.icon
        );
        self.queue.emit(DataDeviceEvent::DragStarted {
            seat,
            session: session.id,
            source,
            origin,
            icon: session.icon,
        });
        self.put_drag(session);
    }

    pub fn active_drag(&self, seat: SeatId) -> Option<&DndSession> {
        self.seats.get(&seat).and_then(|dev| dev.active_drag.as_ref())
    }

    pub fn drag_state(&self, seat: SeatId) -> Option<DndState> {
        self.active_drag(seat).map(DndSession::state)
    }

    fn take_drag(&mut self, seat: SeatId) -> Result<DndSession> {
        self.seat_mut(seat)?
            .active_drag
            .take()
            .ok_or(DataDeviceError::NoActiveDrag(seat))
    }

    pub(super) fn put_drag(&mut self, session: DndSession) {
        if let Some(dev) = self.seats.get_mut(&session.seat) {
            dev.active_drag = Some(session);
        }
    }

    // =========================================================================
    // Focus and motion
    // =========================================================================

    /// The pointer entered a new surface (or left all of them) during a drag.
    ///
    /// The previous recipient's offer is withdrawn and it receives a leave
    /// before the new recipient gets an offer.
    pub fn set_drag_focus(&mut self, seat: SeatId, target: Option<DragTarget>) -> Result<()> {
        let mut session = self.take_drag(seat)?;

        if session.is_same_focus(target.as_ref()) {
            session.focus = target;
            self.put_drag(session);
            return Ok(());
        }

        self.leave_focus(&mut session, true);
        if let Some(target) = target {
            self.enter_focus(&mut session, target);
        }

        let (x, y) = target.map(|t| (t.x, t.y)).unwrap_or_default();
        self.queue.emit(DataDeviceEvent::DragMotion {
            seat,
            session: session.id,
            recipient: session.focus.map(|focus| focus.client),
            x,
            y,
        });
        self.put_drag(session);
        Ok(())
    }

    pub fn drag_motion(&mut self, seat: SeatId, time: u32, x: f64, y: f64) -> Result<()> {
        let session = self
            .seat_mut(seat)?
            .active_drag
            .as_mut()
            .ok_or(DataDeviceError::NoActiveDrag(seat))?;
        if let Some(focus) = session.focus.as_mut() {
            focus.x = x;
            focus.y = y;
        }
        let recipient = session.focus.map(|focus| focus.client);
        let id = session.id;

        tracing::trace!(target: DND, "{} motion {:.1},{:.1} over {:?}", id, x, y, recipient);
        if session.state() == DndState::Dragging {
            if let Some(client) = recipient {
                self.queue.send(ClientMessage::Motion { seat, client, time, x, y });
            }
        }
        self.queue.emit(DataDeviceEvent::DragMotion {
            seat,
            session: id,
            recipient,
            x,
            y,
        });
        Ok(())
    }

    /// Update the modifier state of `seat`, renegotiating an active drag.
    pub fn set_modifiers(&mut self, seat: SeatId, modifiers: Modifiers) -> Result<()> {
        let dev = self.seat_mut(seat)?;
        if dev.modifiers == modifiers {
            return Ok(());
        }
        dev.modifiers = modifiers;
        if let Some(mut session) = dev.active_drag.take() {
            self.recompute_action(&mut session);
            self.put_drag(session);
        }
        Ok(())
    }

    pub(super) fn leave_focus(&mut self, session: &mut DndSession, notify: bool) {
        let Some(focus) = session.focus.take() else {
            return;
        };
        let seat = session.seat;
        let offer = session.current_offer.take().and_then(|id| self.offers.remove(&id));
        let entered = session.state() == DndState::Dragging;

        if notify && entered && self.seat(seat).is_ok_and(|dev| dev.has_device(focus.client)) {
            self.queue.send(ClientMessage::Leave {
                seat,
                client: focus.client,
            });
        }
        if entered {
            session.transition(DndState::Announced);
        }

        let had_target = offer.is_some_and(|offer| offer.accepted_mime_type.is_some());
        self.clear_target(session, had_target);
    }

    /// The session lost its offer: the source no longer has a target and
    /// no action applies.
    pub(super) fn clear_target(&mut self, session: &mut DndSession, had_target: bool) {
        if let Some(source) = session.source().filter(|id| self.sources.contains_key(id)) {
            if had_target {
                self.queue.send(ClientMessage::SourceTarget {
                    source,
                    mime_type: None,
                });
            }
        }
        self.set_negotiated(session, DndAction::empty());
    }

    fn enter_focus(&mut self, session: &mut DndSession, target: DragTarget) {
        let seat = session.seat;
        session.focus = Some(target);

        if !self.seat(seat).is_ok_and(|dev| dev.has_device(target.client)) {
            tracing::debug!(target: DND, "{} has no data device, {} stays announced", target.client, session.id);
            return;
        }

        let content = match &session.origin {
            DragOrigin::Client { source: None, client, .. } => {
                if *client == target.client {
                    self.queue.send(ClientMessage::Enter {
                        seat,
                        client: target.client,
                        surface: target.surface,
                        x: target.x,
                        y: target.y,
                        offer: None,
                    });
                    session.transition(DndState::Dragging);
                }
                return;
            }
            DragOrigin::Client { source: Some(id), .. } => match self.sources.get(id) {
                Some(src) => (OfferBacking::Source(*id), src.snapshot()),
                None => return,
            },
            DragOrigin::Server { metadata, .. } => (OfferBacking::ServerDrag, Arc::clone(metadata)),
        };

        let (backing, metadata) = content;
        let Some(offer) = self.create_offer(seat, target.client, backing, OfferKind::Drag(session.id), metadata)
        else {
            return;
        };
        session.current_offer = Some(offer);
        self.queue.send(ClientMessage::Enter {
            seat,
            client: target.client,
            surface: target.surface,
            x: target.x,
            y: target.y,
            offer: Some(offer),
        });
        session.transition(DndState::Dragging);
        self.recompute_action(session);
    }

    /// Ask the chooser for the current action and tell both peers if it changed.
    pub(super) fn recompute_action(&mut self, session: &mut DndSession) {
        let Some(offer) = session.current_offer.and_then(|id| self.offers.get(&id)) else {
            return;
        };
        let source_actions = match &session.origin {
            DragOrigin::Client { source: Some(id), .. } => match self.sources.get(id) {
                Some(src) => src.metadata().dnd_action,
                None => return,
            },
            DragOrigin::Client { source: None, .. } => return,
            DragOrigin::Server { metadata, .. } => metadata.dnd_action,
        };
        let modifiers = self.seats.get(&session.seat).map(|dev| dev.modifiers).unwrap_or_default();
        let offer_actions = offer.accepted_actions;
        let chosen = clamp_action(
            (self.chooser)(source_actions, offer_actions, modifiers),
            source_actions,
            offer_actions,
        );
        self.set_negotiated(session, chosen);
    }

    fn set_negotiated(&mut self, session: &mut DndSession, action: DndAction) {
        if session.negotiated_action == action {
            return;
        }
        tracing::debug!(target: DND, "{} action {:?} -> {:?}", session.id, session.negotiated_action, action);
        session.negotiated_action = action;

        if let Some(offer) = session.current_offer.and_then(|id| self.offers.get(&id)) {
            if !offer.legacy {
                self.queue.send(ClientMessage::OfferAction { offer: offer.id, action });
            }
        }
        match &session.origin {
            DragOrigin::Client { source: Some(id), .. } => {
                if let Some(src) = self.sources.get_mut(id) {
                    src.current_action = action;
                    self.queue.send(ClientMessage::SourceAction { source: *id, action });
                }
            }
            DragOrigin::Client { source: None, .. } => {}
            DragOrigin::Server { .. } => {
                self.queue.emit_server(ServerDndEvent::Action {
                    seat: session.seat,
                    action,
                });
            }
        }
    }

    // =========================================================================
    // Termination
    // =========================================================================

    /// The origin released the drag.
    ///
    /// Drops onto the focused recipient if it accepted a MIME type and an
    /// action was negotiated, cancels otherwise. Returns the terminal state.
    pub fn drop_dnd(&mut self, seat: SeatId) -> Result<DndState> {
        let mut session = self.take_drag(seat)?;
        let offer = session.current_offer.and_then(|id| self.offers.get(&id));

        match session.drop_outcome(offer) {
            DropOutcome::Drop { recipient, mime_type } => {
                session.transition(DndState::Dropped);
                self.queue.send(ClientMessage::Drop { seat, client: recipient });
                match &session.origin {
                    DragOrigin::Client { source: Some(id), .. } => {
                        if let Some(src) = self.sources.get_mut(id) {
                            src.usage = SourceUsage::Finalized;
                            self.queue.send(ClientMessage::SourceDropPerformed { source: *id });
                        }
                    }
                    DragOrigin::Client { source: None, .. } => {}
                    DragOrigin::Server { .. } => self.queue.emit_server(ServerDndEvent::Dropped { seat }),
                }
                self.release_icon(&session);
                self.queue.emit(DataDeviceEvent::Dropped {
                    seat,
                    session: session.id,
                    recipient,
                    action: session.negotiated_action,
                    mime_type,
                });
                tracing::info!(
                    target: DND,
                    "{} dropped on {} with {:?}",
                    session.id,
                    recipient,
                    session.negotiated_action
                );

                if let Some(offer) = session.current_offer {
                    if let Some(dev) = self.seats.get_mut(&seat) {
                        dev.dropped.insert(offer, session);
                    }
                }
                Ok(DndState::Dropped)
            }
            DropOutcome::Cancel => {
                self.cancel_session(session, CancelReason::NotAccepted);
                Ok(DndState::Cancelled)
            }
        }
    }

    /// The origin aborted the drag.
    pub fn cancel_dnd(&mut self, seat: SeatId) -> Result<()> {
        let session = self.take_drag(seat)?;
        self.cancel_session(session, CancelReason::Aborted);
        Ok(())
    }

    pub(super) fn cancel_session(&mut self, mut session: DndSession, reason: CancelReason) {
        let seat = session.seat;
        self.leave_focus(&mut session, true);
        session.transition(DndState::Cancelled);

        match &session.origin {
            DragOrigin::Client { source: Some(id), .. } => {
                if let Some(src) = self.sources.get_mut(id) {
                    src.usage = SourceUsage::Finalized;
                    self.queue.send(ClientMessage::SourceCancelled { source: *id });
                }
            }
            DragOrigin::Client { source: None, .. } => {}
            DragOrigin::Server { .. } => self.queue.emit_server(ServerDndEvent::Cancelled { seat }),
        }
        self.release_icon(&session);
        self.queue.emit(DataDeviceEvent::Cancelled {
            seat,
            session: session.id,
            reason,
        });
        tracing::info!(target: DND, "{} cancelled: {:?}", session.id, reason);
    }

    /// Cancel the active drag of `seat` if `client` started it, or move its
    /// focus off `client` if `client` was the recipient.
    pub(super) fn cancel_drags_from(&mut self, seat: SeatId, client: ClientKey) {
        let Some(dev) = self.seats.get_mut(&seat) else {
            return;
        };
        let Some(session) = dev.active_drag.take() else {
            return;
        };
        if session.origin_client() == Some(client) {
            self.cancel_session(session, CancelReason::OriginDisconnected);
        } else {
            self.put_drag(session);
        }
    }

    fn release_icon(&mut self, session: &DndSession) {
        if let Some(icon) = session.icon {
            self.roles.remove_role(icon, SurfaceRole::DndIcon);
        }
    }

    /// Send the finished notice of a dropped session to its origin.
    pub(super) fn complete_transfer(&mut self, session: DndSession) {
        match &session.origin {
            DragOrigin::Client { source: Some(id), .. } => {
                if self.sources.contains_key(id) {
                    self.queue.send(ClientMessage::SourceFinished { source: *id });
                }
            }
            DragOrigin::Client { source: None, .. } => {}
            DragOrigin::Server { .. } => {
                self.queue.emit_server(ServerDndEvent::Finished { seat: session.seat });
            }
        }
        tracing::info!(target: DND, "{} finished", session.id);
    }

    /// The destination gave up on a dropped session without finishing it.
    pub(super) fn abandon_transfer(&mut self, session: DndSession) {
        match &session.origin {
            DragOrigin::Client { source: Some(id), .. } => {
                if self.sources.contains_key(id) {
                    self.queue.send(ClientMessage::SourceCancelled { source: *id });
                }
            }
            DragOrigin::Client { source: None, .. } => {}
            DragOrigin::Server { .. } => {
                self.queue.emit_server(ServerDndEvent::Cancelled { seat: session.seat });
            }
        }
        tracing::info!(target: DND, "{} abandoned by its destination", session.id);
    }
}
