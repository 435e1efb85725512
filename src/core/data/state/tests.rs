use std::cell::RefCell;
use std::os::unix::io::OwnedFd;
use std::os::unix::net::UnixStream;
use std::rc::Rc;

use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::DataDeviceState;
use crate::core::config::{DataDeviceConfig, IconConflictPolicy};
use crate::core::data::action::Modifiers;
use crate::core::data::events::{CancelReason, ClientMessage, DataDeviceEvent, SelectionKind, ServerDndEvent};
use crate::core::data::ids::{ClientKey, OfferId, SeatId, SourceId, SurfaceKey};
use crate::core::data::metadata::SourceMetadata;
use crate::core::data::offer::OfferKind;
use crate::core::data::session::{DndState, DragTarget};
use crate::core::data::transport::{DataTransport, TransportError};
use crate::core::errors::{DataDeviceError, ProtocolViolation};
use crate::core::surface::role::SurfaceRole;
use crate::core::traits::ProtocolState;
use crate::util::logging;

const A: ClientKey = ClientKey(1);
const B: ClientKey = ClientKey(2);
const C: ClientKey = ClientKey(3);

const SURFACE_A: SurfaceKey = SurfaceKey(10);
const SURFACE_B: SurfaceKey = SurfaceKey(20);
const SURFACE_C: SurfaceKey = SurfaceKey(30);

#[derive(Default)]
struct RecordingTransport {
    sends: Vec<(SourceId, String, DndAction)>,
}

impl DataTransport for RecordingTransport {
    fn send(&mut self, source: SourceId, mime_type: &str, _fd: OwnedFd, action: DndAction) -> Result<(), TransportError> {
        self.sends.push((source, mime_type.to_string(), action));
        Ok(())
    }
}

fn pipe_fd() -> OwnedFd {
    let (ours, _theirs) = UnixStream::pair().unwrap();
    OwnedFd::from(ours)
}

fn setup_with(config: DataDeviceConfig) -> (DataDeviceState, SeatId) {
    logging::init_for_tests();
    let mut state = DataDeviceState::new(config);
    let seat = state.init_data_device("seat0");
    for client in [A, B, C] {
        state.register_data_device(seat, client, 3).unwrap();
    }
    (state, seat)
}

fn setup() -> (DataDeviceState, SeatId) {
    setup_with(DataDeviceConfig::default())
}

fn text_source(state: &mut DataDeviceState, actions: DndAction) -> SourceId {
    let source = state.create_source(A);
    state.source_offer(source, "text/plain".into()).unwrap();
    state.source_set_actions(source, actions).unwrap();
    source
}

fn target(client: ClientKey) -> DragTarget {
    let surface = match client {
        A => SURFACE_A,
        B => SURFACE_B,
        _ => SURFACE_C,
    };
    DragTarget::new(client, surface, 5.0, 5.0)
}

fn drag_offer(state: &DataDeviceState, seat: SeatId) -> Option<OfferId> {
    state.active_drag(seat).and_then(|session| session.current_offer)
}

fn live_drag_offers(state: &DataDeviceState) -> usize {
    state
        .offers
        .values()
        .filter(|offer| matches!(offer.kind, OfferKind::Drag(_)))
        .count()
}

/// Drag from A with a text source, focused on B.
fn drag_onto_b(state: &mut DataDeviceState, seat: SeatId) -> (SourceId, OfferId) {
    let source = text_source(state, DndAction::Copy | DndAction::Move);
    state.start_dnd(seat, Some(source), A, Some(SURFACE_A), None).unwrap();
    state.set_drag_focus(seat, Some(target(B))).unwrap();
    let offer = drag_offer(state, seat).unwrap();
    (source, offer)
}

// ============================================================================
// Drag and drop
// ============================================================================

#[test]
fn test_copy_drop_invokes_transport() {
    let (mut state, seat) = setup();
    let source = text_source(&mut state, DndAction::Copy | DndAction::Move);

    state.start_dnd(seat, Some(source), A, Some(SURFACE_A), None).unwrap();
    assert_eq!(state.drag_state(seat), Some(DndState::Announced));

    state.set_drag_focus(seat, Some(target(B))).unwrap();
    assert_eq!(state.drag_state(seat), Some(DndState::Dragging));
    let offer = drag_offer(&state, seat).unwrap();
    assert_eq!(state.offer(offer).unwrap().accepted_mime_type, None);
    assert!(state.offer(offer).unwrap().accepted_actions.is_empty());

    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Copy, DndAction::Copy).unwrap();
    assert_eq!(state.active_drag(seat).unwrap().negotiated_action, DndAction::Copy);

    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Dropped);
    assert!(state.active_drag(seat).is_none());

    let mut transport = RecordingTransport::default();
    state
        .offer_receive(offer, "text/plain".into(), pipe_fd(), &mut transport)
        .unwrap();
    assert_eq!(transport.sends, vec![(source, "text/plain".to_string(), DndAction::Copy)]);

    let messages = state.take_client_messages();
    assert!(messages.contains(&ClientMessage::Drop { seat, client: B }));
    assert!(messages.contains(&ClientMessage::SourceDropPerformed { source }));
    assert!(messages.contains(&ClientMessage::SourceAction {
        source,
        action: DndAction::Copy
    }));

    let events = state.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        DataDeviceEvent::Dropped { recipient, action, mime_type, .. }
            if *recipient == B && *action == DndAction::Copy && mime_type.as_deref() == Some("text/plain")
    )));

    state.offer_finish(offer).unwrap();
    assert!(state
        .take_client_messages()
        .contains(&ClientMessage::SourceFinished { source }));
    assert!(state.offer(offer).is_none());
}

#[test]
fn test_drop_without_accept_cancels() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);

    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Cancelled);
    assert!(state.offer(offer).is_none());

    let mut transport = RecordingTransport::default();
    let err = state
        .offer_receive(offer, "text/plain".into(), pipe_fd(), &mut transport)
        .unwrap_err();
    assert!(err.is_benign());
    assert!(transport.sends.is_empty());

    let messages = state.take_client_messages();
    assert!(messages.contains(&ClientMessage::SourceCancelled { source }));
    assert!(messages.contains(&ClientMessage::Leave { seat, client: B }));
    assert!(!messages.iter().any(|m| matches!(m, ClientMessage::Drop { .. })));
    assert!(state.take_events().iter().any(|e| matches!(
        e,
        DataDeviceEvent::Cancelled {
            reason: CancelReason::NotAccepted,
            ..
        }
    )));
}

#[test]
fn test_reject_with_null_mime_cancels_drop() {
    let (mut state, seat) = setup();
    let (_source, offer) = drag_onto_b(&mut state, seat);

    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Copy, DndAction::Copy).unwrap();
    state.offer_accept(offer, None).unwrap();

    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Cancelled);
}

#[test]
fn test_focus_change_replaces_offer() {
    let (mut state, seat) = setup();
    let (_source, offer_b) = drag_onto_b(&mut state, seat);
    state.offer_accept(offer_b, Some("text/plain".into())).unwrap();
    state.take_client_messages();

    state.set_drag_focus(seat, Some(target(C))).unwrap();
    assert!(state.offer(offer_b).is_none());

    let offer_c = drag_offer(&state, seat).unwrap();
    assert_ne!(offer_b, offer_c);
    let created = state.offer(offer_c).unwrap();
    assert_eq!(created.recipient, C);
    assert_eq!(created.accepted_mime_type, None);
    assert!(created.accepted_actions.is_empty());

    let messages = state.take_client_messages();
    let leave = messages
        .iter()
        .position(|m| *m == ClientMessage::Leave { seat, client: B })
        .unwrap();
    let new_offer = messages
        .iter()
        .position(|m| matches!(m, ClientMessage::DataOffer { client, .. } if *client == C))
        .unwrap();
    assert!(leave < new_offer);
}

#[test]
fn test_single_offer_per_session() {
    let (mut state, seat) = setup();
    let (_source, _offer) = drag_onto_b(&mut state, seat);

    for client in [C, B, A, C, C, B] {
        state.set_drag_focus(seat, Some(target(client))).unwrap();
        assert!(live_drag_offers(&state) <= 1);
        state.drag_motion(seat, 10, 6.0, 7.0).unwrap();
        assert!(live_drag_offers(&state) <= 1);
    }
    state.set_drag_focus(seat, None).unwrap();
    assert_eq!(live_drag_offers(&state), 0);
    assert_eq!(state.drag_state(seat), Some(DndState::Announced));
}

#[test]
fn test_motion_only_reaches_focused_recipient() {
    let (mut state, seat) = setup();
    let _ = drag_onto_b(&mut state, seat);
    state.take_client_messages();

    state.drag_motion(seat, 42, 8.0, 9.0).unwrap();
    assert_eq!(
        state.take_client_messages(),
        vec![ClientMessage::Motion {
            seat,
            client: B,
            time: 42,
            x: 8.0,
            y: 9.0
        }]
    );
    assert!(state
        .take_events()
        .iter()
        .any(|e| matches!(e, DataDeviceEvent::DragMotion { recipient: Some(B), .. })));
}

#[test]
fn test_second_drag_is_rejected() {
    let (mut state, seat) = setup();
    let source = text_source(&mut state, DndAction::Copy);
    let first = state.start_dnd(seat, Some(source), A, None, None).unwrap();

    let other = state.create_source(B);
    let err = state.start_dnd(seat, Some(other), B, None, None).unwrap_err();
    assert!(matches!(err, DataDeviceError::SeatBusy(s) if s == seat));

    let session = state.active_drag(seat).unwrap();
    assert_eq!(session.id, first);
    assert_eq!(session.state(), DndState::Announced);
}

#[test]
fn test_destroying_source_cancels_drag() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);
    state.take_client_messages();

    state.destroy_source(source).unwrap();

    assert!(state.active_drag(seat).is_none());
    assert!(state.offer(offer).is_none());
    assert!(matches!(
        state.with_source_metadata(source, |m| m.mime_types.clone()),
        Err(DataDeviceError::SourceGone(_))
    ));
    assert!(matches!(
        state.source_offer(source, "text/html".into()),
        Err(DataDeviceError::SourceGone(_))
    ));

    let messages = state.take_client_messages();
    assert!(messages.contains(&ClientMessage::Leave { seat, client: B }));
    assert!(!messages.contains(&ClientMessage::SourceCancelled { source }));
    assert!(state.take_events().iter().any(|e| matches!(
        e,
        DataDeviceEvent::Cancelled {
            reason: CancelReason::SourceDestroyed,
            ..
        }
    )));
}

#[test]
fn test_focus_after_drop_is_refused() {
    let (mut state, seat) = setup();
    let (_source, offer) = drag_onto_b(&mut state, seat);
    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Copy, DndAction::Copy).unwrap();
    state.drop_dnd(seat).unwrap();

    let err = state.set_drag_focus(seat, Some(target(C))).unwrap_err();
    assert!(matches!(err, DataDeviceError::NoActiveDrag(_)));
    assert!(state.offer(offer).is_some());
}

#[test]
fn test_cancel_finalizes_source() {
    let (mut state, seat) = setup();
    let (source, _offer) = drag_onto_b(&mut state, seat);
    state.cancel_dnd(seat).unwrap();

    assert!(matches!(
        state.source_offer(source, "text/html".into()),
        Err(DataDeviceError::SourceFinalized(_))
    ));
    assert!(state.take_events().iter().any(|e| matches!(
        e,
        DataDeviceEvent::Cancelled {
            reason: CancelReason::Aborted,
            ..
        }
    )));
}

#[test]
fn test_modifiers_renegotiate() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);
    let both = DndAction::Copy | DndAction::Move;
    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, both, DndAction::Copy).unwrap();
    assert_eq!(state.active_drag(seat).unwrap().negotiated_action, DndAction::Copy);
    state.take_client_messages();

    let shift = Modifiers {
        shift: true,
        ..Default::default()
    };
    state.set_modifiers(seat, shift).unwrap();
    assert_eq!(state.active_drag(seat).unwrap().negotiated_action, DndAction::Move);

    let messages = state.take_client_messages();
    assert!(messages.contains(&ClientMessage::OfferAction {
        offer,
        action: DndAction::Move
    }));
    assert!(messages.contains(&ClientMessage::SourceAction {
        source,
        action: DndAction::Move
    }));
    assert_eq!(state.source(source).unwrap().current_action, DndAction::Move);
}

#[test]
fn test_custom_chooser_is_clamped() {
    let (mut state, seat) = setup();
    state.set_action_chooser(|_, _, _| DndAction::Copy | DndAction::Move | DndAction::Ask);
    let (_source, offer) = drag_onto_b(&mut state, seat);

    state.offer_set_actions(offer, DndAction::Move, DndAction::Move).unwrap();
    assert_eq!(state.active_drag(seat).unwrap().negotiated_action, DndAction::Move);
}

#[test]
fn test_ask_must_be_resolved_before_finish() {
    let (mut state, seat) = setup();
    let everything = DndAction::Copy | DndAction::Move | DndAction::Ask;
    let source = text_source(&mut state, everything);
    state.start_dnd(seat, Some(source), A, None, None).unwrap();
    state.set_drag_focus(seat, Some(target(B))).unwrap();
    let offer = drag_offer(&state, seat).unwrap();

    assert!(matches!(
        state.offer_finish(offer),
        Err(DataDeviceError::Protocol(ProtocolViolation::InvalidFinish(_)))
    ));

    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, everything, DndAction::Ask).unwrap();
    assert_eq!(state.active_drag(seat).unwrap().negotiated_action, DndAction::Ask);
    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Dropped);

    assert!(matches!(
        state.offer_finish(offer),
        Err(DataDeviceError::Protocol(ProtocolViolation::InvalidFinish(_)))
    ));

    state.offer_set_actions(offer, DndAction::Move, DndAction::Move).unwrap();
    assert!(state
        .take_client_messages()
        .contains(&ClientMessage::SourceAction {
            source,
            action: DndAction::Move
        }));
    state.offer_finish(offer).unwrap();
}

#[test]
fn test_unknown_mime_type_is_a_protocol_error() {
    let (mut state, seat) = setup();
    let (_source, offer) = drag_onto_b(&mut state, seat);
    let err = state.offer_accept(offer, Some("image/png".into())).unwrap_err();
    assert!(matches!(
        err,
        DataDeviceError::Protocol(ProtocolViolation::UnknownMimeType { .. })
    ));

    let err = state
        .offer_set_actions(offer, DndAction::Copy, DndAction::Move)
        .unwrap_err();
    assert!(matches!(err, DataDeviceError::Protocol(ProtocolViolation::InvalidAction)));
}

#[test]
fn test_invalid_source_action_mask() {
    let (mut state, _seat) = setup();
    let source = state.create_source(A);
    let err = state
        .source_set_actions(source, DndAction::from_bits_retain(0x10))
        .unwrap_err();
    assert!(matches!(
        err,
        DataDeviceError::Protocol(ProtocolViolation::InvalidActionMask(0x10))
    ));
}

#[test]
fn test_source_actions_are_fixed_once_dragging() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);
    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Copy, DndAction::Copy).unwrap();

    let err = state.source_set_actions(source, DndAction::Move).unwrap_err();
    assert!(matches!(
        err,
        DataDeviceError::Protocol(ProtocolViolation::InvalidSource(id)) if id == source
    ));
    let allowed = state.with_source_metadata(source, |m| m.dnd_action).unwrap();
    assert_eq!(allowed, DndAction::Copy | DndAction::Move);

    let negotiated = state.active_drag(seat).unwrap().negotiated_action;
    assert!(allowed.contains(negotiated));
    assert_eq!(negotiated, DndAction::Copy);
}

#[test]
fn test_destroying_current_offer_clears_target() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);
    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Copy, DndAction::Copy).unwrap();
    state.take_client_messages();

    state.destroy_offer(offer).unwrap();
    let session = state.active_drag(seat).unwrap();
    assert_eq!(session.state(), DndState::Dragging);
    assert_eq!(session.current_offer, None);
    assert!(session.negotiated_action.is_empty());
    assert_eq!(state.source(source).unwrap().current_action, DndAction::empty());

    let messages = state.take_client_messages();
    assert!(messages.contains(&ClientMessage::SourceTarget {
        source,
        mime_type: None,
    }));
    assert!(messages.contains(&ClientMessage::SourceAction {
        source,
        action: DndAction::empty(),
    }));
    assert!(!messages
        .iter()
        .any(|m| matches!(m, ClientMessage::OfferAction { .. })));

    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Cancelled);
}

#[test]
fn test_destroying_dropped_offer_without_finish_cancels_source() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);
    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Copy, DndAction::Copy).unwrap();
    state.drop_dnd(seat).unwrap();
    state.take_client_messages();

    state.destroy_offer(offer).unwrap();
    assert_eq!(
        state.take_client_messages(),
        vec![ClientMessage::SourceCancelled { source }]
    );
}

#[test]
fn test_legacy_recipient_finishes_on_destroy() {
    let (mut state, seat) = setup();
    let legacy = ClientKey(9);
    state.register_data_device(seat, legacy, 2).unwrap();
    let source = text_source(&mut state, DndAction::Copy | DndAction::Move);
    state.start_dnd(seat, Some(source), A, None, None).unwrap();
    state
        .set_drag_focus(seat, Some(DragTarget::new(legacy, SurfaceKey(90), 0.0, 0.0)))
        .unwrap();

    let offer = drag_offer(&state, seat).unwrap();
    assert!(state.offer(offer).unwrap().legacy);
    assert_eq!(state.active_drag(seat).unwrap().negotiated_action, DndAction::Copy);

    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Dropped);
    let messages = state.take_client_messages();
    assert!(!messages.iter().any(|m| matches!(m, ClientMessage::OfferAction { .. })));

    state.destroy_offer(offer).unwrap();
    assert!(state
        .take_client_messages()
        .contains(&ClientMessage::SourceFinished { source }));
}

#[test]
fn test_sourceless_drag_stays_within_origin() {
    let (mut state, seat) = setup();
    state.start_dnd(seat, None, A, Some(SURFACE_A), None).unwrap();

    state.set_drag_focus(seat, Some(target(B))).unwrap();
    assert_eq!(state.drag_state(seat), Some(DndState::Announced));
    assert!(drag_offer(&state, seat).is_none());

    state.set_drag_focus(seat, Some(target(A))).unwrap();
    assert_eq!(state.drag_state(seat), Some(DndState::Dragging));
    assert!(state.take_client_messages().contains(&ClientMessage::Enter {
        seat,
        client: A,
        surface: SURFACE_A,
        x: 5.0,
        y: 5.0,
        offer: None,
    }));

    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Dropped);
}

#[test]
fn test_recipient_without_device_gets_nothing() {
    let (mut state, seat) = setup();
    let lurker = ClientKey(7);
    let source = text_source(&mut state, DndAction::Copy);
    state.start_dnd(seat, Some(source), A, None, None).unwrap();
    state.take_client_messages();

    state
        .set_drag_focus(seat, Some(DragTarget::new(lurker, SurfaceKey(70), 0.0, 0.0)))
        .unwrap();
    assert_eq!(state.drag_state(seat), Some(DndState::Announced));
    assert!(state.take_client_messages().is_empty());
    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Cancelled);
}

// ============================================================================
// Icons
// ============================================================================

#[test]
fn test_icon_role_is_held_for_the_drag() {
    let (mut state, seat) = setup();
    let icon = SurfaceKey(99);
    let source = text_source(&mut state, DndAction::Copy);
    state.start_dnd(seat, Some(source), A, None, Some(icon)).unwrap();
    assert_eq!(state.roles().role_of(icon), SurfaceRole::DndIcon);

    state.cancel_dnd(seat).unwrap();
    assert_eq!(state.roles().role_of(icon), SurfaceRole::None);
}

#[test]
fn test_icon_role_conflict() {
    let (mut state, seat) = setup();
    let icon = SurfaceKey(99);
    state.roles_mut().give_role(icon, SurfaceRole::Toplevel).unwrap();

    let source = text_source(&mut state, DndAction::Copy);
    let err = state.start_dnd(seat, Some(source), A, None, Some(icon)).unwrap_err();
    assert!(matches!(err, DataDeviceError::RoleConflict { role: "toplevel", .. }));
    assert!(state.active_drag(seat).is_none());

    let config = DataDeviceConfig {
        icon_conflict: IconConflictPolicy::DropIcon,
        ..Default::default()
    };
    let (mut state, seat) = setup_with(config);
    state.roles_mut().give_role(icon, SurfaceRole::Toplevel).unwrap();
    let source = text_source(&mut state, DndAction::Copy);
    state.start_dnd(seat, Some(source), A, None, Some(icon)).unwrap();
    assert_eq!(state.active_drag(seat).unwrap().icon, None);
    assert_eq!(state.roles().role_of(icon), SurfaceRole::Toplevel);
}

// ============================================================================
// Server-initiated drags
// ============================================================================

#[test]
fn test_server_drag() {
    let (mut state, seat) = setup();
    let requested = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&requested);
    let metadata = SourceMetadata::new(["text/uri-list"], DndAction::Copy | DndAction::Move);

    state
        .start_server_dnd(
            seat,
            metadata,
            move |mime: &str, _fd: OwnedFd| -> Result<(), TransportError> {
                log.borrow_mut().push(mime.to_string());
                Ok(())
            },
            None,
        )
        .unwrap();
    assert!(state.take_events().iter().any(|e| matches!(
        e,
        DataDeviceEvent::DragStarted {
            origin: None,
            source: None,
            ..
        }
    )));

    state.set_drag_focus(seat, Some(target(B))).unwrap();
    let offer = drag_offer(&state, seat).unwrap();
    state.offer_accept(offer, Some("text/uri-list".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Move, DndAction::Move).unwrap();
    assert_eq!(
        state.take_server_events(),
        vec![ServerDndEvent::Action {
            seat,
            action: DndAction::Move
        }]
    );

    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Dropped);
    assert_eq!(state.take_server_events(), vec![ServerDndEvent::Dropped { seat }]);

    let mut transport = RecordingTransport::default();
    state
        .offer_receive(offer, "text/uri-list".into(), pipe_fd(), &mut transport)
        .unwrap();
    assert_eq!(*requested.borrow(), vec!["text/uri-list".to_string()]);
    assert!(transport.sends.is_empty());

    state.offer_finish(offer).unwrap();
    assert_eq!(state.take_server_events(), vec![ServerDndEvent::Finished { seat }]);
}

#[test]
fn test_server_drag_cancel() {
    let (mut state, seat) = setup();
    let metadata = SourceMetadata::new(["text/plain"], DndAction::Copy);
    state
        .start_server_dnd(seat, metadata, |_: &str, _: OwnedFd| -> Result<(), TransportError> { Ok(()) }, None)
        .unwrap();
    state.set_drag_focus(seat, Some(target(C))).unwrap();
    assert_eq!(state.drop_dnd(seat).unwrap(), DndState::Cancelled);
    assert_eq!(state.take_server_events(), vec![ServerDndEvent::Cancelled { seat }]);
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_clearing_selection_notifies_previous_source_once() {
    let (mut state, seat) = setup();
    let source = text_source(&mut state, DndAction::empty());
    state.set_data_device_selection(seat, Some(source)).unwrap();
    state.take_client_messages();

    state.set_data_device_selection(seat, None).unwrap();
    assert!(state.seat(seat).unwrap().selection.is_none());
    let cancelled = state
        .take_client_messages()
        .into_iter()
        .filter(|m| *m == ClientMessage::SourceCancelled { source })
        .count();
    assert_eq!(cancelled, 1);

    state.set_data_device_selection(seat, None).unwrap();
    assert!(state.take_client_messages().is_empty());
}

#[test]
fn test_destroyed_selection_is_not_notified() {
    let (mut state, seat) = setup();
    let source = text_source(&mut state, DndAction::empty());
    state.set_data_device_selection(seat, Some(source)).unwrap();
    state.set_data_device_focus(seat, Some(B)).unwrap();
    state.take_client_messages();
    state.take_events();

    state.destroy_source(source).unwrap();
    let messages = state.take_client_messages();
    assert!(!messages.contains(&ClientMessage::SourceCancelled { source }));
    assert!(messages.contains(&ClientMessage::Selection {
        seat,
        client: B,
        offer: None
    }));
    assert_eq!(
        state.take_events(),
        vec![DataDeviceEvent::SelectionChanged {
            seat,
            selection: SelectionKind::Cleared
        }]
    );
    assert!(state.seat(seat).unwrap().selection_offer.is_none());
}

#[test]
fn test_selection_follows_focus() {
    let (mut state, seat) = setup();
    let source = text_source(&mut state, DndAction::empty());
    state.set_data_device_selection(seat, Some(source)).unwrap();
    assert!(state.is_selection(source));

    state.set_data_device_focus(seat, Some(B)).unwrap();
    let offer_b = state.seat(seat).unwrap().selection_offer.unwrap();
    assert_eq!(state.offer(offer_b).unwrap().recipient, B);

    state.set_data_device_focus(seat, Some(C)).unwrap();
    assert!(state.offer(offer_b).is_none());
    let offer_c = state.seat(seat).unwrap().selection_offer.unwrap();
    assert_eq!(state.offer(offer_c).unwrap().recipient, C);

    let selection_offers = state
        .offers
        .values()
        .filter(|offer| offer.kind == OfferKind::Selection)
        .count();
    assert_eq!(selection_offers, 1);

    let mut transport = RecordingTransport::default();
    state
        .offer_receive(offer_c, "text/plain".into(), pipe_fd(), &mut transport)
        .unwrap();
    assert_eq!(transport.sends, vec![(source, "text/plain".to_string(), DndAction::empty())]);

    state.set_data_device_focus(seat, None).unwrap();
    assert!(state.offer(offer_c).is_none());
}

#[test]
fn test_selection_source_cannot_be_dragged() {
    let (mut state, seat) = setup();
    let source = text_source(&mut state, DndAction::Copy);
    state.set_data_device_selection(seat, Some(source)).unwrap();
    let err = state.start_dnd(seat, Some(source), A, None, None).unwrap_err();
    assert!(matches!(
        err,
        DataDeviceError::Protocol(ProtocolViolation::InvalidSource(_))
    ));
}

#[test]
fn test_selection_offer_rejects_set_actions() {
    let (mut state, seat) = setup();
    let source = text_source(&mut state, DndAction::empty());
    state.set_data_device_selection(seat, Some(source)).unwrap();
    state.set_data_device_focus(seat, Some(B)).unwrap();
    let offer = state.seat(seat).unwrap().selection_offer.unwrap();

    let err = state
        .offer_set_actions(offer, DndAction::Copy, DndAction::Copy)
        .unwrap_err();
    assert!(matches!(
        err,
        DataDeviceError::Protocol(ProtocolViolation::InvalidOffer(id)) if id == offer
    ));

    let err = state.source_set_actions(source, DndAction::Copy).unwrap_err();
    assert!(matches!(
        err,
        DataDeviceError::Protocol(ProtocolViolation::InvalidSource(_))
    ));
}

#[test]
fn test_compositor_selection() {
    let (mut state, seat) = setup();
    let written = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&written);
    state
        .set_compositor_selection(
            seat,
            SourceMetadata::new(["text/plain", "text/plain"], DndAction::empty()),
            move |mime: &str, _fd: OwnedFd| -> Result<(), TransportError> {
                log.borrow_mut().push(mime.to_string());
                Ok(())
            },
        )
        .unwrap();
    state.set_data_device_focus(seat, Some(B)).unwrap();

    let offer = state.seat(seat).unwrap().selection_offer.unwrap();
    assert_eq!(state.offer(offer).unwrap().advertised.mime_types, vec!["text/plain".to_string()]);

    let mut transport = RecordingTransport::default();
    state
        .offer_receive(offer, "text/plain".into(), pipe_fd(), &mut transport)
        .unwrap();
    state
        .offer_receive(offer, "image/png".into(), pipe_fd(), &mut transport)
        .unwrap();
    assert_eq!(*written.borrow(), vec!["text/plain".to_string()]);
}

#[test]
fn test_device_bound_after_focus_gets_selection() {
    let (mut state, seat) = setup();
    let late = ClientKey(5);
    let source = text_source(&mut state, DndAction::empty());
    state.set_data_device_selection(seat, Some(source)).unwrap();
    state.set_data_device_focus(seat, Some(late)).unwrap();
    assert!(state.seat(seat).unwrap().selection_offer.is_none());

    state.register_data_device(seat, late, 3).unwrap();
    let offer = state.seat(seat).unwrap().selection_offer.unwrap();
    assert_eq!(state.offer(offer).unwrap().recipient, late);
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_metadata_snapshot() {
    let (mut state, _seat) = setup();
    let source = text_source(&mut state, DndAction::Copy);
    let before = state.source(source).unwrap().snapshot();

    state.source_offer(source, "text/html".into()).unwrap();
    state.source_offer(source, "text/plain".into()).unwrap();

    assert_eq!(before.mime_types, vec!["text/plain".to_string()]);
    let (mimes, actions) = state
        .with_source_metadata(source, |m| (m.mime_types.clone(), m.dnd_action))
        .unwrap();
    assert_eq!(mimes, vec!["text/plain".to_string(), "text/html".to_string()]);
    assert_eq!(actions, DndAction::Copy);
}

#[test]
fn test_new_source_event() {
    let (mut state, _seat) = setup();
    let source = state.create_source(C);
    assert_eq!(
        state.take_events(),
        vec![DataDeviceEvent::NewSource { source, client: C }]
    );
}

#[test]
fn test_unknown_seat() {
    let (mut state, _seat) = setup();
    let err = state.set_data_device_focus(SeatId(77), Some(A)).unwrap_err();
    assert!(matches!(err, DataDeviceError::UnknownSeat(SeatId(77))));
}

// ============================================================================
// Disconnects
// ============================================================================

#[test]
fn test_origin_disconnect_cancels_drag() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);
    state.take_client_messages();

    state.client_disconnected(A);

    assert!(state.active_drag(seat).is_none());
    assert!(state.source(source).is_none());
    assert!(state.offer(offer).is_none());
    assert!(state
        .take_client_messages()
        .contains(&ClientMessage::Leave { seat, client: B }));
}

#[test]
fn test_recipient_disconnect_unfocuses_drag() {
    let (mut state, seat) = setup();
    let (_source, offer) = drag_onto_b(&mut state, seat);
    state.take_client_messages();

    state.client_disconnected(B);

    assert_eq!(state.drag_state(seat), Some(DndState::Announced));
    assert!(state.offer(offer).is_none());
    assert!(!state
        .take_client_messages()
        .iter()
        .any(|m| matches!(m, ClientMessage::Leave { client: B, .. })));

    state.set_drag_focus(seat, Some(target(C))).unwrap();
    assert_eq!(state.drag_state(seat), Some(DndState::Dragging));
}

#[test]
fn test_recipient_disconnect_after_drop_cancels_source() {
    let (mut state, seat) = setup();
    let (source, offer) = drag_onto_b(&mut state, seat);
    state.offer_accept(offer, Some("text/plain".into())).unwrap();
    state.offer_set_actions(offer, DndAction::Copy, DndAction::Copy).unwrap();
    state.drop_dnd(seat).unwrap();
    state.take_client_messages();

    state.client_disconnected(B);
    assert!(state.seat(seat).unwrap().dropped.is_empty());
    assert_eq!(
        state.take_client_messages(),
        vec![ClientMessage::SourceCancelled { source }]
    );
}

#[test]
fn test_destroyed_icon_is_dropped_from_drag() {
    let (mut state, seat) = setup();
    let icon = SurfaceKey(99);
    let source = text_source(&mut state, DndAction::Copy);
    state.start_dnd(seat, Some(source), A, None, Some(icon)).unwrap();

    state.surface_destroyed(icon);
    assert_eq!(state.active_drag(seat).unwrap().icon, None);
    assert!(state.roles().role_of(icon).is_none());
    state.cancel_dnd(seat).unwrap();
}
