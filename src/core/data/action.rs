//! Drag'n'drop action negotiation.
//!
//! The effective action of a drag is computed from three inputs: what the
//! source permits, what the destination accepts and which modifier keys are
//! held. The computation is a plain function value so a compositor can
//! substitute its own policy; whatever it returns is clamped to the
//! intersection of the two action sets before use.

use wayland_server::protocol::wl_data_device_manager::DndAction;

/// Every action the protocol knows about.
pub fn all_actions() -> DndAction {
    DndAction::Copy | DndAction::Move | DndAction::Ask
}

/// Modifier keys relevant to action selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub logo: bool,
}

impl Modifiers {
    pub fn is_held(&self, modifier: MoveModifier) -> bool {
        match modifier {
            MoveModifier::Shift => self.shift,
            MoveModifier::Ctrl => self.ctrl,
            MoveModifier::Alt => self.alt,
            MoveModifier::Logo => self.logo,
        }
    }
}

/// The modifier that turns an ambiguous copy/move into a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveModifier {
    Shift,
    Ctrl,
    Alt,
    Logo,
}

/// Action chooser signature: `(source_actions, offer_actions, modifiers)`.
pub type ActionChooser = Box<dyn Fn(DndAction, DndAction, Modifiers) -> DndAction>;

/// Tunable default negotiation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPolicy {
    /// Resolve to `ask` when the destination accepts it and both copy and
    /// move are still possible, unless the move modifier is held.
    pub prefer_ask: bool,
    pub move_modifier: MoveModifier,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            prefer_ask: true,
            move_modifier: MoveModifier::Shift,
        }
    }
}

impl ActionPolicy {
    pub fn choose(&self, source_actions: DndAction, offer_actions: DndAction, modifiers: Modifiers) -> DndAction {
        let available = source_actions & offer_actions & all_actions();
        if available.is_empty() {
            return DndAction::empty();
        }

        let concrete = available & (DndAction::Copy | DndAction::Move);
        let move_held = modifiers.is_held(self.move_modifier);
        let ambiguous = concrete == DndAction::Copy | DndAction::Move;

        if ambiguous {
            if move_held {
                DndAction::Move
            } else if self.prefer_ask && available.contains(DndAction::Ask) {
                DndAction::Ask
            } else {
                DndAction::Copy
            }
        } else if !concrete.is_empty() {
            concrete
        } else {
            DndAction::Ask
        }
    }

    /// Box this policy as an [`ActionChooser`].
    pub fn into_chooser(self) -> ActionChooser {
        Box::new(move |source, offer, modifiers| self.choose(source, offer, modifiers))
    }
}

/// A simple action chooser for DnD negotiation, using [`ActionPolicy::default`].
pub fn default_action_chooser(source_actions: DndAction, offer_actions: DndAction, modifiers: Modifiers) -> DndAction {
    ActionPolicy::default().choose(source_actions, offer_actions, modifiers)
}

/// Reduce a chooser's answer to at most one action inside the intersection.
pub fn clamp_action(chosen: DndAction, source_actions: DndAction, offer_actions: DndAction) -> DndAction {
    let allowed = chosen & source_actions & offer_actions & all_actions();
    [DndAction::Copy, DndAction::Move, DndAction::Ask]
        .into_iter()
        .find(|action| allowed.contains(*action))
        .unwrap_or(DndAction::empty())
}
