//! Stable identifiers for the objects tracked by the data device core.
//!
//! The state machine never holds protocol objects directly. Sources,
//! offers, sessions, seats, clients and surfaces are all referred to by
//! small copyable keys; the protocol layer keeps the mapping back to
//! real resources.

use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// One logical input seat.
    SeatId, "seat"
);
id_type!(
    /// A connected client, as seen by the data device.
    ClientKey, "client"
);
id_type!(
    /// A surface known to the compositor (drag origin, icon or target).
    SurfaceKey, "surface"
);
id_type!(
    /// A client-created data source.
    SourceId, "source"
);
id_type!(
    /// A per-recipient data offer.
    OfferId, "offer"
);
id_type!(
    /// One drag-and-drop session.
    SessionId, "dnd"
);

/// Monotonic id generator.
///
/// Ids start at 1 and are handed out in order. After `u32::MAX` the counter
/// wraps back to 1, skipping 0, so an id is only reused after 2^32 - 1
/// allocations.
#[derive(Debug, Clone)]
pub struct IdCounter {
    next: u32,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdCounter {
    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}
