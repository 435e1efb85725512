use std::collections::HashMap;

use crate::core::data::ids::SurfaceKey;
use crate::core::errors::{DataDeviceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    None,
    /// Any role the embedding compositor assigns outside the data device.
    Toplevel,
    DndIcon,
}

impl Default for SurfaceRole {
    fn default() -> Self {
        Self::None
    }
}

impl SurfaceRole {
    pub fn is_none(&self) -> bool {
        matches!(self, SurfaceRole::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceRole::None => "none",
            SurfaceRole::Toplevel => "toplevel",
            SurfaceRole::DndIcon => "dnd_icon",
        }
    }
}

/// Surface role bookkeeping used by the data device for drag icons.
///
/// A surface holds at most one role. Giving it the role it already has is
/// accepted, any other role is a conflict.
pub trait RoleRegistry {
    fn give_role(&mut self, surface: SurfaceKey, role: SurfaceRole) -> Result<()>;

    /// Release `role` from `surface`. Does nothing if the surface holds a
    /// different role.
    fn remove_role(&mut self, surface: SurfaceKey, role: SurfaceRole);

    fn role_of(&self, surface: SurfaceKey) -> SurfaceRole;

    /// Forget a destroyed surface.
    fn surface_destroyed(&mut self, _surface: SurfaceKey) {}
}

/// In-memory role registry.
#[derive(Debug, Default)]
pub struct SurfaceRoles {
    roles: HashMap<SurfaceKey, SurfaceRole>,
}

impl SurfaceRoles {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleRegistry for SurfaceRoles {
    fn give_role(&mut self, surface: SurfaceKey, role: SurfaceRole) -> Result<()> {
        match self.roles.get(&surface).copied().unwrap_or_default() {
            current if current.is_none() || current == role => {
                self.roles.insert(surface, role);
                Ok(())
            }
            current => Err(DataDeviceError::RoleConflict {
                surface,
                role: current.name(),
            }),
        }
    }

    fn remove_role(&mut self, surface: SurfaceKey, role: SurfaceRole) {
        if self.roles.get(&surface) == Some(&role) {
            self.roles.remove(&surface);
        }
    }

    fn role_of(&self, surface: SurfaceKey) -> SurfaceRole {
        self.roles.get(&surface).copied().unwrap_or_default()
    }

    fn surface_destroyed(&mut self, surface: SurfaceKey) {
        self.roles.remove(&surface);
    }
}
