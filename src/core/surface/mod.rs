pub mod role;

pub use role::{RoleRegistry, SurfaceRole, SurfaceRoles};
