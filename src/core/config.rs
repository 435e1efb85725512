//! Data device configuration.

use crate::core::data::action::ActionPolicy;

/// What `start_dnd` does when the icon surface already has another role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconConflictPolicy {
    /// Fail the drag with `RoleConflict`.
    #[default]
    Reject,
    /// Start the drag without an icon.
    DropIcon,
}

/// Configuration for the data device
#[derive(Debug, Clone)]
pub struct DataDeviceConfig {
    /// Name of the seat created by `CompositorState::new`
    pub seat_name: String,
    /// Advertised `wl_data_device_manager` version
    pub manager_version: u32,
    /// Policy of the default action chooser
    pub action_policy: ActionPolicy,
    pub icon_conflict: IconConflictPolicy,
}

impl Default for DataDeviceConfig {
    fn default() -> Self {
        Self {
            seat_name: "seat0".to_string(),
            manager_version: 3,
            action_policy: ActionPolicy::default(),
            icon_conflict: IconConflictPolicy::default(),
        }
    }
}
