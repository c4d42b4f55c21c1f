//! Permission bits and reserved values

use std::time::Duration;

// Permission bits, most significant first (binary string order is V-C-U-D)
pub const VIEW: u8 = 1 << 3;
pub const CREATE: u8 = 1 << 2;
pub const UPDATE: u8 = 1 << 1;
pub const DELETE: u8 = 1;

/// Every action bit; also the upper bound of a valid mask
pub const ALL: u8 = VIEW | CREATE | UPDATE | DELETE;

/// parent_id of top-level menus; never a real node id
pub const ROOT_ID: u64 = 0;

/// Role code that short-circuits resolution to ALL unless reconfigured
pub const SUPER_ADMIN_CODE: &str = "super_admin";

/// Mask given to a selected menu that carries no explicit perms entry
pub const DEFAULT_SELECTED_MASK: u8 = VIEW;

// Replace-transaction serialization
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(250);
pub const DEFAULT_ASSIGN_RETRIES: u32 = 3;

// Action-code suffixes, paired with the bit that gates them
pub const ACTION_SUFFIXES: &[(u8, &str)] = &[
    (CREATE, "add"),
    (UPDATE, "edit"),
    (DELETE, "delete"),
];
