//! Four-bit permission masks and their "VCUD" wire form
//!
//! A mask is a `u8` in `[0, 15]`: View=8, Create=4, Update=2, Delete=1.
//! The binary string is the same value written MSB first, so `"1110"` is
//! view + create + update.

use serde::{Deserialize, Serialize};

use crate::constants::{ALL, CREATE, DELETE, UPDATE, VIEW};

/// Decoded form of a mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Perms {
    pub view: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Perms {
    pub const NONE: Perms = Perms { view: false, create: false, update: false, delete: false };
    pub const FULL: Perms = Perms { view: true, create: true, update: true, delete: true };

    pub fn mask(self) -> u8 {
        encode(self.view, self.create, self.update, self.delete)
    }
}

impl From<u8> for Perms {
    fn from(mask: u8) -> Self {
        decode(mask)
    }
}

/// Split a mask into its four action flags. Bits above the low four are ignored.
#[inline]
pub fn decode(mask: u8) -> Perms {
    Perms {
        view: mask & VIEW != 0,
        create: mask & CREATE != 0,
        update: mask & UPDATE != 0,
        delete: mask & DELETE != 0,
    }
}

/// Build a mask from four action flags
#[inline]
pub fn encode(view: bool, create: bool, update: bool, delete: bool) -> u8 {
    let mut m = 0;
    if view { m |= VIEW; }
    if create { m |= CREATE; }
    if update { m |= UPDATE; }
    if delete { m |= DELETE; }
    m
}

/// Render as four '0'/'1' characters in View-Create-Update-Delete order
pub fn to_binary_string(mask: u8) -> String {
    [VIEW, CREATE, UPDATE, DELETE]
        .iter()
        .map(|b| if mask & b != 0 { '1' } else { '0' })
        .collect()
}

/// Parse a "VCUD" string. Anything that is not exactly four '0'/'1'
/// characters yields 0 instead of an error, so half-typed editor input
/// degrades to "no permission".
pub fn parse_binary_string(s: &str) -> u8 {
    let bytes = s.as_bytes();
    if bytes.len() != 4 {
        return 0;
    }
    let mut m = 0u8;
    for &c in bytes {
        m <<= 1;
        match c {
            b'1' => m |= 1,
            b'0' => {}
            _ => return 0,
        }
    }
    m
}

/// True when `mask` is inside `[0, 15]`
#[inline]
pub fn is_valid(mask: i64) -> bool {
    (0..=ALL as i64).contains(&mask)
}

const NAMES: &[(&str, u8)] = &[("view", VIEW), ("create", CREATE), ("update", UPDATE), ("delete", DELETE)];

/// Convert a mask to a list of action names
pub fn mask_to_names(mask: u8) -> Vec<&'static str> {
    NAMES.iter().filter(|(_, b)| mask & b == *b).map(|(n, _)| *n).collect()
}

/// Convert a list of action names to a mask; unknown names are ignored
pub fn names_to_mask(names: &[&str]) -> u8 {
    names
        .iter()
        .filter_map(|n| NAMES.iter().find(|(k, _)| k == n).map(|(_, v)| v))
        .fold(0, |a, b| a | b)
}
