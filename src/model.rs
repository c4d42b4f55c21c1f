//! Rows and caller identity

use serde::{Deserialize, Serialize};

/// What a menu node is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuKind {
    /// Navigational grouping; never permissioned on its own
    Catalog,
    /// A listing screen
    View,
    /// A button-level operation; always a leaf
    Action,
}

impl MenuKind {
    /// Catalog and View nodes make up the navigation tree
    pub fn is_navigable(self) -> bool {
        !matches!(self, MenuKind::Action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    pub id: u64,
    /// 0 for top-level nodes
    pub parent_id: u64,
    pub name: String,
    pub title: String,
    pub kind: MenuKind,
    /// e.g. `system:user` or `system:user:add`
    #[serde(default)]
    pub permission_code: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default = "yes")]
    pub enabled: bool,
}

fn yes() -> bool {
    true
}

impl MenuNode {
    pub fn new(id: u64, parent_id: u64, kind: MenuKind, name: &str, title: &str, code: &str) -> Self {
        MenuNode {
            id,
            parent_id,
            name: name.to_string(),
            title: title.to_string(),
            kind,
            permission_code: code.to_string(),
            sort_order: 0,
            visible: true,
            enabled: true,
        }
    }

    pub fn sorted(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub code: String,
    pub name: String,
}

/// Tenant boundary; the core only needs to know it exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: u64,
    pub code: String,
    pub name: String,
}

/// Role default for one menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMenuGrant {
    pub role_id: u64,
    pub menu_id: u64,
    pub mask: u8,
}

/// Per-store override of a role default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRoleMenuGrant {
    pub store_id: u64,
    pub role_id: u64,
    pub menu_id: u64,
    pub mask: u8,
}

/// Who is asking, as established by the auth layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub role_id: u64,
    pub store_id: u64,
    pub role_code: String,
}

impl UserContext {
    pub fn new(role_id: u64, store_id: u64, role_code: impl Into<String>) -> Self {
        UserContext { role_id, store_id, role_code: role_code.into() }
    }
}

/// Key a replace transaction serializes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GrantScope {
    Role { role_id: u64 },
    StoreRole { store_id: u64, role_id: u64 },
}

impl std::fmt::Display for GrantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantScope::Role { role_id } => write!(f, "role {}", role_id),
            GrantScope::StoreRole { store_id, role_id } => write!(f, "store {} role {}", store_id, role_id),
        }
    }
}
