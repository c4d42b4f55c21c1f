//! Transport-agnostic operations and their request/response shapes
//!
//! `MenuGate` wires storage, resolver and assigner together; the HTTP
//! binary maps each method to one route.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assign::{check_entries, check_role, check_store, Assigner, Entries};
use crate::config::Config;
use crate::constants::DEFAULT_SELECTED_MASK;
use crate::db::Storage;
use crate::error::{Error, Result, ValidationIssue};
use crate::mask::{parse_binary_string, to_binary_string};
use crate::model::{MenuKind, MenuNode, Role, Store, UserContext};
use crate::resolve::Resolver;
use crate::tree::{self, TreeNode};
use crate::view::{self, UserMenuNode};

// ============================================================================
// Request/Response Types
// ============================================================================

/// A mask as sent by editors: a number, or a "VCUD" string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermValue {
    Mask(i64),
    Bits(String),
}

impl PermValue {
    pub fn mask(&self) -> i64 {
        match self {
            PermValue::Mask(m) => *m,
            PermValue::Bits(s) => parse_binary_string(s) as i64,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignRoleMenus {
    pub role_id: u64,
    pub menu_ids: Vec<u64>,
    /// menu id (decimal string) -> mask
    #[serde(default)]
    pub perms: BTreeMap<String, PermValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignStoreRoleMenus {
    pub store_id: u64,
    pub role_id: u64,
    pub menu_ids: Vec<u64>,
    #[serde(default)]
    pub perms: BTreeMap<String, PermValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyStoreMenus {
    pub source_store_id: u64,
    pub target_store_id: u64,
    pub role_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGrantInfo {
    pub menu_id: u64,
    pub mask: u8,
    pub binary_string: String,
}

impl MenuGrantInfo {
    fn new(menu_id: u64, mask: u8) -> Self {
        MenuGrantInfo { menu_id, mask, binary_string: to_binary_string(mask) }
    }
}

/// Catalogue entry in the admin menu tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuTreeItem {
    pub id: u64,
    pub parent_id: u64,
    pub title: String,
    pub kind: MenuKind,
    pub sort_order: i32,
    pub children: Vec<MenuTreeItem>,
}

impl From<&TreeNode> for MenuTreeItem {
    fn from(n: &TreeNode) -> Self {
        MenuTreeItem {
            id: n.menu.id,
            parent_id: n.menu.parent_id,
            title: n.menu.title.clone(),
            kind: n.menu.kind,
            sort_order: n.menu.sort_order,
            children: n.children.iter().map(MenuTreeItem::from).collect(),
        }
    }
}

/// Turn the wire pair (`menu_ids`, `perms`) into entries.
///
/// Listed menus without a perms entry get VIEW. Perms keys must be numeric
/// and must name a listed menu.
pub fn decode_entries(menu_ids: &[u64], perms: &BTreeMap<String, PermValue>) -> (Entries, Vec<ValidationIssue>) {
    let mut issues = Vec::new();
    let mut entries: Entries = menu_ids.iter().map(|&id| (id, DEFAULT_SELECTED_MASK as i64)).collect();
    for (k, v) in perms {
        match k.trim().parse::<u64>() {
            Ok(id) if entries.contains_key(&id) => {
                entries.insert(id, v.mask());
            }
            Ok(id) => issues.push(ValidationIssue::UnselectedPermission(id)),
            Err(_) => issues.push(ValidationIssue::MalformedMenuId(k.clone())),
        }
    }
    (entries, issues)
}

fn grant_list(rows: BTreeMap<u64, u8>) -> Vec<MenuGrantInfo> {
    rows.into_iter().map(|(id, m)| MenuGrantInfo::new(id, m)).collect()
}

// ============================================================================
// Service
// ============================================================================

pub struct MenuGate {
    storage: Arc<Storage>,
    resolver: Resolver,
    assigner: Assigner,
}

impl MenuGate {
    pub fn new(storage: Arc<Storage>, config: &Config) -> Self {
        MenuGate {
            resolver: Resolver::from_config(config),
            assigner: Assigner::from_config(storage.clone(), config),
            storage,
        }
    }

    /// Open storage at `config.db_path` and build the service on it
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(Storage::open_with(config)?), config))
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn assigner(&self) -> &Assigner {
        &self.assigner
    }

    // --- catalogue ---------------------------------------------------------

    /// Whole catalogue as an ordered tree
    pub fn menu_tree(&self) -> Result<Vec<MenuTreeItem>> {
        let t = self.storage.read(|v| Ok(tree::build(v.menus()?)?))?;
        Ok(t.roots.iter().map(MenuTreeItem::from).collect())
    }

    pub fn put_menu(&self, node: &MenuNode) -> Result<()> {
        self.storage.transact(|tx| tx.put_menu(node))
    }

    pub fn delete_menu(&self, id: u64) -> Result<bool> {
        self.storage.transact(|tx| tx.delete_menu(id))
    }

    pub fn create_role(&self, code: &str, name: &str) -> Result<Role> {
        self.storage.transact(|tx| tx.create_role(code, name))
    }

    pub fn delete_role(&self, id: u64) -> Result<bool> {
        self.storage.transact(|tx| tx.delete_role(id))
    }

    pub fn create_store(&self, code: &str, name: &str) -> Result<Store> {
        self.storage.transact(|tx| tx.create_store(code, name))
    }

    pub fn delete_store(&self, id: u64) -> Result<bool> {
        self.storage.transact(|tx| tx.delete_store(id))
    }

    // --- role defaults -----------------------------------------------------

    pub fn assign_role_menus(&self, req: &AssignRoleMenus) -> Result<()> {
        let (entries, issues) = decode_entries(&req.menu_ids, &req.perms);
        if !issues.is_empty() {
            return Err(self.rejected(issues, Some(req.role_id), None, &entries));
        }
        self.assigner.assign_to_role(req.role_id, &entries)
    }

    pub fn role_menus(&self, role_id: u64) -> Result<Vec<MenuGrantInfo>> {
        self.storage.read(|v| Ok(grant_list(v.role_grants(role_id)?)))
    }

    pub fn role_menu_ids(&self, role_id: u64) -> Result<Vec<u64>> {
        self.storage.read(|v| Ok(v.role_grants(role_id)?.into_keys().collect()))
    }

    // --- store overrides ---------------------------------------------------

    pub fn assign_store_role_menus(&self, req: &AssignStoreRoleMenus) -> Result<()> {
        let (entries, issues) = decode_entries(&req.menu_ids, &req.perms);
        if !issues.is_empty() {
            return Err(self.rejected(issues, Some(req.role_id), Some(req.store_id), &entries));
        }
        self.assigner.assign_to_store_role(req.store_id, req.role_id, &entries)
    }

    pub fn store_role_menus(&self, store_id: u64, role_id: u64) -> Result<Vec<MenuGrantInfo>> {
        self.storage.read(|v| Ok(grant_list(v.store_grants(store_id, role_id)?)))
    }

    pub fn copy_store_menus(&self, req: &CopyStoreMenus) -> Result<usize> {
        self.assigner.copy_store_menus(req.source_store_id, req.target_store_id, req.role_id)
    }

    /// Decoding already failed; run the remaining checks read-only so the
    /// caller gets every issue in one response
    fn rejected(&self, mut issues: Vec<ValidationIssue>, role_id: Option<u64>, store_id: Option<u64>, entries: &Entries) -> Error {
        let more = self.storage.read(|v| {
            if let Some(s) = store_id {
                check_store(v, s, &mut issues)?;
            }
            if let Some(r) = role_id {
                check_role(v, r, &mut issues)?;
            }
            check_entries(v, entries, &mut issues)?;
            Ok(())
        });
        match more {
            Ok(()) => Error::validation(issues),
            Err(e) => e,
        }
    }

    // --- current user ------------------------------------------------------

    pub fn user_menu_tree(&self, user: &UserContext) -> Result<Vec<UserMenuNode>> {
        self.storage.read(|v| view::user_menu_tree(&self.resolver, v, user))
    }

    pub fn user_permission_codes(&self, user: &UserContext) -> Result<Vec<String>> {
        self.storage.read(|v| Ok(view::user_permission_codes(&self.resolver, v, user)?.into_iter().collect()))
    }

    pub fn has_permission(&self, user: &UserContext, code: &str) -> Result<bool> {
        self.storage.read(|v| Ok(view::user_permission_codes(&self.resolver, v, user)?.contains(code)))
    }

    /// Resolved mask of every menu for `user`, in id order
    pub fn effective_masks(&self, user: &UserContext) -> Result<Vec<MenuGrantInfo>> {
        self.storage.read(|v| {
            let (_, masks) = view::resolved_tree(&self.resolver, v, user)?;
            Ok(grant_list(masks))
        })
    }
}
