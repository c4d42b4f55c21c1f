//! Transaction wrapper for writes
//!
//! Everything that mutates storage goes through `Tx`. Grant replacement
//! here is unchecked; callers validate first (see `assign`).

use std::collections::BTreeMap;

use heed::RwTxn;

use crate::constants::ROOT_ID;
use crate::db::{key, key3, Dbs, ReadView};
use crate::error::{err, Result, ValidationIssue};
use crate::model::{MenuKind, MenuNode, Role, Store};
use crate::read;

pub struct Tx<'e> {
    txn: RwTxn<'e>,
    dbs: &'e Dbs,
}

impl<'e> Tx<'e> {
    #[inline]
    pub(crate) fn new(dbs: &'e Dbs, txn: RwTxn<'e>) -> Self {
        Tx { txn, dbs }
    }

    #[inline]
    pub(crate) fn commit(self) -> Result<()> {
        self.txn.commit().map_err(err)
    }

    /// Read what this transaction has written so far
    pub fn view(&self) -> ReadView<'_, 'e> {
        ReadView { dbs: self.dbs, txn: &self.txn }
    }

    // ------------------------------------------------------------------
    // Menus
    // ------------------------------------------------------------------

    /// Insert or replace a menu row, keeping the table a tree
    pub fn put_menu(&mut self, node: &MenuNode) -> Result<()> {
        let invalid = |reason: &str| ValidationIssue::InvalidMenu { id: node.id, reason: reason.into() };
        if node.id == ROOT_ID {
            return Err(invalid("id 0 is reserved").into());
        }
        if node.parent_id == node.id {
            return Err(invalid("menu cannot be its own parent").into());
        }
        if node.parent_id != ROOT_ID {
            let parent = read::menu(self.dbs, &self.txn, node.parent_id)?
                .ok_or_else(|| invalid("parent does not exist"))?;
            if parent.kind == MenuKind::Action {
                return Err(invalid("parent is an action").into());
            }
            self.no_cycle(node.id, node.parent_id)?;
        }
        if node.kind == MenuKind::Action && self.has_children(node.id)? {
            return Err(invalid("action menus cannot have children").into());
        }
        self.dbs.menus.put(&mut self.txn, &node.id.to_be_bytes(), node).map_err(err)
    }

    /// Remove a leaf menu together with every grant that points at it
    pub fn delete_menu(&mut self, id: u64) -> Result<bool> {
        if self.has_children(id)? {
            return Err(ValidationIssue::MenuHasChildren(id).into());
        }
        let existed = self.dbs.menus.delete(&mut self.txn, &id.to_be_bytes()).map_err(err)?;
        self.dbs.role_grants.clear_rev(&mut self.txn, id)?;
        for k in read::store_grant_keys_for_menu(self.dbs, &self.txn, id)? {
            self.dbs.store_grants.delete(&mut self.txn, &k).map_err(err)?;
        }
        Ok(existed)
    }

    fn has_children(&self, id: u64) -> Result<bool> {
        Ok(read::menus(self.dbs, &self.txn)?.iter().any(|m| m.parent_id == id))
    }

    /// Walking up from `parent` must reach the root without meeting `id`
    fn no_cycle(&self, id: u64, parent: u64) -> Result<()> {
        let mut cur = parent;
        let mut steps = 0usize;
        let limit = self.dbs.menus.len(&self.txn).map_err(err)? as usize + 1;
        while cur != ROOT_ID {
            if cur == id || steps > limit {
                return Err(ValidationIssue::InvalidMenu { id, reason: "parent chain loops back to the menu".into() }.into());
            }
            cur = match read::menu(self.dbs, &self.txn, cur)? {
                Some(m) => m.parent_id,
                None => break,
            };
            steps += 1;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Roles and stores
    // ------------------------------------------------------------------

    /// Create a role with the next free id
    pub fn create_role(&mut self, code: &str, name: &str) -> Result<Role> {
        let role = Role { id: self.next_id("next_role_id")?, code: code.into(), name: name.into() };
        self.put_role(&role)?;
        Ok(role)
    }

    /// Insert a role with a caller-chosen id, or rename an existing one
    pub fn put_role(&mut self, role: &Role) -> Result<()> {
        if let Some(existing) = read::role(self.dbs, &self.txn, role.id)? {
            if existing.code != role.code {
                return Err(ValidationIssue::RoleCodeImmutable(role.id).into());
            }
        }
        if let Some(owner) = self.dbs.role_codes.get(&self.txn, &role.code).map_err(err)? {
            if owner != role.id {
                return Err(ValidationIssue::DuplicateRoleCode(role.code.clone()).into());
            }
        }
        self.dbs.roles.put(&mut self.txn, &role.id.to_be_bytes(), role).map_err(err)?;
        self.dbs.role_codes.put(&mut self.txn, &role.code, &role.id).map_err(err)?;
        self.bump_id("next_role_id", role.id)
    }

    pub fn rename_role(&mut self, id: u64, name: &str) -> Result<()> {
        let mut role = read::role(self.dbs, &self.txn, id)?.ok_or(ValidationIssue::UnknownRole(id))?;
        role.name = name.into();
        self.dbs.roles.put(&mut self.txn, &id.to_be_bytes(), &role).map_err(err)
    }

    /// Delete a role, its defaults and its overrides in every store
    pub fn delete_role(&mut self, id: u64) -> Result<bool> {
        let Some(role) = read::role(self.dbs, &self.txn, id)? else {
            return Ok(false);
        };
        self.dbs.role_grants.clear_fwd(&mut self.txn, id)?;
        for k in read::store_grant_keys_for_role(self.dbs, &self.txn, id)? {
            self.dbs.store_grants.delete(&mut self.txn, &k).map_err(err)?;
        }
        self.dbs.role_codes.delete(&mut self.txn, &role.code).map_err(err)?;
        self.dbs.roles.delete(&mut self.txn, &id.to_be_bytes()).map_err(err)
    }

    pub fn create_store(&mut self, code: &str, name: &str) -> Result<Store> {
        let store = Store { id: self.next_id("next_store_id")?, code: code.into(), name: name.into() };
        self.put_store(&store)?;
        Ok(store)
    }

    pub fn put_store(&mut self, store: &Store) -> Result<()> {
        self.dbs.stores.put(&mut self.txn, &store.id.to_be_bytes(), store).map_err(err)?;
        self.bump_id("next_store_id", store.id)
    }

    /// Delete a store and all of its overrides
    pub fn delete_store(&mut self, id: u64) -> Result<bool> {
        for k in read::store_grant_keys(self.dbs, &self.txn, &id.to_be_bytes())? {
            self.dbs.store_grants.delete(&mut self.txn, &k).map_err(err)?;
        }
        self.dbs.stores.delete(&mut self.txn, &id.to_be_bytes()).map_err(err)
    }

    fn next_id(&mut self, seq: &str) -> Result<u64> {
        Ok(self
            .dbs
            .meta
            .get(&self.txn, seq)
            .map_err(err)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(1u64))
    }

    /// Keep the sequence ahead of explicitly chosen ids
    fn bump_id(&mut self, seq: &str, used: u64) -> Result<()> {
        if used >= self.next_id(seq)? {
            self.dbs.meta.put(&mut self.txn, seq, &(used + 1).to_string()).map_err(err)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Grants
    // ------------------------------------------------------------------

    /// Drop every default of `role_id` and write `entries` in their place
    pub fn replace_role_grants(&mut self, role_id: u64, entries: &BTreeMap<u64, u8>) -> Result<usize> {
        let removed = self.dbs.role_grants.clear_fwd(&mut self.txn, role_id)?;
        for (&menu_id, &mask) in entries {
            self.dbs.role_grants.put(&mut self.txn, role_id, menu_id, mask as u64)?;
        }
        Ok(removed)
    }

    /// Drop every override of (`store_id`, `role_id`) and write `entries` in their place
    pub fn replace_store_grants(&mut self, store_id: u64, role_id: u64, entries: &BTreeMap<u64, u8>) -> Result<usize> {
        let old = read::store_grant_keys(self.dbs, &self.txn, &key(store_id, role_id))?;
        for k in &old {
            self.dbs.store_grants.delete(&mut self.txn, k).map_err(err)?;
        }
        for (&menu_id, &mask) in entries {
            self.dbs
                .store_grants
                .put(&mut self.txn, &key3(store_id, role_id, menu_id), &(mask as u64))
                .map_err(err)?;
        }
        Ok(old.len())
    }

    // ------------------------------------------------------------------
    // Meta
    // ------------------------------------------------------------------

    pub(crate) fn mark_bootstrapped(&mut self) -> Result<()> {
        self.dbs.meta.put(&mut self.txn, "boot", "1").map_err(err)
    }

    pub(crate) fn clear_all(&mut self) -> Result<()> {
        self.dbs.menus.clear(&mut self.txn).map_err(err)?;
        self.dbs.roles.clear(&mut self.txn).map_err(err)?;
        self.dbs.role_codes.clear(&mut self.txn).map_err(err)?;
        self.dbs.stores.clear(&mut self.txn).map_err(err)?;
        self.dbs.role_grants.fwd.clear(&mut self.txn).map_err(err)?;
        self.dbs.role_grants.rev.clear(&mut self.txn).map_err(err)?;
        self.dbs.store_grants.clear(&mut self.txn).map_err(err)?;
        self.dbs.meta.clear(&mut self.txn).map_err(err)
    }
}
