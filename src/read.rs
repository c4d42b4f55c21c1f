//! Snapshot queries (no validation, direct LMDB access)
//!
//! The free functions take any transaction so validation inside a write
//! transaction sees the same rows a reader would.

use std::collections::BTreeMap;

use heed::RoTxn;

use crate::db::{key, key3, list_pfx, tail, Dbs, ReadView};
use crate::error::{err, Result};
use crate::model::{MenuNode, Role, RoleMenuGrant, Store, StoreRoleMenuGrant};

pub(crate) fn menus(d: &Dbs, tx: &RoTxn) -> Result<Vec<MenuNode>> {
    let mut r = Vec::new();
    for item in d.menus.iter(tx).map_err(err)? {
        let (_, node) = item.map_err(err)?;
        r.push(node);
    }
    Ok(r)
}

pub(crate) fn menu(d: &Dbs, tx: &RoTxn, id: u64) -> Result<Option<MenuNode>> {
    d.menus.get(tx, &id.to_be_bytes()).map_err(err)
}

pub(crate) fn role(d: &Dbs, tx: &RoTxn, id: u64) -> Result<Option<Role>> {
    d.roles.get(tx, &id.to_be_bytes()).map_err(err)
}

pub(crate) fn role_by_code(d: &Dbs, tx: &RoTxn, code: &str) -> Result<Option<Role>> {
    match d.role_codes.get(tx, code).map_err(err)? {
        Some(id) => role(d, tx, id),
        None => Ok(None),
    }
}

pub(crate) fn store(d: &Dbs, tx: &RoTxn, id: u64) -> Result<Option<Store>> {
    d.stores.get(tx, &id.to_be_bytes()).map_err(err)
}

/// menu_id -> mask for one role's defaults
pub(crate) fn role_grants(d: &Dbs, tx: &RoTxn, role_id: u64) -> Result<BTreeMap<u64, u8>> {
    Ok(d.role_grants
        .list_fwd(tx, role_id)?
        .into_iter()
        .map(|(menu, mask)| (menu, mask as u8))
        .collect())
}

/// menu_id -> mask for one (store, role) override set
pub(crate) fn store_grants(d: &Dbs, tx: &RoTxn, store_id: u64, role_id: u64) -> Result<BTreeMap<u64, u8>> {
    Ok(list_pfx(tx, &d.store_grants, &key(store_id, role_id))?
        .into_iter()
        .map(|(menu, mask)| (menu, mask as u8))
        .collect())
}

/// Full keys of every store grant that points at `menu_id`
pub(crate) fn store_grant_keys_for_menu(d: &Dbs, tx: &RoTxn, menu_id: u64) -> Result<Vec<Vec<u8>>> {
    let mut r = Vec::new();
    for item in d.store_grants.iter(tx).map_err(err)? {
        let (k, _) = item.map_err(err)?;
        if k.len() == 24 && tail(k) == Some(menu_id) {
            r.push(k.to_vec());
        }
    }
    Ok(r)
}

/// Full keys of every store grant whose key starts with `pfx`
pub(crate) fn store_grant_keys(d: &Dbs, tx: &RoTxn, pfx: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut r = Vec::new();
    for item in d.store_grants.prefix_iter(tx, pfx).map_err(err)? {
        let (k, _) = item.map_err(err)?;
        r.push(k.to_vec());
    }
    Ok(r)
}

/// Full keys of every store grant for `role_id`, in any store
pub(crate) fn store_grant_keys_for_role(d: &Dbs, tx: &RoTxn, role_id: u64) -> Result<Vec<Vec<u8>>> {
    let mut r = Vec::new();
    for item in d.store_grants.iter(tx).map_err(err)? {
        let (k, _) = item.map_err(err)?;
        if k.len() == 24 && u64::from_be_bytes(k[8..16].try_into().map_err(err)?) == role_id {
            r.push(k.to_vec());
        }
    }
    Ok(r)
}

impl ReadView<'_, '_> {
    /// Every menu row, in key (id) order
    pub fn menus(&self) -> Result<Vec<MenuNode>> {
        menus(self.dbs, self.txn)
    }

    pub fn menu(&self, id: u64) -> Result<Option<MenuNode>> {
        menu(self.dbs, self.txn, id)
    }

    pub fn role(&self, id: u64) -> Result<Option<Role>> {
        role(self.dbs, self.txn, id)
    }

    pub fn role_by_code(&self, code: &str) -> Result<Option<Role>> {
        role_by_code(self.dbs, self.txn, code)
    }

    pub fn roles(&self) -> Result<Vec<Role>> {
        let mut r = Vec::new();
        for item in self.dbs.roles.iter(self.txn).map_err(err)? {
            r.push(item.map_err(err)?.1);
        }
        Ok(r)
    }

    pub fn store(&self, id: u64) -> Result<Option<Store>> {
        store(self.dbs, self.txn, id)
    }

    pub fn stores(&self) -> Result<Vec<Store>> {
        let mut r = Vec::new();
        for item in self.dbs.stores.iter(self.txn).map_err(err)? {
            r.push(item.map_err(err)?.1);
        }
        Ok(r)
    }

    /// Stored role defaults (menu_id -> mask)
    pub fn role_grants(&self, role_id: u64) -> Result<BTreeMap<u64, u8>> {
        role_grants(self.dbs, self.txn, role_id)
    }

    /// Stored overrides for one store and role (menu_id -> mask)
    pub fn store_grants(&self, store_id: u64, role_id: u64) -> Result<BTreeMap<u64, u8>> {
        store_grants(self.dbs, self.txn, store_id, role_id)
    }

    /// Stored role defaults as rows
    pub fn role_grant_rows(&self, role_id: u64) -> Result<Vec<RoleMenuGrant>> {
        Ok(self
            .role_grants(role_id)?
            .into_iter()
            .map(|(menu_id, mask)| RoleMenuGrant { role_id, menu_id, mask })
            .collect())
    }

    /// Stored overrides as rows
    pub fn store_grant_rows(&self, store_id: u64, role_id: u64) -> Result<Vec<StoreRoleMenuGrant>> {
        Ok(self
            .store_grants(store_id, role_id)?
            .into_iter()
            .map(|(menu_id, mask)| StoreRoleMenuGrant { store_id, role_id, menu_id, mask })
            .collect())
    }

    pub fn role_grant(&self, role_id: u64, menu_id: u64) -> Result<Option<u8>> {
        Ok(self.dbs.role_grants.get(self.txn, role_id, menu_id)?.map(|m| m as u8))
    }

    pub fn store_grant(&self, store_id: u64, role_id: u64, menu_id: u64) -> Result<Option<u8>> {
        Ok(self
            .dbs
            .store_grants
            .get(self.txn, &key3(store_id, role_id, menu_id))
            .map_err(err)?
            .map(|m| m as u8))
    }

    /// Roles holding a default grant on `menu_id`
    pub fn roles_granted(&self, menu_id: u64) -> Result<Vec<(u64, u8)>> {
        Ok(self
            .dbs
            .role_grants
            .list_rev(self.txn, menu_id)?
            .into_iter()
            .map(|(role, mask)| (role, mask as u8))
            .collect())
    }

    pub fn is_bootstrapped(&self) -> Result<bool> {
        Ok(self.dbs.meta.get(self.txn, "boot").map_err(err)?.is_some())
    }
}
