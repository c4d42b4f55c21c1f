//! Replace-semantics grant assignment
//!
//! An assignment supersedes the whole grant set of its key: every menu left
//! out of `entries` ends up with no row at all. Validation, delete and insert
//! happen in one write transaction, and writers on the same key are
//! serialized through a per-key lock, so readers only ever see the complete
//! old set or the complete new set.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{DEFAULT_ASSIGN_RETRIES, DEFAULT_LOCK_WAIT};
use crate::db::{ReadView, Storage};
use crate::error::{check, Error, Result, ValidationIssue};
use crate::mask;
use crate::model::GrantScope;
use crate::tx::Tx;

/// Requested grant set: menu_id -> mask, masks not yet range-checked
pub type Entries = BTreeMap<u64, i64>;

pub(crate) fn check_role(view: &ReadView<'_, '_>, role_id: u64, issues: &mut Vec<ValidationIssue>) -> Result<()> {
    if view.role(role_id)?.is_none() {
        issues.push(ValidationIssue::UnknownRole(role_id));
    }
    Ok(())
}

pub(crate) fn check_store(view: &ReadView<'_, '_>, store_id: u64, issues: &mut Vec<ValidationIssue>) -> Result<()> {
    if view.store(store_id)?.is_none() {
        issues.push(ValidationIssue::UnknownStore(store_id));
    }
    Ok(())
}

/// Range-check masks and confirm every menu exists; returns the accepted rows
pub(crate) fn check_entries(
    view: &ReadView<'_, '_>,
    entries: &Entries,
    issues: &mut Vec<ValidationIssue>,
) -> Result<BTreeMap<u64, u8>> {
    let mut rows = BTreeMap::new();
    for (&menu_id, &m) in entries {
        if view.menu(menu_id)?.is_none() {
            issues.push(ValidationIssue::UnknownMenu(menu_id));
        }
        if mask::is_valid(m) {
            rows.insert(menu_id, m as u8);
        } else {
            issues.push(ValidationIssue::MaskOutOfRange { menu_id, mask: m });
        }
    }
    Ok(rows)
}

/// Validate and replace one (store, role) override set inside `tx`.
/// `issues` may already hold problems found by the caller; they are
/// reported together with these.
pub(crate) fn replace_store_role(
    tx: &mut Tx<'_>,
    store_id: u64,
    role_id: u64,
    entries: &Entries,
    mut issues: Vec<ValidationIssue>,
) -> Result<usize> {
    let rows = {
        let view = tx.view();
        check_store(&view, store_id, &mut issues)?;
        check_role(&view, role_id, &mut issues)?;
        check_entries(&view, entries, &mut issues)?
    };
    if !issues.is_empty() {
        tracing::warn!(store_id, role_id, issues = issues.len(), "store role assignment rejected");
    }
    check(issues)?;
    tx.replace_store_grants(store_id, role_id, &rows)?;
    Ok(rows.len())
}

pub struct Assigner {
    storage: Arc<Storage>,
    lock_wait: Duration,
    retries: u32,
}

impl Assigner {
    pub fn new(storage: Arc<Storage>) -> Self {
        Assigner { storage, lock_wait: DEFAULT_LOCK_WAIT, retries: DEFAULT_ASSIGN_RETRIES }
    }

    pub fn from_config(storage: Arc<Storage>, config: &Config) -> Self {
        Assigner { storage, lock_wait: config.lock_wait, retries: config.assign_retries }
    }

    pub fn with_lock_wait(mut self, wait: Duration, retries: u32) -> Self {
        self.lock_wait = wait;
        self.retries = retries;
        self
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Run `f` under the write lock for `scope`, retrying a bounded number of
    /// times when the lock stays busy past `lock_wait`
    pub(crate) fn serialized<T>(&self, scope: GrantScope, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            if let Some(r) = self.storage.locks().with(scope, self.lock_wait, &mut f) {
                return r;
            }
            tracing::warn!(%scope, attempt, "grant key busy");
        }
        Err(Error::ConcurrencyConflict { scope, attempts })
    }

    /// Replace every default grant of `role_id` with `entries`
    pub fn assign_to_role(&self, role_id: u64, entries: &Entries) -> Result<()> {
        let written = self.serialized(GrantScope::Role { role_id }, || {
            self.storage.transact(|tx| {
                let mut issues = Vec::new();
                let rows = {
                    let view = tx.view();
                    check_role(&view, role_id, &mut issues)?;
                    check_entries(&view, entries, &mut issues)?
                };
                if !issues.is_empty() {
                    tracing::warn!(role_id, issues = issues.len(), "role assignment rejected");
                }
                check(issues)?;
                tx.replace_role_grants(role_id, &rows)?;
                Ok(rows.len())
            })
        })?;
        tracing::info!(role_id, menus = written, "role menus replaced");
        Ok(())
    }

    /// Replace every override of (`store_id`, `role_id`) with `entries`
    pub fn assign_to_store_role(&self, store_id: u64, role_id: u64, entries: &Entries) -> Result<()> {
        let written = self.serialized(GrantScope::StoreRole { store_id, role_id }, || {
            self.storage.transact(|tx| replace_store_role(tx, store_id, role_id, entries, Vec::new()))
        })?;
        tracing::info!(store_id, role_id, menus = written, "store role menus replaced");
        Ok(())
    }
}
