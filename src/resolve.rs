//! Effective-mask resolution
//!
//! A store-role override row, when present, wins outright over the role
//! default, including an override of 0. Without an override the role default
//! applies, and without either the mask is 0.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::constants::ALL;
use crate::db::ReadView;
use crate::error::Result;
use crate::model::UserContext;

/// Precedence rule over already-loaded grant sets
pub fn overlay(defaults: &BTreeMap<u64, u8>, overrides: &BTreeMap<u64, u8>, menu_id: u64) -> u8 {
    overrides
        .get(&menu_id)
        .or_else(|| defaults.get(&menu_id))
        .copied()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    super_admin_code: Option<String>,
}

impl Resolver {
    pub fn new(super_admin_code: Option<String>) -> Self {
        Resolver { super_admin_code }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.super_admin_code.clone())
    }

    /// True when `user` holds the reserved super-admin code
    pub fn is_bypassed(&self, user: &UserContext) -> bool {
        self.super_admin_code.as_deref().is_some_and(|c| c == user.role_code)
    }

    /// Effective mask of one (role, store, menu) triple
    pub fn resolve_one(&self, view: &ReadView<'_, '_>, role_id: u64, store_id: u64, menu_id: u64) -> Result<u8> {
        if let Some(m) = view.store_grant(store_id, role_id, menu_id)? {
            return Ok(m);
        }
        Ok(view.role_grant(role_id, menu_id)?.unwrap_or(0))
    }

    /// Effective masks for `menu_ids`, reading each grant set once
    pub fn resolve_all(
        &self,
        view: &ReadView<'_, '_>,
        role_id: u64,
        store_id: u64,
        menu_ids: &[u64],
    ) -> Result<BTreeMap<u64, u8>> {
        let defaults = view.role_grants(role_id)?;
        let overrides = view.store_grants(store_id, role_id)?;
        let r: BTreeMap<u64, u8> = menu_ids.iter().map(|&id| (id, overlay(&defaults, &overrides, id))).collect();
        tracing::debug!(
            role_id,
            store_id,
            defaults = defaults.len(),
            overrides = overrides.len(),
            menus = r.len(),
            "resolved menu masks"
        );
        Ok(r)
    }

    /// `resolve_one` for a caller, honouring the super-admin bypass
    pub fn resolve_user_one(&self, view: &ReadView<'_, '_>, user: &UserContext, menu_id: u64) -> Result<u8> {
        if self.is_bypassed(user) {
            return Ok(ALL);
        }
        self.resolve_one(view, user.role_id, user.store_id, menu_id)
    }

    /// `resolve_all` for a caller, honouring the super-admin bypass
    pub fn resolve_user(&self, view: &ReadView<'_, '_>, user: &UserContext, menu_ids: &[u64]) -> Result<BTreeMap<u64, u8>> {
        if self.is_bypassed(user) {
            return Ok(menu_ids.iter().map(|&id| (id, ALL)).collect());
        }
        self.resolve_all(view, user.role_id, user.store_id, menu_ids)
    }
}
