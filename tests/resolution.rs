//! Effective-mask resolution tests
//!
//! Store override beats role default, an explicit 0 override still wins,
//! and the super-admin code short-circuits to every bit.

use std::collections::BTreeMap;

use menugate::bootstrap::{HQ_STORE_ID, ROLE_STAFF, ROLE_STORE_MANAGER, ROLE_SUPER_ADMIN};
use menugate::resolve::overlay;
use menugate::{bootstrap, Config, MenuGate, Resolver, UserContext, ALL, CREATE, VIEW};
use tempfile::TempDir;

fn setup() -> (TempDir, MenuGate) {
    let dir = TempDir::new().unwrap();
    let config = Config::default().with_db_path(dir.path().to_str().unwrap());
    let gate = MenuGate::open(&config).unwrap();
    bootstrap(gate.storage()).unwrap();
    (dir, gate)
}

fn entries(rows: &[(u64, i64)]) -> BTreeMap<u64, i64> {
    rows.iter().copied().collect()
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn overlay_prefers_override() {
    let defaults: BTreeMap<u64, u8> = [(1, 8), (2, 15)].into_iter().collect();
    let overrides: BTreeMap<u64, u8> = [(2, 0), (3, 12)].into_iter().collect();
    assert_eq!(overlay(&defaults, &overrides, 1), 8);
    assert_eq!(overlay(&defaults, &overrides, 2), 0);
    assert_eq!(overlay(&defaults, &overrides, 3), 12);
    assert_eq!(overlay(&defaults, &overrides, 4), 0);
}

/// Verify role defaults apply when the store has no override
#[test]
fn falls_back_to_role_default() {
    let (_dir, gate) = setup();
    let m = gate
        .storage()
        .read(|v| gate.resolver().resolve_one(v, ROLE_STAFF, HQ_STORE_ID, 31))
        .unwrap();
    assert_eq!(m, VIEW | CREATE);
}

#[test]
fn unknown_menu_resolves_to_zero() {
    let (_dir, gate) = setup();
    let m = gate
        .storage()
        .read(|v| gate.resolver().resolve_one(v, ROLE_STAFF, HQ_STORE_ID, 999))
        .unwrap();
    assert_eq!(m, 0);
}

#[test]
fn store_override_wins() {
    let (_dir, gate) = setup();
    gate.assigner()
        .assign_to_store_role(HQ_STORE_ID, ROLE_STAFF, &entries(&[(31, 15)]))
        .unwrap();

    gate.storage()
        .read(|v| {
            assert_eq!(gate.resolver().resolve_one(v, ROLE_STAFF, HQ_STORE_ID, 31)?, ALL);
            // No override row for 21: default still applies
            assert_eq!(gate.resolver().resolve_one(v, ROLE_STAFF, HQ_STORE_ID, 21)?, VIEW);
            Ok(())
        })
        .unwrap();
}

/// Verify an override of 0 hides a menu the role default grants
#[test]
fn explicit_zero_override_revokes() {
    let (_dir, gate) = setup();
    gate.assigner()
        .assign_to_store_role(HQ_STORE_ID, ROLE_STORE_MANAGER, &entries(&[(21, 0)]))
        .unwrap();

    let user = UserContext::new(ROLE_STORE_MANAGER, HQ_STORE_ID, "store_manager");
    let m = gate.storage().read(|v| gate.resolver().resolve_user_one(v, &user, 21)).unwrap();
    assert_eq!(m, 0);
    assert!(!gate.has_permission(&user, "dish:dish").unwrap());
    assert!(gate.has_permission(&user, "dish:category").unwrap());
}

/// Verify one store's overrides never leak into another store
#[test]
fn overrides_are_per_store() {
    let (_dir, gate) = setup();
    let branch = gate.create_store("branch", "Branch").unwrap();
    gate.assigner()
        .assign_to_store_role(branch.id, ROLE_STAFF, &entries(&[(21, 15)]))
        .unwrap();

    gate.storage()
        .read(|v| {
            assert_eq!(gate.resolver().resolve_one(v, ROLE_STAFF, branch.id, 21)?, ALL);
            assert_eq!(gate.resolver().resolve_one(v, ROLE_STAFF, HQ_STORE_ID, 21)?, VIEW);
            Ok(())
        })
        .unwrap();
}

// ============================================================================
// Batch
// ============================================================================

#[test]
fn resolve_all_matches_resolve_one() {
    let (_dir, gate) = setup();
    gate.assigner()
        .assign_to_store_role(HQ_STORE_ID, ROLE_STORE_MANAGER, &entries(&[(21, 8), (35, 0), (2, 15)]))
        .unwrap();

    let ids: Vec<u64> = (1..=42).collect();
    gate.storage()
        .read(|v| {
            let all = gate.resolver().resolve_all(v, ROLE_STORE_MANAGER, HQ_STORE_ID, &ids)?;
            assert_eq!(all.len(), ids.len());
            for &id in &ids {
                assert_eq!(all[&id], gate.resolver().resolve_one(v, ROLE_STORE_MANAGER, HQ_STORE_ID, id)?);
            }
            assert_eq!(all[&21], 8);
            assert_eq!(all[&25], ALL);
            assert_eq!(all[&35], 0);
            assert_eq!(all[&2], 15);
            Ok(())
        })
        .unwrap();
}

// ============================================================================
// Super admin
// ============================================================================

#[test]
fn super_admin_gets_everything() {
    let (_dir, gate) = setup();
    let user = UserContext::new(ROLE_SUPER_ADMIN, HQ_STORE_ID, "super_admin");
    assert!(gate.resolver().is_bypassed(&user));

    let masks = gate.effective_masks(&user).unwrap();
    assert!(!masks.is_empty());
    assert!(masks.iter().all(|g| g.mask == ALL && g.binary_string == "1111"));
}

/// Verify the bypass keys on the role code, not the role id
#[test]
fn bypass_ignores_role_id() {
    let (_dir, gate) = setup();
    let user = UserContext::new(ROLE_STAFF, HQ_STORE_ID, "super_admin");
    assert!(gate.has_permission(&user, "system:role:delete").unwrap());
}

#[test]
fn bypass_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let config = Config::default()
        .with_db_path(dir.path().to_str().unwrap())
        .with_super_admin(None);
    let gate = MenuGate::open(&config).unwrap();
    bootstrap(gate.storage()).unwrap();

    let user = UserContext::new(ROLE_SUPER_ADMIN, HQ_STORE_ID, "super_admin");
    assert!(!gate.resolver().is_bypassed(&user));
    assert!(gate.user_permission_codes(&user).unwrap().is_empty());
    assert!(Resolver::new(Some("root".into())).is_bypassed(&UserContext::new(9, 9, "root")));
}
