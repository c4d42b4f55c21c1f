//! Per-user navigation tree and permission code tests

use std::collections::BTreeMap;

use menugate::bootstrap::{HQ_STORE_ID, ROLE_STORE_MANAGER, ROLE_SUPER_ADMIN};
use menugate::{bootstrap, Config, MenuGate, MenuKind, MenuNode, UserContext, UserMenuNode};
use tempfile::TempDir;

fn setup() -> (TempDir, MenuGate) {
    let dir = TempDir::new().unwrap();
    let config = Config::default().with_db_path(dir.path().to_str().unwrap());
    let gate = MenuGate::open(&config).unwrap();
    bootstrap(gate.storage()).unwrap();
    (dir, gate)
}

/// Fresh role holding exactly `grants`
fn role_with(gate: &MenuGate, code: &str, grants: &[(u64, i64)]) -> UserContext {
    let role = gate.create_role(code, code).unwrap();
    let entries: BTreeMap<u64, i64> = grants.iter().copied().collect();
    gate.assigner().assign_to_role(role.id, &entries).unwrap();
    UserContext::new(role.id, HQ_STORE_ID, code)
}

fn ids(nodes: &[UserMenuNode]) -> Vec<u64> {
    nodes.iter().map(|n| n.id).collect()
}

// ============================================================================
// Navigation tree
// ============================================================================

/// Verify a granted view keeps its ungranted catalog, and actions never show
#[test]
fn tree_keeps_ancestors_of_visible_views() {
    let (_dir, gate) = setup();
    let user = role_with(&gate, "clerk", &[(2, 12)]);

    let tree = gate.user_menu_tree(&user).unwrap();
    assert_eq!(ids(&tree), vec![1]);
    assert_eq!(tree[0].mask, 0);
    assert_eq!(tree[0].perms, "0000");
    assert_eq!(ids(&tree[0].children), vec![2]);

    let user_screen = &tree[0].children[0];
    assert_eq!(user_screen.permission_code, "system:user");
    assert_eq!(user_screen.mask, 12);
    assert_eq!(user_screen.perms, "1100");
    assert!(user_screen.children.is_empty());
}

#[test]
fn tree_drops_views_without_view_bit() {
    let (_dir, gate) = setup();
    // Create-only grant: no View bit, nothing to navigate to
    let user = role_with(&gate, "blind", &[(2, 4), (21, 8)]);

    let tree = gate.user_menu_tree(&user).unwrap();
    assert_eq!(ids(&tree), vec![20]);
    assert_eq!(ids(&tree[0].children), vec![21]);
}

#[test]
fn tree_follows_sort_order() {
    let (_dir, gate) = setup();
    let user = UserContext::new(ROLE_STORE_MANAGER, HQ_STORE_ID, "store_manager");

    let tree = gate.user_menu_tree(&user).unwrap();
    // dish(10), purchase(20), report(30), system(90)
    assert_eq!(ids(&tree), vec![20, 30, 40, 1]);
    assert_eq!(ids(&tree[0].children), vec![21, 25]);
    assert_eq!(ids(&tree[1].children), vec![31, 35]);
    assert_eq!(ids(&tree[3].children), vec![2]);
}

#[test]
fn no_grants_no_tree() {
    let (_dir, gate) = setup();
    let user = role_with(&gate, "nobody", &[]);
    assert!(gate.user_menu_tree(&user).unwrap().is_empty());
    assert!(gate.user_permission_codes(&user).unwrap().is_empty());
}

/// Verify hidden nodes leave the tree but keep their codes
#[test]
fn hidden_view_gates_buttons_only() {
    let (_dir, gate) = setup();
    gate.put_menu(&MenuNode::new(50, 20, MenuKind::View, "archive", "Archive", "dish:archive").hidden())
        .unwrap();
    let user = role_with(&gate, "archivist", &[(50, 8), (21, 8)]);

    let tree = gate.user_menu_tree(&user).unwrap();
    assert_eq!(ids(&tree[0].children), vec![21]);

    let codes = gate.user_permission_codes(&user).unwrap();
    assert_eq!(codes, vec!["dish:archive".to_string(), "dish:dish".to_string()]);
}

/// Verify a disabled catalog removes its whole subtree from both views
#[test]
fn disabled_subtree_is_gone() {
    let (_dir, gate) = setup();
    gate.put_menu(&MenuNode::new(60, 0, MenuKind::Catalog, "lab", "Lab", "lab").disabled())
        .unwrap();
    gate.put_menu(&MenuNode::new(61, 60, MenuKind::View, "trial", "Trial", "lab:trial"))
        .unwrap();
    let user = role_with(&gate, "tester", &[(60, 8), (61, 15)]);

    assert!(gate.user_menu_tree(&user).unwrap().is_empty());
    assert!(gate.user_permission_codes(&user).unwrap().is_empty());
}

/// Verify catalogs with nothing navigable beneath them never show, even
/// when the catalog itself resolves with View
#[test]
fn empty_catalogs_never_shown() {
    let (_dir, gate) = setup();
    gate.put_menu(&MenuNode::new(50, 0, MenuKind::Catalog, "empty", "Empty", "empty"))
        .unwrap();
    gate.put_menu(&MenuNode::new(60, 0, MenuKind::Catalog, "lab", "Lab", "lab"))
        .unwrap();
    gate.put_menu(&MenuNode::new(61, 60, MenuKind::View, "trial", "Trial", "lab:trial").disabled())
        .unwrap();

    let admin = UserContext::new(ROLE_SUPER_ADMIN, HQ_STORE_ID, "super_admin");
    assert_eq!(ids(&gate.user_menu_tree(&admin).unwrap()), vec![20, 30, 40, 1]);

    let lead = role_with(&gate, "lead", &[(50, 15), (60, 15), (61, 15), (1, 8)]);
    assert!(gate.user_menu_tree(&lead).unwrap().is_empty());
}

// ============================================================================
// Permission codes
// ============================================================================

/// Verify View+Create yields the view code and its add code only
#[test]
fn codes_follow_mask_bits() {
    let (_dir, gate) = setup();
    let user = role_with(&gate, "clerk", &[(2, 12)]);
    assert_eq!(
        gate.user_permission_codes(&user).unwrap(),
        vec!["system:user".to_string(), "system:user:add".to_string()]
    );
    assert!(gate.has_permission(&user, "system:user:add").unwrap());
    assert!(!gate.has_permission(&user, "system:user:edit").unwrap());
}

#[test]
fn action_codes_need_view_bit_only_for_view_code() {
    let (_dir, gate) = setup();
    let user = role_with(&gate, "ghost", &[(2, 7)]);
    assert_eq!(
        gate.user_permission_codes(&user).unwrap(),
        vec![
            "system:user:add".to_string(),
            "system:user:delete".to_string(),
            "system:user:edit".to_string(),
        ]
    );
}

/// Verify report screens without action children never emit action codes
#[test]
fn action_codes_need_backing_action() {
    let (_dir, gate) = setup();
    let user = role_with(&gate, "analyst", &[(41, 15)]);
    assert_eq!(gate.user_permission_codes(&user).unwrap(), vec!["report:sales".to_string()]);
}

#[test]
fn disabled_action_suppresses_code() {
    let (_dir, gate) = setup();
    // id 5 is system:user:delete
    let mut delete = gate.storage().read(|v| v.menu(5)).unwrap().unwrap();
    delete.enabled = false;
    gate.put_menu(&delete).unwrap();

    let user = role_with(&gate, "clerk", &[(2, 15)]);
    let codes = gate.user_permission_codes(&user).unwrap();
    assert!(codes.contains(&"system:user:edit".to_string()));
    assert!(!codes.contains(&"system:user:delete".to_string()));
}

#[test]
fn catalog_codes_when_granted() {
    let (_dir, gate) = setup();
    let user = role_with(&gate, "lead", &[(1, 8)]);
    assert_eq!(gate.user_permission_codes(&user).unwrap(), vec!["system".to_string()]);
}

#[test]
fn super_admin_sees_every_code() {
    let (_dir, gate) = setup();
    let user = UserContext::new(ROLE_SUPER_ADMIN, HQ_STORE_ID, "super_admin");
    let codes = gate.user_permission_codes(&user).unwrap();
    // 4 catalogs, 10 views, 8 screens x 3 actions
    assert_eq!(codes.len(), 38);
    assert!(codes.contains(&"purchase:supplier:delete".to_string()));

    let tree = gate.user_menu_tree(&user).unwrap();
    assert_eq!(tree.len(), 4);
}

/// Verify the store override, not the role default, drives the codes
#[test]
fn codes_reflect_store_override() {
    let (_dir, gate) = setup();
    let user = UserContext::new(ROLE_STORE_MANAGER, HQ_STORE_ID, "store_manager");
    assert!(gate.has_permission(&user, "dish:dish:delete").unwrap());

    let over: BTreeMap<u64, i64> = [(21, 8)].into_iter().collect();
    gate.assigner()
        .assign_to_store_role(HQ_STORE_ID, ROLE_STORE_MANAGER, &over)
        .unwrap();
    assert!(gate.has_permission(&user, "dish:dish").unwrap());
    assert!(!gate.has_permission(&user, "dish:dish:delete").unwrap());
}

#[test]
fn effective_masks_cover_every_menu() {
    let (_dir, gate) = setup();
    let user = UserContext::new(ROLE_STORE_MANAGER, HQ_STORE_ID, "store_manager");
    let masks = gate.effective_masks(&user).unwrap();
    assert_eq!(masks.len(), menugate::default_catalogue().len());
    let m35 = masks.iter().find(|g| g.menu_id == 35).unwrap();
    assert_eq!(m35.binary_string, "1110");
}
