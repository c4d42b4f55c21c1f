//! Per-user navigation tree and permission codes
//!
//! Both views are derived from one snapshot: the full menu tree plus one
//! batch resolution over all of its ids.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::constants::{ACTION_SUFFIXES, VIEW};
use crate::db::ReadView;
use crate::error::Result;
use crate::mask::to_binary_string;
use crate::model::{MenuKind, UserContext};
use crate::resolve::Resolver;
use crate::tree::{self, MenuTree, TreeNode};

/// Navigation entry as shown to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMenuNode {
    pub id: u64,
    pub parent_id: u64,
    pub name: String,
    pub title: String,
    pub kind: MenuKind,
    pub permission_code: String,
    pub sort_order: i32,
    pub mask: u8,
    /// `mask` as "VCUD"
    pub perms: String,
    pub children: Vec<UserMenuNode>,
}

/// Menu tree and the caller's effective mask for every node in it
pub fn resolved_tree(
    resolver: &Resolver,
    view: &ReadView<'_, '_>,
    user: &UserContext,
) -> Result<(MenuTree, BTreeMap<u64, u8>)> {
    let tree = tree::build(view.menus()?).inspect_err(|e| {
        tracing::warn!(error = %e, "menu table failed integrity check");
    })?;
    let masks = resolver.resolve_user(view, user, &tree.ids())?;
    Ok((tree, masks))
}

/// Navigation tree pruned to what `user` may see.
///
/// A view survives when its own View bit is set or any descendant survives;
/// a catalog survives only when something beneath it does. Actions never
/// appear here, and neither do hidden or disabled nodes or anything beneath
/// them.
pub fn user_menu_tree(resolver: &Resolver, view: &ReadView<'_, '_>, user: &UserContext) -> Result<Vec<UserMenuNode>> {
    let (tree, masks) = resolved_tree(resolver, view, user)?;
    Ok(prune(&tree.roots, &masks))
}

fn prune(nodes: &[TreeNode], masks: &BTreeMap<u64, u8>) -> Vec<UserMenuNode> {
    let mut r = Vec::new();
    for n in nodes {
        let m = &n.menu;
        if !m.kind.is_navigable() || !m.visible || !m.enabled {
            continue;
        }
        let mask = masks.get(&m.id).copied().unwrap_or(0);
        let children = prune(&n.children, masks);
        let keep = match m.kind {
            MenuKind::Catalog => !children.is_empty(),
            _ => mask & VIEW != 0 || !children.is_empty(),
        };
        if !keep {
            continue;
        }
        r.push(UserMenuNode {
            id: m.id,
            parent_id: m.parent_id,
            name: m.name.clone(),
            title: m.title.clone(),
            kind: m.kind,
            permission_code: m.permission_code.clone(),
            sort_order: m.sort_order,
            mask,
            perms: to_binary_string(mask),
            children,
        });
    }
    r
}

/// Flat permission codes for button-level gating.
///
/// Each catalog/view node with a nonzero mask contributes its own code when
/// View is set, and `<code>:add` / `<code>:edit` / `<code>:delete` when the
/// Create / Update / Delete bit is set and an enabled action child carries
/// exactly that code. Hidden nodes still contribute; disabled subtrees don't.
pub fn user_permission_codes(
    resolver: &Resolver,
    view: &ReadView<'_, '_>,
    user: &UserContext,
) -> Result<BTreeSet<String>> {
    let (tree, masks) = resolved_tree(resolver, view, user)?;
    let mut codes = BTreeSet::new();
    collect_codes(&tree.roots, &masks, &mut codes);
    Ok(codes)
}

fn collect_codes(nodes: &[TreeNode], masks: &BTreeMap<u64, u8>, codes: &mut BTreeSet<String>) {
    for n in nodes {
        let m = &n.menu;
        if !m.enabled || !m.kind.is_navigable() {
            continue;
        }
        let mask = masks.get(&m.id).copied().unwrap_or(0);
        if mask != 0 && !m.permission_code.is_empty() {
            if mask & VIEW != 0 {
                codes.insert(m.permission_code.clone());
            }
            for &(bit, suffix) in ACTION_SUFFIXES {
                if mask & bit == 0 {
                    continue;
                }
                let code = format!("{}:{}", m.permission_code, suffix);
                let backed = n.children.iter().any(|c| {
                    c.menu.kind == MenuKind::Action && c.menu.enabled && c.menu.permission_code == code
                });
                if backed {
                    codes.insert(code);
                }
            }
        }
        collect_codes(&n.children, masks, codes);
    }
}
