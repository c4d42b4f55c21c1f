//! Menu tree construction
//!
//! The menu table is a flat list linked by `parent_id`. `build` validates it
//! as a whole (unique ids, every parent present, no cycles, no children under
//! actions) before assembling an owned tree, so a broken row fails the build
//! instead of silently dropping a subtree.
//!
//! Siblings are ordered by `(sort_order, id)`.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::constants::ROOT_ID;
use crate::error::IntegrityError;
use crate::model::{MenuKind, MenuNode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub menu: MenuNode,
    pub children: Vec<TreeNode>,
}

/// Validated menu forest under the synthetic root
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MenuTree {
    pub roots: Vec<TreeNode>,
}

impl MenuTree {
    /// Pre-order walk, siblings in tree order
    pub fn walk<'a>(&'a self, mut f: impl FnMut(&'a TreeNode)) {
        let mut stack: Vec<&TreeNode> = self.roots.iter().rev().collect();
        while let Some(n) = stack.pop() {
            f(n);
            stack.extend(n.children.iter().rev());
        }
    }

    /// Every id in the tree, pre-order
    pub fn ids(&self) -> Vec<u64> {
        let mut r = Vec::new();
        self.walk(|n| r.push(n.menu.id));
        r
    }

    pub fn len(&self) -> usize {
        let mut c = 0;
        self.walk(|_| c += 1);
        c
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn find(&self, id: u64) -> Option<&TreeNode> {
        let mut found = None;
        self.walk(|n| {
            if found.is_none() && n.menu.id == id {
                found = Some(n);
            }
        });
        found
    }
}

/// Sibling order
fn order(a: &MenuNode, b: &MenuNode) -> std::cmp::Ordering {
    (a.sort_order, a.id).cmp(&(b.sort_order, b.id))
}

/// Turn a flat, unordered set of menu rows into a tree
pub fn build(nodes: Vec<MenuNode>) -> Result<MenuTree, IntegrityError> {
    let mut arena = nodes;
    arena.sort_by_key(|n| n.id);

    let mut kinds: HashMap<u64, MenuKind> = HashMap::with_capacity(arena.len());
    for n in &arena {
        if n.id == ROOT_ID {
            return Err(IntegrityError::ReservedId);
        }
        if kinds.insert(n.id, n.kind).is_some() {
            return Err(IntegrityError::DuplicateId(n.id));
        }
    }

    for n in &arena {
        if n.parent_id == ROOT_ID {
            continue;
        }
        match kinds.get(&n.parent_id) {
            None => return Err(IntegrityError::DanglingParent { id: n.id, parent_id: n.parent_id }),
            Some(MenuKind::Action) => {
                return Err(IntegrityError::ActionHasChildren { id: n.id, parent_id: n.parent_id })
            }
            Some(_) => {}
        }
    }

    // Every node must be reachable from the root; the rest sit on cycles
    let parents: HashMap<u64, u64> = arena.iter().map(|n| (n.id, n.parent_id)).collect();
    let mut groups: HashMap<u64, Vec<MenuNode>> = HashMap::new();
    for n in arena {
        groups.entry(n.parent_id).or_default().push(n);
    }
    let mut reached: HashSet<u64> = HashSet::with_capacity(parents.len());
    let mut stack = vec![ROOT_ID];
    while let Some(id) = stack.pop() {
        if let Some(kids) = groups.get(&id) {
            for k in kids {
                if reached.insert(k.id) {
                    stack.push(k.id);
                }
            }
        }
    }
    if reached.len() != parents.len() {
        let stray = parents.keys().filter(|id| !reached.contains(*id)).min().copied().unwrap_or(ROOT_ID);
        return Err(IntegrityError::Cycle(cycle_from(&parents, stray)));
    }

    for kids in groups.values_mut() {
        kids.sort_by(order);
    }
    Ok(MenuTree { roots: attach(&mut groups, ROOT_ID) })
}

/// Follow parents from `start` until an id repeats; the repeated tail is the cycle
fn cycle_from(parents: &HashMap<u64, u64>, start: u64) -> Vec<u64> {
    let mut path = Vec::new();
    let mut cur = start;
    while let Some(&p) = parents.get(&cur) {
        if let Some(pos) = path.iter().position(|&x| x == cur) {
            return path.split_off(pos);
        }
        path.push(cur);
        cur = p;
    }
    path
}

fn attach(groups: &mut HashMap<u64, Vec<MenuNode>>, parent: u64) -> Vec<TreeNode> {
    let kids = groups.remove(&parent).unwrap_or_default();
    kids.into_iter()
        .map(|menu| {
            let children = attach(groups, menu.id);
            TreeNode { menu, children }
        })
        .collect()
}

/// Pre-order list of the tree's rows, siblings in tree order
pub fn flatten(tree: &MenuTree) -> Vec<MenuNode> {
    let mut r = Vec::with_capacity(tree.len());
    tree.walk(|n| r.push(n.menu.clone()));
    r
}
