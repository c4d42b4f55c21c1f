//! Default catalogue and roles for a fresh database

use std::collections::BTreeMap;

use crate::constants::{ALL, CREATE, SUPER_ADMIN_CODE, UPDATE, VIEW};
use crate::db::Storage;
use crate::error::{Result, ValidationIssue};
use crate::model::{MenuKind, MenuNode, Role, Store};

// Seeded role ids
pub const ROLE_SUPER_ADMIN: u64 = 1;
pub const ROLE_STORE_MANAGER: u64 = 2;
pub const ROLE_STAFF: u64 = 3;

/// Store every other store starts out as a copy of
pub const HQ_STORE_ID: u64 = 1;

fn catalog(id: u64, name: &str, title: &str, sort: i32) -> MenuNode {
    MenuNode::new(id, 0, MenuKind::Catalog, name, title, name).sorted(sort)
}

/// A list view plus its add/edit/delete action children
fn screen(out: &mut Vec<MenuNode>, id: u64, parent: u64, code: &str, title: &str, sort: i32) {
    let name = code.rsplit(':').next().unwrap_or(code);
    out.push(MenuNode::new(id, parent, MenuKind::View, name, title, code).sorted(sort));
    for (i, (suffix, verb)) in [("add", "Add"), ("edit", "Edit"), ("delete", "Delete")].iter().enumerate() {
        let action_code = format!("{}:{}", code, suffix);
        out.push(
            MenuNode::new(id + 1 + i as u64, id, MenuKind::Action, suffix, &format!("{} {}", verb, title), &action_code)
                .sorted(i as i32),
        );
    }
}

/// The back-office menu catalogue a new installation starts with
pub fn default_catalogue() -> Vec<MenuNode> {
    let mut m = Vec::new();
    m.push(catalog(1, "system", "System", 90));
    screen(&mut m, 2, 1, "system:user", "Users", 1);
    screen(&mut m, 6, 1, "system:role", "Roles", 2);
    screen(&mut m, 10, 1, "system:menu", "Menus", 3);
    screen(&mut m, 14, 1, "system:store", "Stores", 4);

    m.push(catalog(20, "dish", "Dishes", 10));
    screen(&mut m, 21, 20, "dish:dish", "Dish List", 1);
    screen(&mut m, 25, 20, "dish:category", "Categories", 2);

    m.push(catalog(30, "purchase", "Purchasing", 20));
    screen(&mut m, 31, 30, "purchase:order", "Purchase Orders", 1);
    screen(&mut m, 35, 30, "purchase:supplier", "Suppliers", 2);

    m.push(catalog(40, "report", "Reports", 30));
    m.push(MenuNode::new(41, 40, MenuKind::View, "sales", "Sales Report", "report:sales").sorted(1));
    m.push(MenuNode::new(42, 40, MenuKind::View, "stock", "Stock Report", "report:stock").sorted(2));
    m
}

fn default_grants(role_id: u64) -> BTreeMap<u64, u8> {
    let rows: Vec<(u64, u8)> = match role_id {
        ROLE_STORE_MANAGER => vec![
            (2, VIEW),
            (21, ALL),
            (25, ALL),
            (31, ALL),
            (35, VIEW | CREATE | UPDATE),
            (41, VIEW),
            (42, VIEW),
        ],
        ROLE_STAFF => vec![(21, VIEW), (25, VIEW), (31, VIEW | CREATE), (41, VIEW)],
        _ => Vec::new(),
    };
    rows.into_iter().collect()
}

/// Seed the catalogue, the three stock roles, the HQ store and role defaults.
/// Fails once the database has been seeded.
pub fn bootstrap(storage: &Storage) -> Result<()> {
    if storage.read(|v| v.is_bootstrapped())? {
        return Err(ValidationIssue::AlreadyBootstrapped.into());
    }
    let menus = default_catalogue();
    storage.transact(|tx| {
        // parents before children
        for node in &menus {
            tx.put_menu(node)?;
        }
        for (id, code, name) in [
            (ROLE_SUPER_ADMIN, SUPER_ADMIN_CODE, "Super Admin"),
            (ROLE_STORE_MANAGER, "store_manager", "Store Manager"),
            (ROLE_STAFF, "staff", "Staff"),
        ] {
            tx.put_role(&Role { id, code: code.into(), name: name.into() })?;
            tx.replace_role_grants(id, &default_grants(id))?;
        }
        tx.put_store(&Store { id: HQ_STORE_ID, code: "hq".into(), name: "Headquarters".into() })?;
        tx.mark_bootstrapped()
    })?;
    tracing::info!(menus = menus.len(), "bootstrapped default catalogue");
    Ok(())
}
