//! Menugate - store-aware menu permissions
//!
//! Menus form a tree of catalogs, views and actions. Roles carry default
//! 4-bit masks (view/create/update/delete) per menu; a store may override a
//! role's mask for any menu without touching the role itself. Reads resolve
//! override-then-default over one consistent snapshot; writes replace a
//! whole grant set at once.
//!
//! ```no_run
//! use menugate::{Config, MenuGate, UserContext};
//!
//! let gate = MenuGate::open(&Config::from_env())?;
//! let user = UserContext::new(2, 1, "store_manager");
//! let codes = gate.user_permission_codes(&user)?;
//! # Ok::<(), menugate::Error>(())
//! ```

pub mod api;
pub mod assign;
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod copy;
pub mod db;
pub mod error;
pub mod locks;
pub mod mask;
pub mod model;
pub mod read;
pub mod resolve;
pub mod tree;
pub mod tx;
pub mod view;

pub use api::{
    decode_entries, AssignRoleMenus, AssignStoreRoleMenus, CopyStoreMenus, MenuGate, MenuGrantInfo, MenuTreeItem,
    PermValue,
};
pub use assign::{Assigner, Entries};
pub use bootstrap::{bootstrap, default_catalogue};
pub use config::Config;
pub use constants::{ALL, CREATE, DELETE, SUPER_ADMIN_CODE, UPDATE, VIEW};
pub use db::{ReadView, Storage};
pub use error::{Error, IntegrityError, Result, ValidationErrors, ValidationIssue};
pub use mask::{decode, encode, parse_binary_string, to_binary_string, Perms};
pub use model::{GrantScope, MenuKind, MenuNode, Role, RoleMenuGrant, Store, StoreRoleMenuGrant, UserContext};
pub use resolve::Resolver;
pub use tree::{build, flatten, MenuTree, TreeNode};
pub use tx::Tx;
pub use view::{user_menu_tree, user_permission_codes, UserMenuNode};
