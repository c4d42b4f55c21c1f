//! LMDB environment, table handles and composite keys
//!
//! One `Storage` owns one environment. Callers get it handed to them at
//! construction; nothing in the crate reaches for process-wide state.
//!
//! Tables:
//! - `menus`: id -> MenuNode
//! - `roles`: id -> Role, `role_codes`: code -> id
//! - `stores`: id -> Store
//! - `role_grants` / `role_grants_rev`: (role, menu) and (menu, role) -> mask
//! - `store_grants`: (store, role, menu) -> mask
//! - `meta`: bootstrap marker and id sequences

use std::path::Path;

use heed::types::{Bytes, SerdeJson, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};

use crate::config::Config;
use crate::error::{err, Result};
use crate::locks::KeyLocks;
use crate::model::{MenuNode, Role, Store};
use crate::tx::Tx;

// Database type aliases
pub type Db = Database<Bytes, U64<byteorder::BigEndian>>;
pub type Rows<T> = Database<Bytes, SerdeJson<T>>;
pub type DbU64 = Database<Str, U64<byteorder::BigEndian>>;

/// Create a 16-byte key from two u64 values
#[inline]
pub fn key(a: u64, b: u64) -> [u8; 16] {
    let mut k = [0u8; 16];
    k[..8].copy_from_slice(&a.to_be_bytes());
    k[8..].copy_from_slice(&b.to_be_bytes());
    k
}

/// Create a 24-byte key from three u64 values
#[inline]
pub fn key3(a: u64, b: u64, c: u64) -> [u8; 24] {
    let mut k = [0u8; 24];
    k[..16].copy_from_slice(&key(a, b));
    k[16..].copy_from_slice(&c.to_be_bytes());
    k
}

/// Last 8 bytes of a composite key
#[inline]
pub(crate) fn tail(k: &[u8]) -> Option<u64> {
    let start = k.len().checked_sub(8)?;
    Some(u64::from_be_bytes(k[start..].try_into().ok()?))
}

/// Bidirectional index: fwd[a,b] and rev[b,a] stay in sync
pub struct BiPair {
    pub fwd: Db,
    pub rev: Db,
}

impl BiPair {
    #[inline]
    pub fn get(&self, tx: &RoTxn, a: u64, b: u64) -> Result<Option<u64>> {
        self.fwd.get(tx, &key(a, b)).map_err(err)
    }

    #[inline]
    pub fn put(&self, tx: &mut RwTxn, a: u64, b: u64, v: u64) -> Result<()> {
        self.fwd.put(tx, &key(a, b), &v).map_err(err)?;
        self.rev.put(tx, &key(b, a), &v).map_err(err)
    }

    #[inline]
    pub fn del(&self, tx: &mut RwTxn, a: u64, b: u64) -> Result<bool> {
        let r = self.fwd.delete(tx, &key(a, b)).map_err(err)?;
        self.rev.delete(tx, &key(b, a)).map_err(err)?;
        Ok(r)
    }

    pub fn list_fwd(&self, tx: &RoTxn, a: u64) -> Result<Vec<(u64, u64)>> {
        list_pfx(tx, &self.fwd, &a.to_be_bytes())
    }

    pub fn list_rev(&self, tx: &RoTxn, b: u64) -> Result<Vec<(u64, u64)>> {
        list_pfx(tx, &self.rev, &b.to_be_bytes())
    }

    /// Remove every fwd[a, *] row and its mirror; returns how many went
    pub fn clear_fwd(&self, tx: &mut RwTxn, a: u64) -> Result<usize> {
        let rows = self.list_fwd(tx, a)?;
        for &(b, _) in &rows {
            self.del(tx, a, b)?;
        }
        Ok(rows.len())
    }

    /// Remove every rev[b, *] row and its mirror
    pub fn clear_rev(&self, tx: &mut RwTxn, b: u64) -> Result<usize> {
        let rows = self.list_rev(tx, b)?;
        for &(a, _) in &rows {
            self.del(tx, a, b)?;
        }
        Ok(rows.len())
    }
}

/// (last key segment, value) for every row under `pfx`
pub(crate) fn list_pfx(tx: &RoTxn, db: &Db, pfx: &[u8]) -> Result<Vec<(u64, u64)>> {
    let mut r = Vec::new();
    for item in db.prefix_iter(tx, pfx).map_err(err)? {
        let (k, v) = item.map_err(err)?;
        if k.len() == pfx.len() + 8 {
            if let Some(id) = tail(k) {
                r.push((id, v));
            }
        }
    }
    Ok(r)
}

/// All database handles
pub struct Dbs {
    pub menus: Rows<MenuNode>,
    pub roles: Rows<Role>,
    pub role_codes: DbU64,
    pub stores: Rows<Store>,
    pub role_grants: BiPair,
    pub store_grants: Db,
    pub meta: Database<Str, Str>,
}

/// Owned handle to the grant tables and menu catalogue
pub struct Storage {
    env: Env,
    dbs: Dbs,
    locks: KeyLocks,
}

impl Storage {
    /// Open (creating if needed) the environment at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Storage> {
        Self::open_sized(path, 1 << 30)
    }

    pub fn open_with(config: &Config) -> Result<Storage> {
        Self::open_sized(&config.db_path, config.map_size)
    }

    fn open_sized(path: impl AsRef<Path>, map_size: usize) -> Result<Storage> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(8)
                .open(path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let dbs = Dbs {
            menus: env.create_database(&mut tx, Some("menus")).map_err(err)?,
            roles: env.create_database(&mut tx, Some("roles")).map_err(err)?,
            role_codes: env.create_database(&mut tx, Some("role_codes")).map_err(err)?,
            stores: env.create_database(&mut tx, Some("stores")).map_err(err)?,
            role_grants: BiPair {
                fwd: env.create_database(&mut tx, Some("role_grants")).map_err(err)?,
                rev: env.create_database(&mut tx, Some("role_grants_rev")).map_err(err)?,
            },
            store_grants: env.create_database(&mut tx, Some("store_grants")).map_err(err)?,
            meta: env.create_database(&mut tx, Some("meta")).map_err(err)?,
        };
        tx.commit().map_err(err)?;
        tracing::debug!(path = %path.display(), "storage opened");
        Ok(Storage { env, dbs, locks: KeyLocks::default() })
    }

    /// Run `f` against one consistent snapshot
    pub fn read<T, F: FnOnce(&ReadView<'_, '_>) -> Result<T>>(&self, f: F) -> Result<T> {
        let txn = self.env.read_txn().map_err(err)?;
        f(&ReadView { dbs: &self.dbs, txn: &txn })
    }

    /// Run `f` in one write transaction; nothing is kept unless `f` returns Ok
    pub fn transact<T, F: FnOnce(&mut Tx<'_>) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = Tx::new(&self.dbs, self.env.write_txn().map_err(err)?);
        let r = f(&mut tx)?;
        tx.commit()?;
        Ok(r)
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    /// Empty every table (tests and dev resets)
    pub fn clear_all(&self) -> Result<()> {
        self.transact(|tx| tx.clear_all())
    }
}

/// Read-only access to one snapshot
pub struct ReadView<'a, 'e> {
    pub(crate) dbs: &'a Dbs,
    pub(crate) txn: &'a RoTxn<'e>,
}
