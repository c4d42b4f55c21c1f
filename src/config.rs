//! Runtime configuration

use std::time::Duration;

use crate::constants::{DEFAULT_ASSIGN_RETRIES, DEFAULT_LOCK_WAIT, SUPER_ADMIN_CODE};

#[derive(Debug, Clone)]
pub struct Config {
    /// LMDB directory
    pub db_path: String,
    /// LMDB map size in bytes
    pub map_size: usize,
    /// Role code that resolves to every permission; `None` disables the bypass
    pub super_admin_code: Option<String>,
    /// How long one attempt waits for a per-key write lock
    pub lock_wait: Duration,
    /// Extra attempts after the first lock timeout
    pub assign_retries: u32,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: "./data/menugate.mdb".into(),
            map_size: 1 << 30,
            super_admin_code: Some(SUPER_ADMIN_CODE.into()),
            lock_wait: DEFAULT_LOCK_WAIT,
            assign_retries: DEFAULT_ASSIGN_RETRIES,
            port: 3000,
        }
    }
}

impl Config {
    /// Read `MENUGATE_*` and `PORT`, keeping defaults for anything unset or malformed
    pub fn from_env() -> Self {
        let mut c = Config::default();
        if let Ok(p) = std::env::var("MENUGATE_DB") {
            c.db_path = p;
        }
        if let Ok(code) = std::env::var("MENUGATE_SUPER_ADMIN") {
            c.super_admin_code = if code.trim().is_empty() { None } else { Some(code) };
        }
        c.map_size = parsed("MENUGATE_MAP_SIZE").unwrap_or(c.map_size);
        c.lock_wait = parsed("MENUGATE_LOCK_WAIT_MS").map(Duration::from_millis).unwrap_or(c.lock_wait);
        c.assign_retries = parsed("MENUGATE_ASSIGN_RETRIES").unwrap_or(c.assign_retries);
        c.port = parsed("PORT").unwrap_or(c.port);
        c
    }

    pub fn with_db_path(mut self, path: impl Into<String>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_super_admin(mut self, code: Option<&str>) -> Self {
        self.super_admin_code = code.map(str::to_string);
        self
    }
}

fn parsed<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring malformed setting");
            None
        }
    }
}
