//! Per-key serialization for replace transactions
//!
//! Two writers on the same role (or the same store+role) queue behind one
//! mutex; writers on different keys never touch each other's lock. A slot
//! lives only while someone holds or waits on it, so the map stays as small
//! as the number of keys in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::model::GrantScope;

#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<GrantScope, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Lock handle for `scope`, created on first use
    pub fn handle(&self, scope: GrantScope) -> Arc<Mutex<()>> {
        self.slots.lock().entry(scope).or_default().clone()
    }

    /// Run `f` while holding the lock for `scope`. Returns `None` when the
    /// lock could not be taken within `wait`; `f` has not run in that case.
    pub fn with<T>(&self, scope: GrantScope, wait: Duration, f: impl FnOnce() -> T) -> Option<T> {
        let slot = self.handle(scope);
        let r = match slot.try_lock_for(wait) {
            Some(_guard) => Some(f()),
            None => None,
        };
        self.release(scope, slot);
        r
    }

    /// Drop the slot for `scope` once nobody but the map refers to it
    fn release(&self, scope: GrantScope, slot: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock();
        let idle = slots
            .get(&scope)
            .is_some_and(|s| Arc::ptr_eq(s, &slot) && Arc::strong_count(&slot) == 2);
        if idle {
            slots.remove(&scope);
        }
    }

    /// Number of keys with a live slot
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
