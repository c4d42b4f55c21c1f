//! Store-to-store override copy

use crate::assign::{check_store, replace_store_role, Assigner, Entries};
use crate::error::{Result, ValidationIssue};
use crate::model::GrantScope;

impl Assigner {
    /// Make `target_store`'s overrides for `role_id` equal to `source_store`'s.
    ///
    /// A source store without overrides contributes the role defaults instead,
    /// so the target ends up with explicit rows either way. The source read and
    /// the target replace share one transaction. Returns the number of rows
    /// written to the target.
    pub fn copy_store_menus(&self, source_store: u64, target_store: u64, role_id: u64) -> Result<usize> {
        let self_copy = source_store == target_store;
        let scope = GrantScope::StoreRole { store_id: target_store, role_id };
        let (written, from_defaults) = self.serialized(scope, || {
            self.storage().transact(|tx| {
                let mut issues = Vec::new();
                let (entries, from_defaults) = {
                    let view = tx.view();
                    if self_copy {
                        issues.push(ValidationIssue::SelfCopy(source_store));
                    } else {
                        // the target check below covers the source when they match
                        check_store(&view, source_store, &mut issues)?;
                    }
                    let overrides = view.store_grants(source_store, role_id)?;
                    let from_defaults = overrides.is_empty();
                    let src = if from_defaults { view.role_grants(role_id)? } else { overrides };
                    let entries: Entries = src.into_iter().map(|(menu, m)| (menu, m as i64)).collect();
                    (entries, from_defaults)
                };
                let n = replace_store_role(tx, target_store, role_id, &entries, issues)?;
                Ok((n, from_defaults))
            })
        })?;
        tracing::info!(
            source_store,
            target_store,
            role_id,
            menus = written,
            from_defaults,
            "store menus copied"
        );
        Ok(written)
    }
}
