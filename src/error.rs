//! Error types for menugate

use serde::Serialize;

use crate::model::GrantScope;

/// One rejected input. Batches report all of them, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "issue", content = "detail", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("unknown menu {0}")]
    UnknownMenu(u64),
    #[error("unknown role {0}")]
    UnknownRole(u64),
    #[error("unknown store {0}")]
    UnknownStore(u64),
    #[error("mask {mask} for menu {menu_id} is outside 0..=15")]
    MaskOutOfRange { menu_id: u64, mask: i64 },
    #[error("menu id {0:?} is not a number")]
    MalformedMenuId(String),
    #[error("perms entry for menu {0} which is not in menu_ids")]
    UnselectedPermission(u64),
    #[error("source and target store are both {0}")]
    SelfCopy(u64),
    #[error("role code {0:?} already exists")]
    DuplicateRoleCode(String),
    #[error("role {0} already has a code; codes cannot change")]
    RoleCodeImmutable(u64),
    #[error("invalid menu {id}: {reason}")]
    InvalidMenu { id: u64, reason: String },
    #[error("menu {0} still has children")]
    MenuHasChildren(u64),
    #[error("already bootstrapped")]
    AlreadyBootstrapped,
}

/// Every issue found in one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl ValidationErrors {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

/// The menu table does not form a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "violation", content = "detail", rename_all = "snake_case")]
pub enum IntegrityError {
    #[error("menu {id} references missing parent {parent_id}")]
    DanglingParent { id: u64, parent_id: u64 },
    #[error("menu cycle through {0:?}")]
    Cycle(Vec<u64>),
    #[error("action menu {parent_id} has child {id}")]
    ActionHasChildren { id: u64, parent_id: u64 },
    #[error("menu id 0 is reserved for the root")]
    ReservedId,
    #[error("menu id {0} appears more than once")]
    DuplicateId(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("menu tree integrity: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("could not serialize writes to {scope} after {attempts} attempts")]
    ConcurrencyConflict { scope: GrantScope, attempts: u32 },
    #[error("storage: {0}")]
    Storage(String),
}

impl Error {
    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        Error::Validation(ValidationErrors(issues))
    }

    /// Issues carried by a validation error, empty for anything else
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Error::Validation(v) => v.issues(),
            _ => &[],
        }
    }
}

impl From<ValidationIssue> for Error {
    fn from(issue: ValidationIssue) -> Self {
        Error::validation(vec![issue])
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convert any storage-layer error
pub fn err<E: std::error::Error>(e: E) -> Error {
    Error::Storage(e.to_string())
}

/// Ok when nothing was collected, otherwise all of it at once
pub(crate) fn check(issues: Vec<ValidationIssue>) -> Result<()> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(issues))
    }
}
