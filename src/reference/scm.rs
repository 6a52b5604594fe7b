use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Job;

/// Position of a job in source control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceHead {
    /// A plain branch.
    Branch { name: String },
    /// A pull or merge request that will be merged into `target`.
    ChangeRequest { name: String, target: String },
}

impl SourceHead {
    pub fn name(&self) -> &str {
        match self {
            Self::Branch { name } | Self::ChangeRequest { name, .. } => name,
        }
    }

    /// Name of the target branch, only present for change requests.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Branch { .. } => None,
            Self::ChangeRequest { target, .. } => Some(target),
        }
    }
}

impl fmt::Display for SourceHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum ScmError {
    #[error("SCM metadata for job '{job}' is unavailable: {reason}")]
    Unavailable { job: String, reason: String },
}

/// Answers which source-control head a job was built from.
///
/// Lookups must be idempotent and free of side effects.
pub trait ScmFacade: Send + Sync {
    fn find_head(&self, job: &dyn Job) -> Result<Option<SourceHead>, ScmError>;
}
