use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Final outcome of a completed build, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl BuildResult {
    fn ordinal(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Unstable => 1,
            Self::Failure => 2,
            Self::NotBuilt => 3,
            Self::Aborted => 4,
        }
    }

    pub fn is_better_or_equal_to(self, other: Self) -> bool {
        self.ordinal() <= other.ordinal()
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
        };
        f.write_str(label)
    }
}

/// One execution of a job, owned by the host's build history.
pub trait Build: fmt::Debug + Send + Sync {
    /// The job this build belongs to.
    fn job(&self) -> Arc<dyn Job>;

    /// Stable identifier that is safe to persist and compare across sessions.
    fn externalizable_id(&self) -> String;

    fn number(&self) -> u64;

    /// `None` while the build is still running.
    fn result(&self) -> Option<BuildResult>;

    fn is_building(&self) -> bool;

    fn previous_build(&self) -> Option<Arc<dyn Build>> {
        None
    }
}

/// A pipeline or branch project.
pub trait Job: fmt::Debug + Send + Sync {
    fn full_name(&self) -> String;

    fn parent(&self) -> Container;

    fn last_completed_build(&self) -> Option<Arc<dyn Build>>;
}

/// A project that owns one job per discovered source-control branch.
pub trait MultiBranchProject: fmt::Debug + Send + Sync {
    fn name(&self) -> String;

    /// Returns `None` for unknown, renamed or deleted branches.
    fn item_by_branch_name(&self, branch: &str) -> Option<Arc<dyn Job>>;
}

/// The item group a job lives in.
#[derive(Debug, Clone)]
pub enum Container {
    MultiBranch(Arc<dyn MultiBranchProject>),
    Other { name: String },
}

impl Container {
    pub fn name(&self) -> String {
        match self {
            Self::MultiBranch(project) => project.name(),
            Self::Other { name } => name.clone(),
        }
    }
}
