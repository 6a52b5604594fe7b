mod handles;
mod snapshot;

use std::path::PathBuf;

use thiserror::Error;

pub use handles::{Registry, RegistryScmFacade};
pub use snapshot::{BuildSnapshot, JobSnapshot, ProjectKind, ProjectSnapshot, Snapshot};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No job named '{0}' in the registry")]
    UnknownJob(String),

    #[error("Job '{job}' has no build #{number}")]
    UnknownBuild { job: String, number: u64 },

    #[error("Job '{0}' has no builds")]
    NoBuilds(String),

    #[error("Failed to read snapshot {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to write snapshot {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}
