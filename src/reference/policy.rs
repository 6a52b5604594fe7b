use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::model::{Build, BuildResult};

pub const DEFAULT_MAX_BUILDS: usize = 100;

/// Decides whether a located candidate is acceptable as the reference build.
///
/// Returning `None` is a normal rejection, not an error.
pub trait ReferencePolicy: Send + Sync {
    fn find(&self, owner: &dyn Build, candidate: Arc<dyn Build>) -> Option<Arc<dyn Build>>;
}

/// Accepts the last completed build of the target job as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptLatest;

impl ReferencePolicy for AcceptLatest {
    fn find(&self, _owner: &dyn Build, candidate: Arc<dyn Build>) -> Option<Arc<dyn Build>> {
        Some(candidate)
    }
}

/// Walks back the target job's history until a finished build with at least
/// the required result shows up.
#[derive(Debug, Clone, Copy)]
pub struct RequiredResult {
    pub required: BuildResult,
    pub max_builds: usize,
}

impl RequiredResult {
    pub fn new(required: BuildResult) -> Self {
        Self {
            required,
            max_builds: DEFAULT_MAX_BUILDS,
        }
    }

    fn accepts(&self, build: &dyn Build) -> bool {
        !build.is_building()
            && build
                .result()
                .is_some_and(|result| result.is_better_or_equal_to(self.required))
    }
}

impl ReferencePolicy for RequiredResult {
    fn find(&self, _owner: &dyn Build, candidate: Arc<dyn Build>) -> Option<Arc<dyn Build>> {
        let mut current = Some(candidate);
        for _ in 0..self.max_builds {
            let build = current?;
            if self.accepts(build.as_ref()) {
                return Some(build);
            }
            current = build.previous_build();
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    AcceptLatest,
    RequiredResult,
}

impl PolicyKind {
    pub fn create(self, required: BuildResult) -> Box<dyn ReferencePolicy> {
        match self {
            Self::AcceptLatest => Box::new(AcceptLatest),
            Self::RequiredResult => Box::new(RequiredResult::new(required)),
        }
    }
}
