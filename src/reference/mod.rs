mod filtered_log;
mod model;
mod policy;
mod reference_build;
mod resolver;
mod scm;

#[cfg(test)]
pub(crate) mod testing;

pub use filtered_log::FilteredLog;
pub use model::{Build, BuildResult, Container, Job, MultiBranchProject};
pub use policy::{AcceptLatest, PolicyKind, ReferencePolicy, RequiredResult};
pub use reference_build::{ReferenceBuild, ReferenceBuildRecord, NO_REFERENCE_BUILD};
pub use resolver::{ReferenceResolver, DEFAULT_TARGET_BRANCH};
pub use scm::{ScmError, ScmFacade, SourceHead};
