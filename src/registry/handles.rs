use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::reference::{
    Build, BuildResult, Container, Job, MultiBranchProject, ScmError, ScmFacade, SourceHead,
};

use super::snapshot::{BuildSnapshot, JobSnapshot, ProjectKind, ProjectSnapshot, Snapshot};
use super::RegistryError;

/// In-memory job and build registry backed by a [`Snapshot`].
///
/// Hands out lightweight handles that implement the host interfaces the
/// resolver consumes. Handles share the snapshot, so they stay valid as long
/// as anyone holds one.
#[derive(Debug, Clone)]
pub struct Registry {
    snapshot: Arc<Snapshot>,
}

impl Registry {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        Snapshot::load(path).map(Self::new)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Looks up a job by its full name, `<project>/<branch>`.
    pub fn job(&self, full_name: &str) -> Result<Arc<dyn Job>, RegistryError> {
        self.job_handle(full_name)
            .map(|job| Arc::new(job) as Arc<dyn Job>)
    }

    /// Looks up a build of a job; the most recent one when `number` is `None`.
    pub fn build(
        &self,
        full_name: &str,
        number: Option<u64>,
    ) -> Result<Arc<dyn Build>, RegistryError> {
        let job = self.job_handle(full_name)?;
        let builds = &job.snapshot().builds;

        let index = match number {
            Some(number) => builds
                .iter()
                .position(|b| b.number == number)
                .ok_or_else(|| RegistryError::UnknownBuild {
                    job: full_name.to_string(),
                    number,
                })?,
            None => latest(builds.iter().enumerate(), |_| true)
                .ok_or_else(|| RegistryError::NoBuilds(full_name.to_string()))?,
        };

        Ok(Arc::new(BuildHandle { job, index }))
    }

    pub fn scm_facade(&self) -> RegistryScmFacade {
        RegistryScmFacade {
            snapshot: Arc::clone(&self.snapshot),
        }
    }

    fn job_handle(&self, full_name: &str) -> Result<JobHandle, RegistryError> {
        self.snapshot
            .locate(full_name)
            .map(|(project, branch)| JobHandle {
                snapshot: Arc::clone(&self.snapshot),
                project,
                branch,
            })
            .ok_or_else(|| RegistryError::UnknownJob(full_name.to_string()))
    }
}

/// Index of the highest-numbered build matching `filter`.
fn latest<'a>(
    builds: impl Iterator<Item = (usize, &'a BuildSnapshot)>,
    filter: impl Fn(&BuildSnapshot) -> bool,
) -> Option<usize> {
    builds
        .filter(|(_, build)| filter(*build))
        .max_by_key(|(_, build)| build.number)
        .map(|(index, _)| index)
}

#[derive(Clone)]
struct JobHandle {
    snapshot: Arc<Snapshot>,
    project: usize,
    branch: String,
}

impl JobHandle {
    fn project(&self) -> &ProjectSnapshot {
        &self.snapshot.projects[self.project]
    }

    fn snapshot(&self) -> &JobSnapshot {
        &self.project().jobs[self.branch.as_str()]
    }

    fn build_at(&self, index: usize) -> Arc<dyn Build> {
        Arc::new(BuildHandle {
            job: self.clone(),
            index,
        })
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Job").field(&self.full_name()).finish()
    }
}

impl Job for JobHandle {
    fn full_name(&self) -> String {
        format!("{}/{}", self.project().name, self.branch)
    }

    fn parent(&self) -> Container {
        let project = self.project();
        match project.kind {
            ProjectKind::MultiBranch => Container::MultiBranch(Arc::new(ProjectHandle {
                snapshot: Arc::clone(&self.snapshot),
                project: self.project,
            })),
            ProjectKind::Folder => Container::Other {
                name: project.name.clone(),
            },
        }
    }

    fn last_completed_build(&self) -> Option<Arc<dyn Build>> {
        latest(self.snapshot().builds.iter().enumerate(), BuildSnapshot::is_completed)
            .map(|index| self.build_at(index))
    }
}

struct BuildHandle {
    job: JobHandle,
    index: usize,
}

impl BuildHandle {
    fn snapshot(&self) -> &BuildSnapshot {
        &self.job.snapshot().builds[self.index]
    }
}

impl fmt::Debug for BuildHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Build")
            .field(&self.externalizable_id())
            .finish()
    }
}

impl Build for BuildHandle {
    fn job(&self) -> Arc<dyn Job> {
        Arc::new(self.job.clone())
    }

    fn externalizable_id(&self) -> String {
        format!("{}#{}", self.job.full_name(), self.snapshot().number)
    }

    fn number(&self) -> u64 {
        self.snapshot().number
    }

    fn result(&self) -> Option<BuildResult> {
        self.snapshot().result
    }

    fn is_building(&self) -> bool {
        self.snapshot().building
    }

    fn previous_build(&self) -> Option<Arc<dyn Build>> {
        let number = self.number();
        latest(self.job.snapshot().builds.iter().enumerate(), |b| {
            b.number < number
        })
        .map(|index| self.job.build_at(index))
    }
}

struct ProjectHandle {
    snapshot: Arc<Snapshot>,
    project: usize,
}

impl fmt::Debug for ProjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MultiBranchProject")
            .field(&self.name())
            .finish()
    }
}

impl MultiBranchProject for ProjectHandle {
    fn name(&self) -> String {
        self.snapshot.projects[self.project].name.clone()
    }

    fn item_by_branch_name(&self, branch: &str) -> Option<Arc<dyn Job>> {
        self.snapshot.projects[self.project]
            .jobs
            .contains_key(branch)
            .then(|| {
                Arc::new(JobHandle {
                    snapshot: Arc::clone(&self.snapshot),
                    project: self.project,
                    branch: branch.to_string(),
                }) as Arc<dyn Job>
            })
    }
}

/// Answers head lookups from the heads recorded in the snapshot.
///
/// Jobs without a recorded head are plain branches named after the job.
pub struct RegistryScmFacade {
    snapshot: Arc<Snapshot>,
}

impl ScmFacade for RegistryScmFacade {
    fn find_head(&self, job: &dyn Job) -> Result<Option<SourceHead>, ScmError> {
        let full_name = job.full_name();
        let (project, branch) =
            self.snapshot
                .locate(&full_name)
                .ok_or_else(|| ScmError::Unavailable {
                    job: full_name.clone(),
                    reason: "job is not part of the registry".to_string(),
                })?;

        let head = self.snapshot.projects[project].jobs[branch.as_str()]
            .head
            .clone()
            .unwrap_or(SourceHead::Branch { name: branch });

        Ok(Some(head))
    }
}
