//! In-memory fakes of the host interfaces, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::model::{Build, BuildResult, Container, Job, MultiBranchProject};
use super::policy::ReferencePolicy;
use super::scm::{ScmError, ScmFacade, SourceHead};

#[derive(Debug)]
pub struct FakeBuild {
    job: Arc<FakeJob>,
    id: String,
    result: Option<BuildResult>,
    previous: Option<Arc<dyn Build>>,
}

impl FakeBuild {
    pub fn new(job: &Arc<FakeJob>, id: &str) -> Self {
        Self {
            job: Arc::clone(job),
            id: id.to_string(),
            result: Some(BuildResult::Success),
            previous: None,
        }
    }

    /// `None` marks the build as still running.
    pub fn with_result(mut self, result: Option<BuildResult>) -> Self {
        self.result = result;
        self
    }

    pub fn with_previous(mut self, previous: Option<Arc<dyn Build>>) -> Self {
        self.previous = previous;
        self
    }
}

impl Build for FakeBuild {
    fn job(&self) -> Arc<dyn Job> {
        self.job.clone()
    }

    fn externalizable_id(&self) -> String {
        self.id.clone()
    }

    fn number(&self) -> u64 {
        self.id
            .rsplit('#')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(1)
    }

    fn result(&self) -> Option<BuildResult> {
        self.result
    }

    fn is_building(&self) -> bool {
        self.result.is_none()
    }

    fn previous_build(&self) -> Option<Arc<dyn Build>> {
        self.previous.clone()
    }
}

#[derive(Debug)]
pub struct FakeJob {
    name: String,
    parent: Container,
    last_completed: Mutex<Option<Arc<dyn Build>>>,
}

impl FakeJob {
    /// A job whose parent is a plain folder.
    pub fn standalone(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parent: Container::Other {
                name: "folder".to_string(),
            },
            last_completed: Mutex::new(None),
        })
    }

    /// A branch job registered in `project` under `branch`.
    pub fn in_project(project: &Arc<FakeMultiBranch>, branch: &str) -> Arc<Self> {
        let job = Arc::new(Self {
            name: format!("{}/{branch}", project.name),
            parent: Container::MultiBranch(project.clone()),
            last_completed: Mutex::new(None),
        });
        project.add(branch, job.clone());
        job
    }

    /// Records a completed build with the given id and returns it.
    pub fn complete(self: &Arc<Self>, id: &str) -> Arc<dyn Build> {
        let build: Arc<dyn Build> = Arc::new(FakeBuild::new(self, id));
        *self.last_completed.lock().unwrap() = Some(build.clone());
        build
    }

    /// A build of this job that is not recorded as completed.
    pub fn running(self: &Arc<Self>, id: &str) -> Arc<dyn Build> {
        Arc::new(FakeBuild::new(self, id).with_result(None))
    }
}

impl Job for FakeJob {
    fn full_name(&self) -> String {
        self.name.clone()
    }

    fn parent(&self) -> Container {
        self.parent.clone()
    }

    fn last_completed_build(&self) -> Option<Arc<dyn Build>> {
        self.last_completed.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub struct FakeMultiBranch {
    name: String,
    jobs: Mutex<HashMap<String, Arc<dyn Job>>>,
}

impl FakeMultiBranch {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            jobs: Mutex::new(HashMap::new()),
        })
    }

    fn add(&self, branch: &str, job: Arc<FakeJob>) {
        self.jobs.lock().unwrap().insert(branch.to_string(), job);
    }
}

impl MultiBranchProject for FakeMultiBranch {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn item_by_branch_name(&self, branch: &str) -> Option<Arc<dyn Job>> {
        self.jobs.lock().unwrap().get(branch).cloned()
    }
}

/// Returns a fixed head for every job and counts the lookups.
pub struct FakeScm {
    head: Result<Option<SourceHead>, String>,
    calls: Arc<AtomicUsize>,
}

impl FakeScm {
    pub fn with_head(head: SourceHead) -> Self {
        Self::from_result(Ok(Some(head)))
    }

    pub fn change_request(name: &str, target: &str) -> Self {
        Self::with_head(SourceHead::ChangeRequest {
            name: name.to_string(),
            target: target.to_string(),
        })
    }

    pub fn without_head() -> Self {
        Self::from_result(Ok(None))
    }

    pub fn failing(reason: &str) -> Self {
        Self::from_result(Err(reason.to_string()))
    }

    fn from_result(head: Result<Option<SourceHead>, String>) -> Self {
        Self {
            head,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ScmFacade for FakeScm {
    fn find_head(&self, job: &dyn Job) -> Result<Option<SourceHead>, ScmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.head.clone().map_err(|reason| ScmError::Unavailable {
            job: job.full_name(),
            reason,
        })
    }
}

/// Accepts or rejects every candidate and remembers which ones it saw.
pub struct RecordingPolicy {
    accept: bool,
    seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingPolicy {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            ..Self::accepting()
        }
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }
}

impl ReferencePolicy for RecordingPolicy {
    fn find(&self, _owner: &dyn Build, candidate: Arc<dyn Build>) -> Option<Arc<dyn Build>> {
        self.seen
            .lock()
            .unwrap()
            .push(candidate.externalizable_id());
        self.accept.then_some(candidate)
    }
}
