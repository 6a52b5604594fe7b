use std::sync::Arc;

use super::filtered_log::FilteredLog;
use super::model::{Build, Container, Job};
use super::policy::ReferencePolicy;
use super::reference_build::ReferenceBuild;
use super::scm::ScmFacade;

/// Branch compared against when neither the step nor the SCM name a target.
pub const DEFAULT_TARGET_BRANCH: &str = "master";

/// Finds the reference build for builds of branch and merge request jobs.
///
/// The target branch is taken from, in order:
/// 1. the explicitly configured target branch,
/// 2. the target of the pull or merge request the job was built from,
/// 3. [`DEFAULT_TARGET_BRANCH`].
///
/// The last completed build of the target branch's job is then handed to the
/// [`ReferencePolicy`], which has the final say.
pub struct ReferenceResolver {
    target_branch: String,
    scm: Box<dyn ScmFacade>,
    policy: Box<dyn ReferencePolicy>,
}

impl ReferenceResolver {
    pub fn new(scm: Box<dyn ScmFacade>, policy: Box<dyn ReferencePolicy>) -> Self {
        Self {
            target_branch: String::new(),
            scm,
            policy,
        }
    }

    #[must_use]
    pub fn with_target_branch(mut self, target_branch: impl Into<String>) -> Self {
        self.set_target_branch(target_branch);
        self
    }

    /// Sets the branch to compare against. A blank value restores the
    /// detection of pull or merge request targets.
    pub fn set_target_branch(&mut self, target_branch: impl Into<String>) {
        self.target_branch = target_branch.into();
    }

    pub fn target_branch(&self) -> &str {
        &self.target_branch
    }

    /// Resolves the reference build of `build`, logging every decision.
    ///
    /// Never fails: a missing configuration, branch or build results in a
    /// [`ReferenceBuild`] without reference.
    pub fn find_reference_build(
        &self,
        build: &Arc<dyn Build>,
        log: &mut FilteredLog,
    ) -> ReferenceBuild {
        let reference = self.find(build.as_ref(), log);

        match &reference {
            Some(found) => log.log_info(format!(
                "-> found reference build '{}'",
                found.externalizable_id()
            )),
            None => log.log_info("-> no reference build found"),
        }

        ReferenceBuild::new(Arc::clone(build), reference)
    }

    fn find(&self, build: &dyn Build, log: &mut FilteredLog) -> Option<Arc<dyn Build>> {
        let job = build.job();

        let project = match job.parent() {
            Container::MultiBranch(project) => project,
            Container::Other { name } => {
                log.log_info(format!(
                    "Found a non-multi-branch project '{name}', no cross-branch search is possible"
                ));
                log.log_info(format!(
                    "-> falling back to plugin default target branch '{DEFAULT_TARGET_BRANCH}'"
                ));
                return None;
            }
        };

        log.log_info("Found a `MultiBranchProject`, trying to resolve the target branch");
        let target_branch = self.resolve_target_branch(job.as_ref(), log);

        let Some(target_job) = project.item_by_branch_name(&target_branch) else {
            log.log_error(format!(
                "-> no job found for target branch '{target_branch}' in '{}'",
                project.name()
            ));
            return None;
        };
        log.log_info(format!(
            "-> inferred job for target branch: '{}'",
            target_job.full_name()
        ));

        let Some(candidate) = target_job.last_completed_build() else {
            log.log_error(format!(
                "-> job '{}' has no completed build yet",
                target_job.full_name()
            ));
            return None;
        };
        log.log_info(format!(
            "-> last completed build of target job: '{}'",
            candidate.externalizable_id()
        ));

        let accepted = self.policy.find(build, candidate);
        if accepted.is_none() {
            log.log_info("-> candidate has been rejected by the reference policy");
        }
        accepted
    }

    fn resolve_target_branch(&self, job: &dyn Job, log: &mut FilteredLog) -> String {
        let configured = self.target_branch.trim();
        if !configured.is_empty() {
            log.log_info(format!(
                "-> using target branch '{configured}' as configured in step"
            ));
            return configured.to_string();
        }

        log.log_info("-> no target branch configured in step");

        match self.scm.find_head(job) {
            Ok(Some(head)) => match head.target() {
                Some(target) => {
                    log.log_info(format!(
                        "-> detected a pull or merge request '{head}' for target branch '{target}'"
                    ));
                    return target.to_string();
                }
                None => log.log_info(format!("-> head '{head}' is a plain branch")),
            },
            Ok(None) => log.log_info(format!(
                "-> no SCM head found for job '{}'",
                job.full_name()
            )),
            Err(error) => log.log_exception(&error, "-> SCM head lookup failed"),
        }

        log.log_info(format!(
            "-> falling back to plugin default target branch '{DEFAULT_TARGET_BRANCH}'"
        ));
        DEFAULT_TARGET_BRANCH.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::reference::reference_build::NO_REFERENCE_BUILD;
    use crate::reference::scm::SourceHead;
    use crate::reference::testing::{FakeJob, FakeMultiBranch, FakeScm, RecordingPolicy};

    fn contains(messages: &[String], text: &str) -> bool {
        messages.iter().any(|m| m.contains(text))
    }

    fn create_log() -> FilteredLog {
        FilteredLog::new("EMPTY")
    }

    #[test]
    fn should_not_search_other_branches_without_multi_branch_parent() {
        let job = FakeJob::standalone("job");
        let build = job.running("job#1");
        let scm = FakeScm::change_request("pr", "pr-target");
        let calls = scm.calls();
        let resolver = ReferenceResolver::new(Box::new(scm), Box::new(RecordingPolicy::accepting()));

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(contains(log.info_messages(), "non-multi-branch project"));
        assert!(contains(
            log.info_messages(),
            "falling back to plugin default target branch 'master'"
        ));
        assert!(reference.reference_build().is_none());
        assert_eq!(reference.reference_build_id(), NO_REFERENCE_BUILD);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_not_find_reference_job_for_multi_branch_project() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "feature").running("project/feature#1");
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::without_head()),
            Box::new(RecordingPolicy::accepting()),
        );

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(contains(log.info_messages(), "Found a `MultiBranchProject`"));
        assert!(contains(
            log.info_messages(),
            "falling back to plugin default target branch 'master'"
        ));
        assert!(contains(&log.error_messages(), "no job found for target branch 'master'"));
        assert!(reference.reference_build().is_none());
    }

    #[test]
    fn should_use_master_job_when_no_change_request_is_detected() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "feature").running("project/feature#4");
        FakeJob::in_project(&project, "master").complete("master-id");
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::with_head(SourceHead::Branch {
                name: "feature".to_string(),
            })),
            Box::new(RecordingPolicy::accepting()),
        );

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(contains(log.info_messages(), "head 'feature' is a plain branch"));
        assert_eq!(reference.reference_build_id(), "master-id");
    }

    #[test]
    fn should_obtain_reference_from_pull_request_target() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "pr").running("project/pr#1");
        FakeJob::in_project(&project, "pr-target").complete("pr-id");
        let policy = RecordingPolicy::accepting();
        let seen = policy.seen();
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::change_request("pr", "pr-target")),
            Box::new(policy),
        );

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(contains(log.info_messages(), "no target branch configured in step"));
        assert!(contains(
            log.info_messages(),
            "detected a pull or merge request 'pr' for target branch 'pr-target'"
        ));
        assert_eq!(reference.reference_build_id(), "pr-id");
        assert_eq!(*seen.lock().unwrap(), vec!["pr-id".to_string()]);
    }

    #[test]
    fn target_should_have_precedence_before_pull_request_target() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "pr").running("project/pr#1");
        FakeJob::in_project(&project, "target").complete("target-id");
        FakeJob::in_project(&project, "pr-target").complete("pr-id");
        let scm = FakeScm::change_request("pr", "pr-target");
        let calls = scm.calls();
        let resolver =
            ReferenceResolver::new(Box::new(scm), Box::new(RecordingPolicy::accepting()))
                .with_target_branch("target");

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(contains(
            log.info_messages(),
            "using target branch 'target' as configured in step"
        ));
        assert!(!contains(log.info_messages(), "pull or merge request"));
        assert_eq!(reference.reference_build_id(), "target-id");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blank_target_branch_restores_change_request_detection() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "pr").running("project/pr#1");
        FakeJob::in_project(&project, "target").complete("target-id");
        FakeJob::in_project(&project, "pr-target").complete("pr-id");
        let mut resolver = ReferenceResolver::new(
            Box::new(FakeScm::change_request("pr", "pr-target")),
            Box::new(RecordingPolicy::accepting()),
        )
        .with_target_branch("target");

        resolver.set_target_branch("  ");
        let reference = resolver.find_reference_build(&build, &mut create_log());

        assert_eq!(resolver.target_branch(), "  ");
        assert_eq!(reference.reference_build_id(), "pr-id");
    }

    #[test]
    fn should_report_missing_target_job() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "pr").running("project/pr#1");
        let policy = RecordingPolicy::accepting();
        let seen = policy.seen();
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::change_request("pr", "deleted")),
            Box::new(policy),
        );

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(!reference.has_reference_build());
        assert!(contains(&log.error_messages(), "no job found for target branch 'deleted'"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn should_report_target_job_without_completed_build() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "pr").running("project/pr#1");
        FakeJob::in_project(&project, "main");
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::change_request("pr", "main")),
            Box::new(RecordingPolicy::accepting()),
        );

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(!reference.has_reference_build());
        assert!(contains(log.info_messages(), "inferred job for target branch: 'project/main'"));
        assert!(contains(&log.error_messages(), "has no completed build yet"));
    }

    #[test]
    fn should_treat_scm_failure_as_plain_branch() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "feature").running("project/feature#1");
        FakeJob::in_project(&project, "master").complete("master-id");
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::failing("connection refused")),
            Box::new(RecordingPolicy::accepting()),
        );

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(contains(&log.error_messages(), "connection refused"));
        assert!(contains(
            log.info_messages(),
            "falling back to plugin default target branch 'master'"
        ));
        assert_eq!(reference.reference_build_id(), "master-id");
    }

    #[test]
    fn policy_rejection_is_not_an_error() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "pr").running("project/pr#1");
        FakeJob::in_project(&project, "pr-target").complete("pr-id");
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::change_request("pr", "pr-target")),
            Box::new(RecordingPolicy::rejecting()),
        );

        let mut log = create_log();
        let reference = resolver.find_reference_build(&build, &mut log);

        assert!(!reference.has_reference_build());
        assert!(!log.has_errors());
        assert!(contains(log.info_messages(), "rejected by the reference policy"));
    }

    #[test]
    fn repeated_resolution_yields_equal_results() {
        let project = FakeMultiBranch::new("project");
        let build = FakeJob::in_project(&project, "pr").running("project/pr#1");
        FakeJob::in_project(&project, "pr-target").complete("pr-id");
        let resolver = ReferenceResolver::new(
            Box::new(FakeScm::change_request("pr", "pr-target")),
            Box::new(RecordingPolicy::accepting()),
        );

        let mut first_log = create_log();
        let mut second_log = create_log();
        let first = resolver.find_reference_build(&build, &mut first_log);
        let second = resolver.find_reference_build(&build, &mut second_log);

        assert_eq!(first, second);
        assert_eq!(first_log.info_messages(), second_log.info_messages());
    }
}
