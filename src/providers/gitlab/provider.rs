use std::collections::HashMap;

use indexmap::IndexMap;
use log::{info, warn};

use crate::auth::Token;
use crate::error::Result;
use crate::output::PhaseProgress;
use crate::reference::{BuildResult, SourceHead};
use crate::registry::{BuildSnapshot, JobSnapshot, ProjectKind, ProjectSnapshot, Snapshot};

use super::client::GitLabClient;
use super::types::{GitLabMergeRequest, GitLabPipeline};

const MERGE_REQUEST_REF_PREFIX: &str = "refs/merge-requests/";

/// Imports a GitLab project as a multi-branch registry snapshot.
///
/// Every ref with pipelines becomes a branch job and every pipeline one of
/// its builds. Open merge requests turn their source branch job into a
/// change-request head that targets the merge request's target branch.
pub struct GitLabProvider {
    client: GitLabClient,
    project_path: String,
}

impl GitLabProvider {
    /// Creates a new GitLab provider for the specified project.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitLab instance base URL (e.g., <https://gitlab.com>)
    /// * `project_path` - Project path (e.g., "group/project")
    /// * `token` - Optional authentication token
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL cannot be constructed.
    pub fn new(base_url: &str, project_path: String, token: Option<Token>) -> Result<Self> {
        let client = GitLabClient::new(base_url, token)?;

        Ok(Self {
            client,
            project_path,
        })
    }

    pub fn with_client(client: GitLabClient, project_path: String) -> Self {
        Self {
            client,
            project_path,
        }
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    /// Fetches the latest `limit` pipelines and all open merge requests, then
    /// converts them into a [`Snapshot`] holding a single project.
    ///
    /// # Errors
    ///
    /// Returns an error if either API request fails after retries.
    pub async fn fetch_snapshot(&self, limit: usize) -> Result<Snapshot> {
        info!("Importing GitLab project: {}", self.project_path);

        let progress = PhaseProgress::start_phase_1(limit);

        let (pipelines, merge_requests) = futures::future::try_join(
            self.client.fetch_pipelines(&self.project_path, limit),
            self.client.fetch_merge_requests(&self.project_path),
        )
        .await?;

        if pipelines.is_empty() {
            warn!("No pipelines found for project: {}", self.project_path);
        }

        let progress =
            progress.finish_phase_1_start_phase_2(pipelines.len(), merge_requests.len());

        let project = to_project(&self.project_path, pipelines, merge_requests);

        progress.finish_phase_2(project.jobs.len());
        info!(
            "Imported {} branch jobs for project: {}",
            project.jobs.len(),
            self.project_path
        );

        Ok(Snapshot {
            projects: vec![project],
        })
    }
}

fn to_project(
    project_path: &str,
    pipelines: Vec<GitLabPipeline>,
    merge_requests: Vec<GitLabMergeRequest>,
) -> ProjectSnapshot {
    let source_branches: HashMap<u64, &str> = merge_requests
        .iter()
        .map(|mr| (mr.iid, mr.source_branch.as_str()))
        .collect();

    let mut jobs: IndexMap<String, JobSnapshot> = IndexMap::new();

    for pipeline in &pipelines {
        let branch = branch_of(&pipeline.ref_, &source_branches);
        let (result, building) = build_state(&pipeline.status);

        jobs.entry(branch).or_default().builds.push(BuildSnapshot {
            number: pipeline.id,
            result,
            building,
            timestamp: pipeline.updated_at.or(pipeline.created_at),
        });
    }

    for mr in &merge_requests {
        jobs.entry(mr.source_branch.clone()).or_default().head = Some(SourceHead::ChangeRequest {
            name: format!("MR-{}", mr.iid),
            target: mr.target_branch.clone(),
        });
    }

    for job in jobs.values_mut() {
        job.builds.sort_by_key(|b| b.number);
    }

    ProjectSnapshot {
        name: project_path.to_string(),
        kind: ProjectKind::MultiBranch,
        jobs,
    }
}

/// Maps detached merge request pipeline refs back to their source branch.
fn branch_of(ref_: &str, source_branches: &HashMap<u64, &str>) -> String {
    ref_.strip_prefix(MERGE_REQUEST_REF_PREFIX)
        .and_then(|rest| rest.split('/').next())
        .and_then(|iid| iid.parse::<u64>().ok())
        .and_then(|iid| source_branches.get(&iid))
        .map_or_else(|| ref_.to_string(), |branch| (*branch).to_string())
}

/// Translates a GitLab pipeline status into a result and a running flag.
fn build_state(status: &str) -> (Option<BuildResult>, bool) {
    match status {
        "success" => (Some(BuildResult::Success), false),
        "failed" => (Some(BuildResult::Failure), false),
        "canceled" => (Some(BuildResult::Aborted), false),
        "skipped" | "manual" => (Some(BuildResult::NotBuilt), false),
        _ => (None, true),
    }
}
