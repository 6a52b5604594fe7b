use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GitLab CI/CD pipeline as returned by `GET /projects/:id/pipelines`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabPipeline {
    /// Project-independent pipeline id
    pub id: u64,
    /// Git reference that triggered the pipeline (e.g., "main", "refs/merge-requests/4/head")
    #[serde(rename = "ref")]
    pub ref_: String,
    /// Pipeline status (e.g., "success", "failed", "running")
    pub status: String,
    /// Trigger source (e.g., "push", "merge_request_event")
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An open merge request as returned by `GET /projects/:id/merge_requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabMergeRequest {
    /// Project-local merge request number
    pub iid: u64,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub title: Option<String>,
}
