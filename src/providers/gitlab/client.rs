use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{RefBuildError, Result};

use super::types::{GitLabMergeRequest, GitLabPipeline};

const MAX_RETRIES: u32 = 30;
const RETRY_DELAY_SECONDS: u64 = 10;
pub(super) const PAGE_SIZE: usize = 100;

/// Client for the GitLab REST v4 API.
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
    max_retries: u32,
    retry_delay: Duration,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("refbuild/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RefBuildError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(base_url)
            .map_err(|e| RefBuildError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| RefBuildError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        })
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Project base URL, with the project path URL-encoded as GitLab expects.
    pub fn project_url(&self, project_path: &str) -> Result<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(project_path.as_bytes()).collect();
        self.api_url
            .join(&format!("projects/{encoded}/"))
            .map_err(|e| RefBuildError::Config(format!("Invalid project URL: {e}")))
    }

    /// Fetches up to `limit` of the most recent pipelines of a project.
    pub async fn fetch_pipelines(
        &self,
        project_path: &str,
        limit: usize,
    ) -> Result<Vec<GitLabPipeline>> {
        let endpoint = self.endpoint(project_path, "pipelines")?;
        let per_page = PAGE_SIZE.min(limit.max(1));

        let mut pipelines = Vec::new();
        let mut page = 1;
        loop {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("order_by", "id")
                .append_pair("sort", "desc")
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());

            let batch: Vec<GitLabPipeline> = self.get_json(url).await?;
            let batch_len = batch.len();
            pipelines.extend(batch);

            if batch_len < per_page || pipelines.len() >= limit {
                break;
            }
            page += 1;
        }

        pipelines.truncate(limit);
        debug!("Fetched {} pipelines for {project_path}", pipelines.len());

        Ok(pipelines)
    }

    /// Fetches all open merge requests of a project.
    pub async fn fetch_merge_requests(&self, project_path: &str) -> Result<Vec<GitLabMergeRequest>> {
        let endpoint = self.endpoint(project_path, "merge_requests")?;

        let mut merge_requests = Vec::new();
        let mut page = 1;
        loop {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("state", "opened")
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());

            let batch: Vec<GitLabMergeRequest> = self.get_json(url).await?;
            let batch_len = batch.len();
            merge_requests.extend(batch);

            if batch_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        debug!(
            "Fetched {} open merge requests for {project_path}",
            merge_requests.len()
        );

        Ok(merge_requests)
    }

    fn endpoint(&self, project_path: &str, resource: &str) -> Result<Url> {
        self.project_url(project_path)?
            .join(resource)
            .map_err(|e| RefBuildError::Config(format!("Invalid {resource} URL: {e}")))
    }

    /// Execute a GET request with automatic retry on network errors and rate limits
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut retry_count = 0;
        loop {
            let request = self.auth_request(self.client.get(url.clone()));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= self.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({e}), retrying in {}s ({}/{})...",
                        self.retry_delay.as_secs(),
                        retry_count + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(RefBuildError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.max_retries,
                    });
                }

                warn!(
                    "GitLab API error (status {status}). Waiting {}s before retry {}/{}...",
                    self.retry_delay.as_secs(),
                    retry_count + 1,
                    self.max_retries
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(RefBuildError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.json().await?);
        }
    }
}
