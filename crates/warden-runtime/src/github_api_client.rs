use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use warden_github::api_types::{
    GithubCollaboratorPermission, GithubCommentCreateResponse, GithubIssue, GithubIssueComment,
    GithubPullRequest, GithubPullRequestFile, GithubReview, GithubReviewComment, GithubUser,
};
use warden_github::event_context::RepoRef;

use crate::repository_api::RepositoryApi;
use crate::retry_policy::{
    clip_error_body, is_transient_status, is_transient_transport, retry_after_hint, RetryPolicy,
};

/// Page size accepted by both GitHub (`per_page`) and Gitea (`limit`, capped at 50 by default).
const PAGE_SIZE: usize = 50;
/// Upper bound on pages per listing; reaching it is a fetch failure.
pub(crate) const MAX_PAGES: u32 = 200;
const TOTAL_COUNT_HEADER: &str = "x-total-count";
const ERROR_BODY_MAX_CHARS: usize = 800;

#[derive(Clone)]
/// REST client for GitHub- and Gitea-compatible APIs, scoped to one repository.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
    retry: RetryPolicy,
}

impl GithubApiClient {
    pub fn new(
        api_base: String,
        token: String,
        repo: RepoRef,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        if token.trim().is_empty() {
            bail!("api token is empty");
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("warden-webhook-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("token {}", token.trim());
        let mut auth_value = reqwest::header::HeaderValue::from_str(&auth_header)
            .context("invalid api authorization header")?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            retry: RetryPolicy::new(retry_max_attempts, retry_base_delay_ms),
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            self.repo.owner,
            self.repo.name,
            suffix.trim_start_matches('/')
        )
    }

    /// Walks `page=1..` until the server signals the last page. Gitea endpoints
    /// that ignore paging answer every page with the same rows; a repeated page
    /// ends the walk without duplicating them.
    async fn list_paginated<T>(&self, operation: &str, url: String) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let page_size = PAGE_SIZE.to_string();
        let mut rows: Vec<Value> = Vec::new();
        let mut previous_page: Option<Vec<Value>> = None;
        for page in 1..=MAX_PAGES {
            let page_value = page.to_string();
            let response = self
                .send_with_retry(operation, || {
                    self.http.get(&url).query(&[
                        ("per_page", page_size.as_str()),
                        ("limit", page_size.as_str()),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let headers = response.headers().clone();
            let chunk: Vec<Value> = response
                .json()
                .await
                .with_context(|| format!("failed to decode api {operation} page {page}"))?;
            if previous_page.as_ref() == Some(&chunk) {
                return decode_rows(operation, rows);
            }
            let chunk_len = chunk.len();
            rows.extend(chunk.iter().cloned());
            if !has_next_page(&headers, rows.len(), chunk_len) {
                return decode_rows(operation, rows);
            }
            previous_page = Some(chunk);
        }
        bail!("api {operation} did not finish within {MAX_PAGES} pages");
    }

    async fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        self.send_with_retry(operation, request_builder)
            .await?
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode api {operation}"))
    }

    async fn send_with_retry<F>(
        &self,
        operation: &str,
        mut request_builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header(
                    "x-warden-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = retry_after_hint(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if self.retry.allows_another(attempt) && is_transient_status(status) {
                        tokio::time::sleep(self.retry.delay_for(attempt, retry_after)).await;
                        continue;
                    }

                    bail!(
                        "api {operation} failed with status {}: {}",
                        status.as_u16(),
                        clip_error_body(&body, ERROR_BODY_MAX_CHARS)
                    );
                }
                Err(error) => {
                    if self.retry.allows_another(attempt) && is_transient_transport(&error) {
                        tokio::time::sleep(self.retry.delay_for(attempt, None)).await;
                        continue;
                    }
                    return Err(error).with_context(|| format!("api {operation} request failed"));
                }
            }
        }
    }
}

fn decode_rows<T: DeserializeOwned>(operation: &str, rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("failed to decode api {operation}"))
}

/// `Link: rel="next"` is authoritative when present, then Gitea's
/// `x-total-count`. Without either, only an exactly full page asks for more.
pub(crate) fn has_next_page(headers: &HeaderMap, fetched: usize, chunk_len: usize) -> bool {
    let links = headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>();
    if !links.is_empty() {
        return links
            .iter()
            .flat_map(|value| value.split(','))
            .any(|link| link.contains("rel=\"next\""));
    }
    let total = headers
        .get(TOTAL_COUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<usize>().ok());
    if let Some(total) = total {
        return chunk_len > 0 && fetched < total;
    }
    chunk_len == PAGE_SIZE
}

#[async_trait]
impl RepositoryApi for GithubApiClient {
    async fn fetch_issue(&self, number: u64) -> Result<GithubIssue> {
        let url = self.repo_url(&format!("issues/{number}"));
        self.request_json("fetch issue", || self.http.get(&url))
            .await
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<GithubPullRequest> {
        let url = self.repo_url(&format!("pulls/{number}"));
        self.request_json("fetch pull request", || self.http.get(&url))
            .await
    }

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<GithubIssueComment>> {
        self.list_paginated(
            "list issue comments",
            self.repo_url(&format!("issues/{number}/comments")),
        )
        .await
    }

    async fn list_pull_request_files(&self, number: u64) -> Result<Vec<GithubPullRequestFile>> {
        self.list_paginated(
            "list pull request files",
            self.repo_url(&format!("pulls/{number}/files")),
        )
        .await
    }

    async fn list_pull_request_reviews(&self, number: u64) -> Result<Vec<GithubReview>> {
        self.list_paginated(
            "list pull request reviews",
            self.repo_url(&format!("pulls/{number}/reviews")),
        )
        .await
    }

    async fn list_review_comments(
        &self,
        number: u64,
        review_id: u64,
    ) -> Result<Vec<GithubReviewComment>> {
        self.list_paginated(
            "list review comments",
            self.repo_url(&format!("pulls/{number}/reviews/{review_id}/comments")),
        )
        .await
    }

    async fn fetch_user(&self, login: &str) -> Result<GithubUser> {
        let url = format!("{}/users/{}", self.api_base, login.trim());
        self.request_json("fetch user", || self.http.get(&url)).await
    }

    async fn fetch_collaborator_permission(&self, login: &str) -> Result<String> {
        let url = self.repo_url(&format!("collaborators/{}/permission", login.trim()));
        let response: GithubCollaboratorPermission = self
            .request_json("fetch collaborator permission", || self.http.get(&url))
            .await?;
        Ok(response.permission)
    }

    async fn create_issue_comment(
        &self,
        number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        let url = self.repo_url(&format!("issues/{number}/comments"));
        self.request_json("create issue comment", || {
            self.http.post(&url).json(&payload)
        })
        .await
    }

    async fn update_issue_comment(
        &self,
        comment_id: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        let url = self.repo_url(&format!("issues/comments/{comment_id}"));
        self.request_json("update issue comment", || {
            self.http.patch(&url).json(&payload)
        })
        .await
    }
}
