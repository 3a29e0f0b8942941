use anyhow::Result;
use async_trait::async_trait;
use warden_github::api_types::{
    GithubCommentCreateResponse, GithubIssue, GithubIssueComment, GithubPullRequest,
    GithubPullRequestFile, GithubReview, GithubReviewComment, GithubUser,
};

#[async_trait]
/// Read/write surface of the hosting platform consumed by the prepare flow.
///
/// Implemented by [`crate::GithubApiClient`] for GitHub- and Gitea-compatible
/// REST APIs; tests substitute in-memory fakes.
pub trait RepositoryApi: Send + Sync {
    async fn fetch_issue(&self, number: u64) -> Result<GithubIssue>;

    async fn fetch_pull_request(&self, number: u64) -> Result<GithubPullRequest>;

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<GithubIssueComment>>;

    async fn list_pull_request_files(&self, number: u64) -> Result<Vec<GithubPullRequestFile>>;

    async fn list_pull_request_reviews(&self, number: u64) -> Result<Vec<GithubReview>>;

    async fn list_review_comments(
        &self,
        number: u64,
        review_id: u64,
    ) -> Result<Vec<GithubReviewComment>>;

    async fn fetch_user(&self, login: &str) -> Result<GithubUser>;

    /// Permission level string such as `admin`, `write`, or `read`.
    async fn fetch_collaborator_permission(&self, login: &str) -> Result<String>;

    async fn create_issue_comment(
        &self,
        number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse>;

    async fn update_issue_comment(
        &self,
        comment_id: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse>;
}
