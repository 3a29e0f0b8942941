use anyhow::{Context, Result};
use tracing::{info, warn};
use warden_github::api_types::GithubCommentCreateResponse;

use crate::repository_api::RepositoryApi;

const TRACKING_COMMENT_HEADER: &str = "**Warden is working…**";

/// Initial body for the comment that tracks a run's progress.
pub fn render_tracking_comment_body(job_run_url: Option<&str>) -> String {
    match job_run_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => format!("{TRACKING_COMMENT_HEADER}\n\n[View job run]({url})"),
        None => TRACKING_COMMENT_HEADER.to_string(),
    }
}

/// Posts the tracking comment, retrying once before giving up.
pub async fn create_tracking_comment(
    api: &dyn RepositoryApi,
    entity_number: u64,
    job_run_url: Option<&str>,
) -> Result<GithubCommentCreateResponse> {
    let body = render_tracking_comment_body(job_run_url);
    match api.create_issue_comment(entity_number, &body).await {
        Ok(response) => {
            info!(comment_id = response.id, entity = entity_number, "created tracking comment");
            Ok(response)
        }
        Err(error) => {
            warn!(
                entity = entity_number,
                error = %error,
                "failed to create tracking comment; retrying once"
            );
            let response = api
                .create_issue_comment(entity_number, &body)
                .await
                .with_context(|| format!("failed to create tracking comment on #{entity_number}"))?;
            info!(comment_id = response.id, entity = entity_number, "created fallback tracking comment");
            Ok(response)
        }
    }
}

pub async fn update_tracking_comment(
    api: &dyn RepositoryApi,
    comment_id: u64,
    body: &str,
) -> Result<GithubCommentCreateResponse> {
    let response = api
        .update_issue_comment(comment_id, body)
        .await
        .with_context(|| format!("failed to update tracking comment {comment_id}"))?;
    info!(comment_id, "updated tracking comment");
    Ok(response)
}
