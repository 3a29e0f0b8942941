//! Data snapshot assembly for a triggered run.
//!
//! Fetches entity metadata and discussion content, applies the temporal
//! integrity filter to each content category independently, and builds the
//! ordered safe-body list handed to the assistant.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use warden_github::api_types::{
    GithubIssue, GithubIssueComment, GithubPullRequest, GithubPullRequestFile, GithubReview,
    GithubReviewComment,
};
use warden_github::content_item::{ContentKind, SafeBody};
use warden_github::event_context::{EntityKind, EntityRef};
use warden_github::temporal_filter::{
    filter_to_trigger_time, is_body_safe_to_use, TriggerTime,
};

use crate::file_fingerprint::FileFingerprinter;
use crate::repository_api::RepositoryApi;

/// Fingerprint recorded for files removed by the pull request.
pub const DELETED_FILE_SHA: &str = "deleted";
/// Fingerprint recorded when hashing a file fails.
pub const UNKNOWN_FILE_SHA: &str = "unknown";
/// Concurrent `git hash-object` children per snapshot.
pub(crate) const FINGERPRINT_CONCURRENCY: usize = 8;
/// Concurrent review-comment listings per snapshot.
pub(crate) const REVIEW_COMMENT_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to fetch {resource}: {source:#}")]
    Fetch {
        resource: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl SnapshotError {
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Fetch { resource, .. } => resource,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeType {
    pub fn from_status(status: Option<&str>) -> Self {
        match status.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("added") => Self::Added,
            Some("removed") | Some("deleted") => Self::Deleted,
            Some("renamed") => Self::Renamed,
            _ => Self::Modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub change_type: ChangeType,
    pub additions: u64,
    pub deletions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
}

impl From<GithubPullRequestFile> for ChangedFile {
    fn from(file: GithubPullRequestFile) -> Self {
        Self {
            change_type: ChangeType::from_status(file.status.as_deref()),
            path: file.filename,
            additions: file.additions,
            deletions: file.deletions,
            previous_path: file.previous_filename,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFileWithSha {
    #[serde(flatten)]
    pub file: ChangedFile,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Entity metadata; the body is cleared when it failed the temporal check.
pub enum EntityRecord {
    Issue(GithubIssue),
    PullRequest(GithubPullRequest),
}

impl EntityRecord {
    pub fn number(&self) -> u64 {
        match self {
            Self::Issue(issue) => issue.number,
            Self::PullRequest(pull) => pull.number,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            Self::Issue(issue) => &issue.user.login,
            Self::PullRequest(pull) => &pull.user.login,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Issue(issue) => issue.body.as_deref(),
            Self::PullRequest(pull) => pull.body.as_deref(),
        }
    }

    fn body_kind(&self) -> ContentKind {
        match self {
            Self::Issue(_) => ContentKind::IssueBody,
            Self::PullRequest(_) => ContentKind::PrBody,
        }
    }

    fn is_body_safe(&self, trigger: Option<&TriggerTime>) -> bool {
        match self {
            Self::Issue(issue) => is_body_safe_to_use(issue, trigger),
            Self::PullRequest(pull) => is_body_safe_to_use(pull, trigger),
        }
    }

    fn clear_body(&mut self) {
        match self {
            Self::Issue(issue) => issue.body = None,
            Self::PullRequest(pull) => pull.body = None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredEntity {
    #[serde(flatten)]
    pub record: EntityRecord,
    pub body_excluded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewBundle {
    pub reviews: Vec<GithubReview>,
    pub review_comments: Vec<GithubReviewComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Vetted content bundle for one entity at one trigger time.
pub struct Snapshot {
    pub entity: FilteredEntity,
    pub comments: Vec<GithubIssueComment>,
    pub changed_files: Vec<ChangedFile>,
    pub changed_files_with_sha: Vec<ChangedFileWithSha>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_data: Option<ReviewBundle>,
    pub safe_bodies: Vec<SafeBody>,
    pub trigger_display_name: Option<String>,
}

/// Fetches, filters, and orders everything the assistant may read.
///
/// Primary fetches (entity, comments, files, reviews) abort assembly on
/// failure. Fingerprints and the display name degrade to sentinels.
pub async fn assemble_snapshot(
    api: &dyn RepositoryApi,
    fingerprinter: &dyn FileFingerprinter,
    entity: EntityRef,
    trigger: Option<&TriggerTime>,
    trigger_username: Option<&str>,
) -> Result<Snapshot, SnapshotError> {
    let number = entity.number;
    let record = fetch_entity(api, entity).await?;

    let comments_future = async {
        api.list_issue_comments(number)
            .await
            .map_err(|source| fetch_error("comments", source))
    };
    let files_future = async {
        if !entity.is_pull_request() {
            return Ok(Vec::new());
        }
        api.list_pull_request_files(number)
            .await
            .map_err(|source| fetch_error("changed files", source))
    };
    let reviews_future = async {
        if !entity.is_pull_request() {
            return Ok(None);
        }
        fetch_reviews(api, number).await.map(Some)
    };
    let (comments, files, review_data) =
        tokio::try_join!(comments_future, files_future, reviews_future)?;

    let changed_files = files.into_iter().map(ChangedFile::from).collect::<Vec<_>>();
    let changed_files_with_sha = fingerprint_changed_files(fingerprinter, &changed_files).await;

    let mut record = record;
    let body_excluded = !record.is_body_safe(trigger);
    if body_excluded {
        warn!(
            reason = "temporal_safety",
            entity = number,
            trigger_time = trigger.map(TriggerTime::as_str).unwrap_or_default(),
            "excluding {} body changed at or after trigger time",
            entity.kind.label()
        );
        record.clear_body();
    }

    let comments = filter_to_trigger_time(comments, trigger);
    let review_data = review_data.map(|bundle| ReviewBundle {
        reviews: filter_to_trigger_time(bundle.reviews, trigger),
        review_comments: filter_to_trigger_time(bundle.review_comments, trigger),
    });

    let safe_bodies = build_safe_bodies(&record, &comments, review_data.as_ref());
    let trigger_display_name = match trigger_username {
        Some(login) => fetch_display_name(api, login).await,
        None => None,
    };

    debug!(
        entity = number,
        comments = comments.len(),
        changed_files = changed_files.len(),
        safe_bodies = safe_bodies.len(),
        "assembled snapshot"
    );

    Ok(Snapshot {
        entity: FilteredEntity {
            record,
            body_excluded,
        },
        comments,
        changed_files,
        changed_files_with_sha,
        review_data,
        safe_bodies,
        trigger_display_name,
    })
}

fn fetch_error(resource: &'static str, source: anyhow::Error) -> SnapshotError {
    warn!(
        reason = "fetch_failure",
        resource,
        error = %source,
        "snapshot fetch failed"
    );
    SnapshotError::Fetch { resource, source }
}

async fn fetch_entity(
    api: &dyn RepositoryApi,
    entity: EntityRef,
) -> Result<EntityRecord, SnapshotError> {
    match entity.kind {
        EntityKind::Issue => api
            .fetch_issue(entity.number)
            .await
            .map(EntityRecord::Issue)
            .map_err(|source| fetch_error("issue", source)),
        EntityKind::PullRequest => api
            .fetch_pull_request(entity.number)
            .await
            .map(EntityRecord::PullRequest)
            .map_err(|source| fetch_error("pull request", source)),
    }
}

async fn fetch_reviews(api: &dyn RepositoryApi, number: u64) -> Result<ReviewBundle, SnapshotError> {
    let reviews = api
        .list_pull_request_reviews(number)
        .await
        .map_err(|source| fetch_error("reviews", source))?;
    let review_comments = stream::iter(
        reviews
            .iter()
            .map(|review| api.list_review_comments(number, review.id)),
    )
    .buffered(REVIEW_COMMENT_CONCURRENCY)
    .try_collect::<Vec<_>>()
    .await
    .map_err(|source| fetch_error("review comments", source))?
    .into_iter()
    .flatten()
    .collect();
    Ok(ReviewBundle {
        reviews,
        review_comments,
    })
}

async fn fingerprint_changed_files(
    fingerprinter: &dyn FileFingerprinter,
    files: &[ChangedFile],
) -> Vec<ChangedFileWithSha> {
    stream::iter(files.iter().map(|file| async move {
        let sha = if file.change_type == ChangeType::Deleted {
            DELETED_FILE_SHA.to_string()
        } else {
            match fingerprinter.fingerprint(&file.path).await {
                Ok(sha) => sha,
                Err(error) => {
                    warn!(
                        reason = "enrichment_degraded",
                        path = file.path.as_str(),
                        error = %error,
                        "failed to fingerprint changed file"
                    );
                    UNKNOWN_FILE_SHA.to_string()
                }
            }
        };
        ChangedFileWithSha {
            file: file.clone(),
            sha,
        }
    }))
    .buffered(FINGERPRINT_CONCURRENCY)
    .collect()
    .await
}

async fn fetch_display_name(api: &dyn RepositoryApi, login: &str) -> Option<String> {
    match api.fetch_user(login).await {
        Ok(user) => {
            let name = user.display_name();
            if name.is_none() {
                warn!(
                    reason = "enrichment_degraded",
                    login,
                    "trigger user has no display name"
                );
            }
            name
        }
        Err(error) => {
            warn!(
                reason = "enrichment_degraded",
                login,
                error = %error,
                "failed to fetch trigger user display name"
            );
            None
        }
    }
}

/// Category order: entity body, comments, review bodies, review comments.
fn build_safe_bodies(
    record: &EntityRecord,
    comments: &[GithubIssueComment],
    review_data: Option<&ReviewBundle>,
) -> Vec<SafeBody> {
    let entity_number = record.number();
    let mut bodies = Vec::new();
    let mut push = |kind: ContentKind, id: Option<u64>, author: &str, body: Option<&str>| {
        if let Some(body) = body.filter(|body| !body.trim().is_empty()) {
            bodies.push(SafeBody {
                kind,
                id,
                entity_number,
                author: author.to_string(),
                body: body.to_string(),
            });
        }
    };

    push(record.body_kind(), None, record.author(), record.body());
    for comment in comments {
        push(
            ContentKind::IssueComment,
            Some(comment.id),
            &comment.user.login,
            comment.body.as_deref(),
        );
    }
    if let Some(bundle) = review_data {
        for review in &bundle.reviews {
            push(
                ContentKind::ReviewBody,
                Some(review.id),
                &review.user.login,
                review.body.as_deref(),
            );
        }
        for comment in &bundle.review_comments {
            push(
                ContentKind::ReviewComment,
                Some(comment.id),
                &comment.user.login,
                comment.body.as_deref(),
            );
        }
    }
    bodies
}
