use serde::Serialize;

use crate::api_types::{
    GithubIssue, GithubIssueComment, GithubPullRequest, GithubReview, GithubReviewComment,
};

/// Time-stamped, human-authored text eligible for the assistant's context.
///
/// `created_at` is `None` only for records that never reached a final state
/// (for example a pending review without `submitted_at`).
pub trait TimestampedContent {
    fn created_at(&self) -> Option<&str>;

    fn updated_at(&self) -> Option<&str>;

    /// Authoritative "content changed" time when the platform reports one.
    fn last_edited_at(&self) -> Option<&str> {
        None
    }

    /// Edit time preferred over update time; update time is the conservative fallback.
    fn effective_edit_time(&self) -> Option<&str> {
        self.last_edited_at().or_else(|| self.updated_at())
    }
}

impl TimestampedContent for GithubIssue {
    fn created_at(&self) -> Option<&str> {
        Some(self.created_at.as_str())
    }

    fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    fn last_edited_at(&self) -> Option<&str> {
        self.last_edited_at.as_deref()
    }
}

impl TimestampedContent for GithubPullRequest {
    fn created_at(&self) -> Option<&str> {
        Some(self.created_at.as_str())
    }

    fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    fn last_edited_at(&self) -> Option<&str> {
        self.last_edited_at.as_deref()
    }
}

impl TimestampedContent for GithubIssueComment {
    fn created_at(&self) -> Option<&str> {
        Some(self.created_at.as_str())
    }

    fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    fn last_edited_at(&self) -> Option<&str> {
        self.last_edited_at.as_deref()
    }
}

impl TimestampedContent for GithubReview {
    fn created_at(&self) -> Option<&str> {
        self.submitted_at.as_deref()
    }

    fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    fn last_edited_at(&self) -> Option<&str> {
        self.last_edited_at.as_deref()
    }
}

impl TimestampedContent for GithubReviewComment {
    fn created_at(&self) -> Option<&str> {
        Some(self.created_at.as_str())
    }

    fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    fn last_edited_at(&self) -> Option<&str> {
        self.last_edited_at.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ContentKind` values.
pub enum ContentKind {
    IssueBody,
    PrBody,
    IssueComment,
    ReviewBody,
    ReviewComment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One vetted body in the snapshot's ordered safe-body list.
pub struct SafeBody {
    pub kind: ContentKind,
    pub id: Option<u64>,
    pub entity_number: u64,
    pub author: String,
    pub body: String,
}
