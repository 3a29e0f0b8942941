use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
/// Public struct `GithubUser` used across Warden components.
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl GithubUser {
    /// Display name preferring the Gitea `full_name` field over the GitHub `name` field.
    pub fn display_name(&self) -> Option<String> {
        [self.full_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
/// Public struct `GithubIssueLabel` used across Warden components.
pub struct GithubIssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
/// Issue record as returned by `GET /repos/{owner}/{repo}/issues/{number}`.
pub struct GithubIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, alias = "lastEditedAt")]
    pub last_edited_at: Option<String>,
    pub user: GithubUser,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GithubBranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
/// Pull request record as returned by `GET /repos/{owner}/{repo}/pulls/{number}`.
pub struct GithubPullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, alias = "lastEditedAt")]
    pub last_edited_at: Option<String>,
    pub user: GithubUser,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pub head: Option<GithubBranchRef>,
    #[serde(default)]
    pub base: Option<GithubBranchRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
/// Public struct `GithubIssueComment` used across Warden components.
pub struct GithubIssueComment {
    pub id: u64,
    pub body: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, alias = "lastEditedAt")]
    pub last_edited_at: Option<String>,
    pub user: GithubUser,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
/// Submitted review on a pull request. Pending reviews carry no `submitted_at`.
pub struct GithubReview {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, alias = "lastEditedAt")]
    pub last_edited_at: Option<String>,
    pub user: GithubUser,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
/// Inline comment attached to a review.
pub struct GithubReviewComment {
    pub id: u64,
    pub body: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, alias = "lastEditedAt")]
    pub last_edited_at: Option<String>,
    pub user: GithubUser,
    #[serde(default)]
    pub pull_request_review_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
/// Changed file row from `GET /repos/{owner}/{repo}/pulls/{number}/files`.
pub struct GithubPullRequestFile {
    pub filename: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub previous_filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GithubCollaboratorPermission {
    pub permission: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GithubCommentCreateResponse {
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GithubIssue, GithubIssueComment, GithubReview, GithubUser};

    #[test]
    fn unit_github_user_display_name_prefers_full_name_and_skips_blank() {
        let user = GithubUser {
            login: "alice".to_string(),
            id: Some(1),
            full_name: Some("  ".to_string()),
            name: Some("Alice A.".to_string()),
        };
        assert_eq!(user.display_name().as_deref(), Some("Alice A."));

        let bare = GithubUser {
            login: "bob".to_string(),
            ..GithubUser::default()
        };
        assert_eq!(bare.display_name(), None);
    }

    #[test]
    fn functional_issue_decodes_gitea_shape_without_edit_fields() {
        let issue: GithubIssue = serde_json::from_value(json!({
            "id": 9,
            "number": 3,
            "title": "Broken build",
            "body": "please look",
            "state": "open",
            "created_at": "2024-01-01T08:00:00Z",
            "updated_at": "2024-01-01T08:30:00Z",
            "user": { "login": "alice", "id": 4, "full_name": "Alice" },
            "labels": [{ "name": "bug" }],
            "pull_request": null
        }))
        .expect("decode issue");
        assert_eq!(issue.number, 3);
        assert_eq!(issue.last_edited_at, None);
        assert_eq!(issue.updated_at.as_deref(), Some("2024-01-01T08:30:00Z"));
        assert!(issue.pull_request.is_none());
    }

    #[test]
    fn integration_comment_accepts_graphql_style_last_edited_alias() {
        let comment: GithubIssueComment = serde_json::from_value(json!({
            "id": 1,
            "body": "hi",
            "created_at": "2024-01-01T09:00:00Z",
            "lastEditedAt": "2024-01-01T10:06:00Z",
            "user": { "login": "mallory" }
        }))
        .expect("decode comment");
        assert_eq!(
            comment.last_edited_at.as_deref(),
            Some("2024-01-01T10:06:00Z")
        );
        assert_eq!(comment.updated_at, None);
    }

    #[test]
    fn regression_pending_review_decodes_without_submitted_at() {
        let review: GithubReview = serde_json::from_value(json!({
            "id": 5,
            "state": "PENDING",
            "user": { "login": "carol" }
        }))
        .expect("decode review");
        assert_eq!(review.submitted_at, None);
        assert_eq!(review.body, None);
    }
}
