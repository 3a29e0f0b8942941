//! Normalized, immutable view of one inbound webhook delivery.

use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::api_types::GithubIssueLabel;
use crate::trigger::PhraseMatchMode;

pub const DEFAULT_TRIGGER_PHRASE: &str = "@claude";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Enumerates supported `EventKind` values.
pub enum EventKind {
    Issues,
    IssueComment,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Other(String),
}

impl EventKind {
    /// Event kinds that always reference an issue or pull request.
    pub const ENTITY_KINDS: [EventKind; 5] = [
        EventKind::Issues,
        EventKind::IssueComment,
        EventKind::PullRequest,
        EventKind::PullRequestReview,
        EventKind::PullRequestReviewComment,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "issues" => Self::Issues,
            "issue_comment" => Self::IssueComment,
            "pull_request" | "pull_request_target" => Self::PullRequest,
            "pull_request_review" => Self::PullRequestReview,
            "pull_request_review_comment" => Self::PullRequestReviewComment,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Issues => "issues",
            Self::IssueComment => "issue_comment",
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::PullRequestReviewComment => "pull_request_review_comment",
            Self::Other(name) => name.as_str(),
        }
    }

    pub fn is_entity_kind(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Issue,
    PullRequest,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pull request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Issue or pull request targeted by the event.
pub struct EntityRef {
    pub number: u64,
    pub kind: EntityKind,
}

impl EntityRef {
    pub fn is_pull_request(&self) -> bool {
        self.kind == EntityKind::PullRequest
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid repository '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid repository '{raw}', expected owner/repo");
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Operator-configured trigger inputs carried alongside each event.
pub struct TriggerInputs {
    pub trigger_phrase: String,
    pub phrase_match: PhraseMatchMode,
    pub label_triggers: Vec<String>,
    pub assignee_trigger: Option<String>,
    pub prompt: Option<String>,
    pub allowed_non_write_users: Vec<String>,
    pub append_system_prompt: Option<String>,
    pub assistant_args: String,
}

impl Default for TriggerInputs {
    fn default() -> Self {
        Self {
            trigger_phrase: DEFAULT_TRIGGER_PHRASE.to_string(),
            phrase_match: PhraseMatchMode::CaseSensitive,
            label_triggers: Vec::new(),
            assignee_trigger: None,
            prompt: None,
            allowed_non_write_users: Vec::new(),
            append_system_prompt: None,
            assistant_args: String::new(),
        }
    }
}

impl TriggerInputs {
    /// Returns the configured prompt when it carries non-whitespace content.
    pub fn direct_prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub use_commit_signing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadComment {
    pub body: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadReview {
    pub body: String,
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Text and timestamp fields of the payload needed for triggering.
pub struct EventPayload {
    pub entity_title: Option<String>,
    pub entity_body: Option<String>,
    pub entity_labels: Vec<String>,
    pub comment: Option<PayloadComment>,
    pub review: Option<PayloadReview>,
    pub assignee_login: Option<String>,
    pub label_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable record built once per invocation from the webhook delivery.
pub struct EventContext {
    pub event_kind: EventKind,
    pub event_action: Option<String>,
    pub actor: String,
    pub actor_id: Option<u64>,
    pub repository: RepoRef,
    pub entity: Option<EntityRef>,
    pub payload: EventPayload,
    pub inputs: TriggerInputs,
    pub flags: FeatureFlags,
}

impl EventContext {
    /// Normalizes a raw webhook payload. `fallback_repository` (an `owner/repo`
    /// slug) is used when the payload carries no repository object.
    pub fn from_webhook(
        event_name: &str,
        payload: &Value,
        fallback_repository: Option<&str>,
        inputs: TriggerInputs,
        flags: FeatureFlags,
    ) -> Result<Self> {
        let event_kind = EventKind::parse(event_name);
        let raw: WebhookPayload = serde_json::from_value(payload.clone())
            .with_context(|| format!("failed to decode {event_kind} webhook payload"))?;

        let repository = match (&raw.repository, fallback_repository) {
            (Some(repository), _) => repository.to_repo_ref()?,
            (None, Some(slug)) => RepoRef::parse(slug)?,
            (None, None) => bail!("webhook payload carries no repository and none was configured"),
        };

        let entity = match event_kind {
            EventKind::Issues => raw.issue.as_ref().map(|issue| EntityRef {
                number: issue.number,
                kind: EntityKind::Issue,
            }),
            EventKind::IssueComment => raw.issue.as_ref().map(|issue| EntityRef {
                number: issue.number,
                kind: if issue.pull_request.is_some() {
                    EntityKind::PullRequest
                } else {
                    EntityKind::Issue
                },
            }),
            EventKind::PullRequest
            | EventKind::PullRequestReview
            | EventKind::PullRequestReviewComment => {
                raw.pull_request.as_ref().map(|pull| EntityRef {
                    number: pull.number,
                    kind: EntityKind::PullRequest,
                })
            }
            EventKind::Other(_) => None,
        };

        let entity_source = raw.issue.as_ref().or(raw.pull_request.as_ref());
        let payload = EventPayload {
            entity_title: entity_source.and_then(|entity| entity.title.clone()),
            entity_body: entity_source.and_then(|entity| entity.body.clone()),
            entity_labels: entity_source
                .map(|entity| {
                    entity
                        .labels
                        .iter()
                        .map(|label| label.name.clone())
                        .collect()
                })
                .unwrap_or_default(),
            comment: raw.comment.as_ref().map(|comment| PayloadComment {
                body: comment.body.clone().unwrap_or_default(),
                created_at: comment.created_at.clone(),
            }),
            review: raw.review.as_ref().map(|review| PayloadReview {
                body: review.body.clone().unwrap_or_default(),
                submitted_at: review.submitted_at.clone(),
            }),
            assignee_login: raw.assignee.as_ref().map(|user| user.login.clone()),
            label_name: raw.label.as_ref().map(|label| label.name.clone()),
        };

        Ok(Self {
            event_kind,
            event_action: raw.action.clone(),
            actor: raw
                .sender
                .as_ref()
                .map(|sender| sender.login.trim().to_string())
                .unwrap_or_default(),
            actor_id: raw.sender.as_ref().and_then(|sender| sender.id),
            repository,
            entity,
            payload,
            inputs,
            flags,
        })
    }

    pub fn is_entity_event(&self) -> bool {
        self.entity.is_some()
    }

    pub fn action_is(&self, action: &str) -> bool {
        self.event_action.as_deref() == Some(action)
    }
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    sender: Option<WebhookUser>,
    #[serde(default)]
    repository: Option<WebhookRepository>,
    #[serde(default)]
    issue: Option<WebhookEntity>,
    #[serde(default)]
    pull_request: Option<WebhookEntity>,
    #[serde(default)]
    comment: Option<WebhookComment>,
    #[serde(default)]
    review: Option<WebhookReview>,
    #[serde(default)]
    assignee: Option<WebhookUser>,
    #[serde(default)]
    label: Option<GithubIssueLabel>,
}

#[derive(Debug, Deserialize)]
struct WebhookUser {
    login: String,
    #[serde(default)]
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WebhookRepository {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    owner: Option<WebhookUser>,
}

impl WebhookRepository {
    fn to_repo_ref(&self) -> Result<RepoRef> {
        if let (Some(owner), Some(name)) = (&self.owner, &self.name) {
            return RepoRef::parse(&format!("{}/{}", owner.login, name));
        }
        let full_name = self
            .full_name
            .as_deref()
            .ok_or_else(|| anyhow!("webhook repository object has no owner/name"))?;
        RepoRef::parse(full_name)
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEntity {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WebhookComment {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookReview {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    submitted_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        EntityKind, EventContext, EventKind, FeatureFlags, RepoRef, TriggerInputs,
    };

    #[test]
    fn unit_repo_ref_parse_accepts_owner_repo_shape() {
        let repo = RepoRef::parse("acme/widgets").expect("parse repo");
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.as_slug(), "acme/widgets");

        let error = RepoRef::parse("missing").expect_err("invalid repo should fail");
        assert!(error.to_string().contains("expected owner/repo"));
        assert!(RepoRef::parse("a/b/c").is_err());
    }

    #[test]
    fn unit_event_kind_parse_round_trips_known_names() {
        for kind in EventKind::ENTITY_KINDS {
            assert_eq!(EventKind::parse(kind.as_str()), kind);
            assert!(kind.is_entity_kind());
        }
        assert_eq!(EventKind::parse("push"), EventKind::Other("push".to_string()));
        assert!(!EventKind::parse("push").is_entity_kind());
    }

    #[test]
    fn functional_from_webhook_detects_pull_request_issue_comment() {
        let payload = json!({
            "action": "created",
            "sender": { "login": "alice", "id": 7 },
            "repository": { "name": "widgets", "owner": { "login": "acme" } },
            "issue": {
                "number": 12,
                "title": "Add cache",
                "body": "body text",
                "labels": [{ "name": "enhancement" }],
                "pull_request": { "url": "https://example.invalid/pulls/12" }
            },
            "comment": { "body": "@claude review", "created_at": "2024-01-01T10:05:00Z" }
        });
        let context = EventContext::from_webhook(
            "issue_comment",
            &payload,
            None,
            TriggerInputs::default(),
            FeatureFlags::default(),
        )
        .expect("context");
        assert_eq!(context.event_kind, EventKind::IssueComment);
        assert_eq!(context.actor, "alice");
        assert_eq!(context.actor_id, Some(7));
        let entity = context.entity.expect("entity");
        assert_eq!(entity.number, 12);
        assert_eq!(entity.kind, EntityKind::PullRequest);
        assert_eq!(context.payload.entity_labels, vec!["enhancement".to_string()]);
        let comment = context.payload.comment.expect("comment");
        assert_eq!(comment.created_at.as_deref(), Some("2024-01-01T10:05:00Z"));
    }

    #[test]
    fn integration_from_webhook_uses_fallback_repository_for_non_entity_events() {
        let payload = json!({ "ref": "refs/heads/main", "sender": { "login": "alice" } });
        let context = EventContext::from_webhook(
            "push",
            &payload,
            Some("acme/widgets"),
            TriggerInputs::default(),
            FeatureFlags::default(),
        )
        .expect("context");
        assert_eq!(context.repository.as_slug(), "acme/widgets");
        assert!(context.entity.is_none());
        assert!(!context.is_entity_event());
    }

    #[test]
    fn regression_from_webhook_requires_some_repository() {
        let payload = json!({ "sender": { "login": "alice" } });
        let error = EventContext::from_webhook(
            "push",
            &payload,
            None,
            TriggerInputs::default(),
            FeatureFlags::default(),
        )
        .expect_err("missing repository should fail");
        assert!(error.to_string().contains("no repository"));
    }

    #[test]
    fn regression_direct_prompt_ignores_whitespace_only_prompt() {
        let inputs = TriggerInputs {
            prompt: Some("   ".to_string()),
            ..TriggerInputs::default()
        };
        assert_eq!(inputs.direct_prompt(), None);
    }
}
