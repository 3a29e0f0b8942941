//! Temporal integrity checks guarding against edit-after-trigger injection.
//!
//! Content is trusted only when it was created, and last edited, strictly
//! before the trigger instant. Ties are unsafe. When no trigger time exists
//! the input passes through unchanged.

use thiserror::Error;
use tracing::warn;
use warden_core::parse_rfc3339_to_unix_ms;

use crate::content_item::TimestampedContent;
use crate::event_context::{EventContext, EventKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("trigger timestamp '{raw}' from {source_field} is not a valid RFC3339 timestamp")]
    InvalidTriggerTimestamp {
        raw: String,
        source_field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parsed point-in-time cutoff, kept with its original text for reporting.
pub struct TriggerTime {
    raw: String,
    unix_ms: i64,
}

impl TriggerTime {
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        Self::parse_from(raw, "configuration")
    }

    fn parse_from(raw: &str, source_field: &'static str) -> Result<Self, TimestampError> {
        let unix_ms = parse_rfc3339_to_unix_ms(raw).ok_or_else(|| {
            TimestampError::InvalidTriggerTimestamp {
                raw: raw.to_string(),
                source_field,
            }
        })?;
        Ok(Self {
            raw: raw.trim().to_string(),
            unix_ms,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn unix_ms(&self) -> i64 {
        self.unix_ms
    }
}

/// Derives the trigger time from the sub-event that caused the invocation.
///
/// Label, assignment, and open events have no reliable anchor and yield `None`.
pub fn extract_trigger_timestamp(
    context: &EventContext,
) -> Result<Option<TriggerTime>, TimestampError> {
    let (raw, source_field) = match context.event_kind {
        EventKind::IssueComment => (
            context
                .payload
                .comment
                .as_ref()
                .and_then(|comment| comment.created_at.as_deref()),
            "comment.created_at",
        ),
        EventKind::PullRequestReview => (
            context
                .payload
                .review
                .as_ref()
                .and_then(|review| review.submitted_at.as_deref()),
            "review.submitted_at",
        ),
        EventKind::PullRequestReviewComment => (
            context
                .payload
                .comment
                .as_ref()
                .and_then(|comment| comment.created_at.as_deref()),
            "comment.created_at",
        ),
        EventKind::Issues | EventKind::PullRequest | EventKind::Other(_) => return Ok(None),
    };
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => TriggerTime::parse_from(value, source_field).map(Some),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `TemporalVerdict` values.
pub enum TemporalVerdict {
    Safe,
    CreatedAtOrAfterTrigger,
    EditedAtOrAfterTrigger,
    MissingCreationTime,
    UnparseableTimestamp,
}

impl TemporalVerdict {
    pub fn is_safe(self) -> bool {
        self == Self::Safe
    }

    pub fn reason_code(self) -> &'static str {
        match self {
            Self::Safe => "allow_before_trigger",
            Self::CreatedAtOrAfterTrigger => "deny_created_at_or_after_trigger",
            Self::EditedAtOrAfterTrigger => "deny_edited_at_or_after_trigger",
            Self::MissingCreationTime => "deny_missing_creation_time",
            Self::UnparseableTimestamp => "deny_unparseable_timestamp",
        }
    }
}

/// Two-part rule: creation strictly before trigger, and effective edit time
/// (if any) strictly before trigger.
pub fn temporal_verdict<T>(item: &T, trigger: &TriggerTime) -> TemporalVerdict
where
    T: TimestampedContent + ?Sized,
{
    let Some(created_at) = item.created_at() else {
        return TemporalVerdict::MissingCreationTime;
    };
    let Some(created_ms) = parse_rfc3339_to_unix_ms(created_at) else {
        return TemporalVerdict::UnparseableTimestamp;
    };
    if created_ms >= trigger.unix_ms() {
        return TemporalVerdict::CreatedAtOrAfterTrigger;
    }

    if let Some(edited_at) = item.effective_edit_time() {
        let Some(edited_ms) = parse_rfc3339_to_unix_ms(edited_at) else {
            return TemporalVerdict::UnparseableTimestamp;
        };
        if edited_ms >= trigger.unix_ms() {
            return TemporalVerdict::EditedAtOrAfterTrigger;
        }
    }
    TemporalVerdict::Safe
}

/// Keeps items whose final state predates the trigger, preserving relative order.
///
/// With no trigger time the input vector is returned as-is.
pub fn filter_to_trigger_time<T>(items: Vec<T>, trigger: Option<&TriggerTime>) -> Vec<T>
where
    T: TimestampedContent,
{
    let Some(trigger) = trigger else {
        return items;
    };
    items
        .into_iter()
        .filter(|item| {
            let verdict = temporal_verdict(item, trigger);
            if !verdict.is_safe() {
                warn!(
                    reason = "temporal_safety",
                    verdict = verdict.reason_code(),
                    created_at = item.created_at().unwrap_or_default(),
                    edited_at = item.effective_edit_time().unwrap_or_default(),
                    trigger_time = trigger.as_str(),
                    "excluding content item changed at or after trigger time"
                );
            }
            verdict.is_safe()
        })
        .collect()
}

/// Single-item form used for issue and pull request bodies.
pub fn is_body_safe_to_use<T>(item: &T, trigger: Option<&TriggerTime>) -> bool
where
    T: TimestampedContent + ?Sized,
{
    match trigger {
        Some(trigger) => temporal_verdict(item, trigger).is_safe(),
        None => true,
    }
}
