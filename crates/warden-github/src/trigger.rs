//! Pure trigger evaluation over an [`EventContext`].

use regex::RegexBuilder;

use crate::event_context::{EventContext, EventKind};
use crate::issue_filter::{build_trigger_labels, labels_match_trigger, login_matches_assignee};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Enumerates supported `PhraseMatchMode` values.
pub enum PhraseMatchMode {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl PhraseMatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CaseSensitive => "case-sensitive",
            Self::CaseInsensitive => "case-insensitive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which rule fired for a triggered event.
pub enum TriggerRule {
    ExplicitPrompt,
    Phrase,
    Label,
    Assignee,
}

impl TriggerRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitPrompt => "explicit_prompt",
            Self::Phrase => "trigger_phrase",
            Self::Label => "trigger_label",
            Self::Assignee => "trigger_assignee",
        }
    }
}

/// Whole-token phrase match: the phrase may not be glued to word characters
/// on either side, so `@claude` never matches inside `my@claude_helper`.
/// For `@`-handles a trailing `-` continues the handle (`@claude-bot`).
pub fn contains_trigger_phrase(text: &str, phrase: &str, mode: PhraseMatchMode) -> bool {
    let phrase = phrase.trim();
    if phrase.is_empty() || text.is_empty() {
        return false;
    }
    let trailing = if phrase.starts_with('@') {
        r"[^\w-]"
    } else {
        r"[^\w]"
    };
    let pattern = format!(
        r"(?:^|[^\w]){}(?:{trailing}|$)",
        regex::escape(phrase)
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(mode == PhraseMatchMode::CaseInsensitive)
        .build()
        .map(|regex| regex.is_match(text))
        .unwrap_or(false)
}

/// Returns the first rule that fires, evaluated in fixed order:
/// accepted kind gate, explicit prompt, phrase, label, assignee.
pub fn evaluate_trigger(context: &EventContext, accepted_kinds: &[EventKind]) -> Option<TriggerRule> {
    if !accepted_kinds.contains(&context.event_kind) {
        return None;
    }
    if context.inputs.direct_prompt().is_some() {
        return Some(TriggerRule::ExplicitPrompt);
    }
    if phrase_candidates(context).into_iter().any(|text| {
        contains_trigger_phrase(
            text,
            &context.inputs.trigger_phrase,
            context.inputs.phrase_match,
        )
    }) {
        return Some(TriggerRule::Phrase);
    }
    if label_rule_matches(context) {
        return Some(TriggerRule::Label);
    }
    if assignee_rule_matches(context) {
        return Some(TriggerRule::Assignee);
    }
    None
}

pub fn should_trigger(context: &EventContext, accepted_kinds: &[EventKind]) -> bool {
    evaluate_trigger(context, accepted_kinds).is_some()
}

fn is_entity_lifecycle_event(context: &EventContext) -> bool {
    matches!(
        context.event_kind,
        EventKind::Issues | EventKind::PullRequest
    )
}

fn phrase_candidates(context: &EventContext) -> Vec<&str> {
    if matches!(context.event_action.as_deref(), Some("deleted" | "dismissed")) {
        return Vec::new();
    }
    let payload = &context.payload;
    match context.event_kind {
        EventKind::IssueComment | EventKind::PullRequestReviewComment => payload
            .comment
            .as_ref()
            .map(|comment| vec![comment.body.as_str()])
            .unwrap_or_default(),
        EventKind::PullRequestReview => payload
            .review
            .as_ref()
            .map(|review| vec![review.body.as_str()])
            .unwrap_or_default(),
        EventKind::Issues | EventKind::PullRequest => {
            if context.event_action.is_some()
                && !context.action_is("opened")
                && !context.action_is("edited")
            {
                return Vec::new();
            }
            [payload.entity_title.as_deref(), payload.entity_body.as_deref()]
                .into_iter()
                .flatten()
                .collect()
        }
        EventKind::Other(_) => Vec::new(),
    }
}

fn label_rule_matches(context: &EventContext) -> bool {
    if !is_entity_lifecycle_event(context) {
        return false;
    }
    let triggers = build_trigger_labels(context.inputs.label_triggers.iter().map(String::as_str));
    if context.action_is("labeled") {
        return context
            .payload
            .label_name
            .as_deref()
            .map(|label| labels_match_trigger([label], &triggers))
            .unwrap_or(false);
    }
    context.action_is("opened")
        && labels_match_trigger(
            context.payload.entity_labels.iter().map(String::as_str),
            &triggers,
        )
}

fn assignee_rule_matches(context: &EventContext) -> bool {
    if !is_entity_lifecycle_event(context) || !context.action_is("assigned") {
        return false;
    }
    match (
        context.payload.assignee_login.as_deref(),
        context.inputs.assignee_trigger.as_deref(),
    ) {
        (Some(login), Some(expected)) => login_matches_assignee(login, expected),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{
        contains_trigger_phrase, evaluate_trigger, should_trigger, PhraseMatchMode, TriggerRule,
    };
    use crate::event_context::{EventContext, EventKind, FeatureFlags, TriggerInputs};

    fn context_with(event_name: &str, payload: Value, inputs: TriggerInputs) -> EventContext {
        EventContext::from_webhook(
            event_name,
            &payload,
            Some("acme/widgets"),
            inputs,
            FeatureFlags::default(),
        )
        .expect("context")
    }

    fn comment_event(body: &str) -> EventContext {
        context_with(
            "issue_comment",
            json!({
                "action": "created",
                "issue": { "number": 5, "title": "t", "body": "b" },
                "comment": { "body": body, "created_at": "2024-01-01T10:05:00Z" }
            }),
            TriggerInputs::default(),
        )
    }

    fn all_kinds() -> Vec<EventKind> {
        EventKind::ENTITY_KINDS.to_vec()
    }

    #[test]
    fn unit_contains_trigger_phrase_requires_word_boundaries() {
        let mode = PhraseMatchMode::CaseSensitive;
        assert!(contains_trigger_phrase("@claude", "@claude", mode));
        assert!(contains_trigger_phrase("hey @claude, fix it", "@claude", mode));
        assert!(contains_trigger_phrase("(@claude)", "@claude", mode));
        assert!(!contains_trigger_phrase("@claudette help", "@claude", mode));
        assert!(!contains_trigger_phrase("ping@claude please", "@claude", mode));
        assert!(!contains_trigger_phrase("anything", "   ", mode));
    }

    #[test]
    fn regression_handle_phrase_ignores_other_hyphenated_handles() {
        let mode = PhraseMatchMode::CaseSensitive;
        assert!(!contains_trigger_phrase("cc @claude-bot for triage", "@claude", mode));
        assert!(contains_trigger_phrase("@claude - please rebase", "@claude", mode));
        assert!(contains_trigger_phrase("@claude-bot: go", "@claude-bot", mode));
        assert!(contains_trigger_phrase("run build-check now", "build", mode));
    }

    #[test]
    fn unit_contains_trigger_phrase_honors_case_mode() {
        assert!(!contains_trigger_phrase(
            "@Claude help",
            "@claude",
            PhraseMatchMode::CaseSensitive
        ));
        assert!(contains_trigger_phrase(
            "@Claude help",
            "@claude",
            PhraseMatchMode::CaseInsensitive
        ));
    }

    #[test]
    fn functional_issue_comment_with_phrase_inside_sentence_triggers() {
        let context = comment_event("Thanks for the report. @claude can you take a look?");
        assert_eq!(
            evaluate_trigger(&context, &all_kinds()),
            Some(TriggerRule::Phrase)
        );
    }

    #[test]
    fn functional_phrase_inside_code_fence_identifier_does_not_trigger() {
        let context = comment_event("```rust\nlet handler = my@claude_helper();\n```");
        assert!(!should_trigger(&context, &all_kinds()));
    }

    #[test]
    fn functional_unaccepted_event_kind_is_rejected_even_with_phrase() {
        let context = comment_event("@claude do it");
        assert!(!should_trigger(&context, &[EventKind::Issues]));
    }

    #[test]
    fn functional_explicit_prompt_triggers_without_phrase() {
        let inputs = TriggerInputs {
            prompt: Some("Summarize the discussion".to_string()),
            ..TriggerInputs::default()
        };
        let context = context_with(
            "issue_comment",
            json!({
                "issue": { "number": 5 },
                "comment": { "body": "no mention here", "created_at": "2024-01-01T10:05:00Z" }
            }),
            inputs,
        );
        assert_eq!(
            evaluate_trigger(&context, &all_kinds()),
            Some(TriggerRule::ExplicitPrompt)
        );
    }

    #[test]
    fn integration_opened_issue_matches_phrase_in_title() {
        let context = context_with(
            "issues",
            json!({
                "action": "opened",
                "issue": { "number": 8, "title": "@claude implement caching", "body": null }
            }),
            TriggerInputs::default(),
        );
        assert_eq!(
            evaluate_trigger(&context, &all_kinds()),
            Some(TriggerRule::Phrase)
        );
    }

    #[test]
    fn integration_labeled_event_matches_configured_label() {
        let inputs = TriggerInputs {
            label_triggers: vec!["Claude".to_string()],
            ..TriggerInputs::default()
        };
        let labeled = context_with(
            "issues",
            json!({
                "action": "labeled",
                "issue": { "number": 8, "title": "t", "body": "@claude in body" },
                "label": { "name": "claude" }
            }),
            inputs.clone(),
        );
        assert_eq!(
            evaluate_trigger(&labeled, &all_kinds()),
            Some(TriggerRule::Label)
        );

        let other_label = context_with(
            "issues",
            json!({
                "action": "labeled",
                "issue": { "number": 8, "title": "t", "body": "b" },
                "label": { "name": "bug" }
            }),
            inputs,
        );
        assert!(!should_trigger(&other_label, &all_kinds()));
    }

    #[test]
    fn integration_assignment_event_matches_configured_assignee() {
        let inputs = TriggerInputs {
            assignee_trigger: Some("@claude-bot".to_string()),
            ..TriggerInputs::default()
        };
        let assigned = context_with(
            "issues",
            json!({
                "action": "assigned",
                "issue": { "number": 8, "title": "t", "body": "b" },
                "assignee": { "login": "claude-bot" }
            }),
            inputs.clone(),
        );
        assert_eq!(
            evaluate_trigger(&assigned, &all_kinds()),
            Some(TriggerRule::Assignee)
        );

        let comment = context_with(
            "issue_comment",
            json!({
                "action": "created",
                "issue": { "number": 8 },
                "assignee": { "login": "claude-bot" },
                "comment": { "body": "thanks", "created_at": "2024-01-01T10:05:00Z" }
            }),
            inputs,
        );
        assert!(!should_trigger(&comment, &all_kinds()));
    }

    #[test]
    fn regression_deleted_comment_and_label_only_events_do_not_phrase_trigger() {
        let deleted = context_with(
            "issue_comment",
            json!({
                "action": "deleted",
                "issue": { "number": 5 },
                "comment": { "body": "@claude", "created_at": "2024-01-01T10:05:00Z" }
            }),
            TriggerInputs::default(),
        );
        assert!(!should_trigger(&deleted, &all_kinds()));

        let closed = context_with(
            "issues",
            json!({
                "action": "closed",
                "issue": { "number": 8, "title": "@claude", "body": "@claude" }
            }),
            TriggerInputs::default(),
        );
        assert!(!should_trigger(&closed, &all_kinds()));
    }

    #[test]
    fn regression_review_body_is_the_phrase_source_for_reviews() {
        let review = context_with(
            "pull_request_review",
            json!({
                "action": "submitted",
                "pull_request": { "number": 3, "title": "t", "body": "@claude in pr body" },
                "review": { "body": "looks fine", "submitted_at": "2024-01-01T10:05:00Z" }
            }),
            TriggerInputs::default(),
        );
        assert!(!should_trigger(&review, &all_kinds()));
    }
}
