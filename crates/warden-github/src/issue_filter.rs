use std::collections::HashSet;

/// Normalize label names for case-insensitive matching.
pub fn normalize_issue_label(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Normalize a login for comparison: trims, drops a leading `@`, lowercases.
pub fn normalize_login(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_ascii_lowercase()
}

/// Build the normalized set of trigger labels from CLI or configuration values.
pub fn build_trigger_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    labels
        .into_iter()
        .map(normalize_issue_label)
        .filter(|label| !label.is_empty())
        .collect::<HashSet<_>>()
}

/// Return true when any label is a configured trigger label.
///
/// An empty trigger set never matches: label triggering is opt-in.
pub fn labels_match_trigger<'a>(
    labels: impl IntoIterator<Item = &'a str>,
    triggers: &HashSet<String>,
) -> bool {
    if triggers.is_empty() {
        return false;
    }
    labels
        .into_iter()
        .map(normalize_issue_label)
        .any(|label| triggers.contains(&label))
}

/// Return true when `login` names the configured trigger assignee.
pub fn login_matches_assignee(login: &str, assignee_trigger: &str) -> bool {
    let expected = normalize_login(assignee_trigger);
    !expected.is_empty() && normalize_login(login) == expected
}

#[cfg(test)]
mod tests {
    use super::{
        build_trigger_labels, labels_match_trigger, login_matches_assignee, normalize_issue_label,
        normalize_login,
    };
    use std::collections::HashSet;

    #[test]
    fn unit_normalize_issue_label_trims_and_lowercases() {
        assert_eq!(normalize_issue_label("  Claude-Ready  "), "claude-ready");
        assert_eq!(normalize_login(" @Claude-Bot "), "claude-bot");
    }

    #[test]
    fn functional_build_trigger_labels_deduplicates_and_ignores_blank_values() {
        let labels = vec!["  Claude  ", "claude", "", "  "];
        let normalized = build_trigger_labels(labels);
        assert_eq!(normalized.len(), 1);
        assert!(normalized.contains("claude"));
    }

    #[test]
    fn integration_labels_match_trigger_is_case_insensitive() {
        let triggers = HashSet::from([String::from("assistant:go")]);
        assert!(labels_match_trigger(["Assistant:Go", "bug"], &triggers));
        assert!(!labels_match_trigger(["bug"], &triggers));
    }

    #[test]
    fn regression_empty_trigger_sets_and_assignees_never_match() {
        assert!(!labels_match_trigger(["claude"], &HashSet::new()));
        assert!(!login_matches_assignee("claude", ""));
        assert!(!login_matches_assignee("", "@"));
        assert!(login_matches_assignee("Claude", "@claude"));
    }
}
