use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use warden_github::event_context::DEFAULT_TRIGGER_PHRASE;

use crate::cli_types::{CliPermissionPolicy, CliPhraseMatchMode};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "warden",
    about = "Webhook-triggered assistant bot with temporal integrity checks",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Decide whether the delivery triggers the assistant and assemble its snapshot.
    Prepare(PrepareArgs),
    /// Replace the body of an existing tracking comment.
    UpdateComment(UpdateCommentArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ApiArgs {
    #[arg(
        long = "api-base",
        env = "WARDEN_API_BASE",
        default_value = "https://api.github.com",
        help = "REST API base URL (Gitea: http://host:3000/api/v1)"
    )]
    pub(crate) api_base: String,

    #[arg(
        long = "api-token",
        env = "API_TOKEN",
        hide_env_values = true,
        help = "Token used for repository API access"
    )]
    pub(crate) api_token: String,

    #[arg(
        long = "repository",
        env = "GITHUB_REPOSITORY",
        help = "Repository in owner/repo format; defaults to the payload repository"
    )]
    pub(crate) repository: Option<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "WARDEN_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout in milliseconds"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "WARDEN_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        value_parser = parse_positive_usize,
        help = "Maximum attempts for retryable api failures (429/5xx/transport)"
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "WARDEN_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base backoff delay in milliseconds for retryable api failures"
    )]
    pub(crate) retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct PrepareArgs {
    #[command(flatten)]
    pub(crate) api: ApiArgs,

    #[arg(
        long = "event-name",
        env = "GITHUB_EVENT_NAME",
        help = "Webhook event name (issues, issue_comment, pull_request, ...)"
    )]
    pub(crate) event_name: String,

    #[arg(
        long = "event-path",
        env = "GITHUB_EVENT_PATH",
        help = "Path to the webhook payload JSON"
    )]
    pub(crate) event_path: PathBuf,

    #[arg(
        long = "user-provided-token",
        env = "WARDEN_USER_PROVIDED_TOKEN",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Token was explicitly supplied by the operator; enables --allowed-non-write-users"
    )]
    pub(crate) user_provided_token: bool,

    #[arg(
        long = "trigger-phrase",
        env = "WARDEN_TRIGGER_PHRASE",
        default_value = DEFAULT_TRIGGER_PHRASE,
        help = "Phrase that engages the assistant in comments, reviews, and bodies"
    )]
    pub(crate) trigger_phrase: String,

    #[arg(
        long = "phrase-match",
        env = "WARDEN_PHRASE_MATCH",
        value_enum,
        default_value_t = CliPhraseMatchMode::CaseSensitive,
        help = "Case handling for whole-token trigger phrase matching"
    )]
    pub(crate) phrase_match: CliPhraseMatchMode,

    #[arg(
        long = "label-trigger",
        env = "WARDEN_LABEL_TRIGGER",
        value_delimiter = ',',
        help = "Labels that engage the assistant when applied (repeatable)"
    )]
    pub(crate) label_trigger: Vec<String>,

    #[arg(
        long = "assignee-trigger",
        env = "WARDEN_ASSIGNEE_TRIGGER",
        help = "Login whose assignment engages the assistant"
    )]
    pub(crate) assignee_trigger: Option<String>,

    #[arg(
        long = "prompt",
        env = "WARDEN_PROMPT",
        help = "Direct prompt; when set the run uses agent mode"
    )]
    pub(crate) prompt: Option<String>,

    #[arg(
        long = "allowed-non-write-users",
        env = "WARDEN_ALLOWED_NON_WRITE_USERS",
        value_delimiter = ',',
        help = "Logins allowed without write access ('*' allows everyone)"
    )]
    pub(crate) allowed_non_write_users: Vec<String>,

    #[arg(
        long = "permission-policy",
        env = "WARDEN_PERMISSION_POLICY",
        value_enum,
        default_value_t = CliPermissionPolicy::WriteAccess,
        help = "Actor authorization policy"
    )]
    pub(crate) permission_policy: CliPermissionPolicy,

    #[arg(
        long = "use-commit-signing",
        env = "WARDEN_USE_COMMIT_SIGNING",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Commit through API file tools instead of git commands"
    )]
    pub(crate) use_commit_signing: bool,

    #[arg(
        long = "assistant-args",
        env = "WARDEN_ASSISTANT_ARGS",
        default_value = "",
        allow_hyphen_values = true,
        help = "Extra assistant arguments; --allowedTools/--disallowedTools are read from here"
    )]
    pub(crate) assistant_args: String,

    #[arg(
        long = "append-system-prompt",
        env = "WARDEN_APPEND_SYSTEM_PROMPT",
        help = "System prompt text appended in agent mode"
    )]
    pub(crate) append_system_prompt: Option<String>,

    #[arg(
        long = "tag-event-kinds",
        env = "WARDEN_TAG_EVENT_KINDS",
        help = "Comma-separated event kinds routed to tag mode (default: all entity events)"
    )]
    pub(crate) tag_event_kinds: Option<String>,

    #[arg(
        long = "agent-event-kinds",
        env = "WARDEN_AGENT_EVENT_KINDS",
        help = "Comma-separated event kinds routed to agent mode (default: all entity events)"
    )]
    pub(crate) agent_event_kinds: Option<String>,

    #[arg(
        long = "workspace-dir",
        env = "GITHUB_WORKSPACE",
        default_value = ".",
        help = "Checkout used to fingerprint changed files"
    )]
    pub(crate) workspace_dir: PathBuf,

    #[arg(
        long = "job-run-url",
        env = "WARDEN_JOB_RUN_URL",
        help = "Link to the running job shown in the tracking comment"
    )]
    pub(crate) job_run_url: Option<String>,

    #[arg(long = "server-url", env = "GITHUB_SERVER_URL", hide = true)]
    pub(crate) server_url: Option<String>,

    #[arg(long = "run-id", env = "GITHUB_RUN_ID", hide = true)]
    pub(crate) run_id: Option<String>,

    #[arg(
        long = "output",
        env = "WARDEN_OUTPUT",
        help = "Write the prepare outcome JSON to this path"
    )]
    pub(crate) output: Option<PathBuf>,

    #[arg(
        long = "github-output",
        env = "GITHUB_OUTPUT",
        help = "Append key=value step outputs to this file"
    )]
    pub(crate) github_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct UpdateCommentArgs {
    #[command(flatten)]
    pub(crate) api: ApiArgs,

    #[arg(
        long = "comment-id",
        env = "WARDEN_COMMENT_ID",
        value_parser = parse_positive_u64,
        help = "Tracking comment id to update"
    )]
    pub(crate) comment_id: u64,

    #[arg(
        long = "body",
        conflicts_with = "body_file",
        required_unless_present = "body_file",
        help = "New comment body"
    )]
    pub(crate) body: Option<String>,

    #[arg(long = "body-file", help = "Read the new comment body from this file")]
    pub(crate) body_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};
    use crate::cli_types::{CliPermissionPolicy, CliPhraseMatchMode};

    #[test]
    fn unit_prepare_args_apply_defaults() {
        let cli = Cli::try_parse_from([
            "warden",
            "prepare",
            "--api-token",
            "t",
            "--event-name",
            "issue_comment",
            "--event-path",
            "/tmp/event.json",
        ])
        .expect("parse");
        let Command::Prepare(args) = cli.command else {
            panic!("expected prepare");
        };
        assert_eq!(args.trigger_phrase, "@claude");
        assert_eq!(args.phrase_match, CliPhraseMatchMode::CaseSensitive);
        assert_eq!(args.permission_policy, CliPermissionPolicy::WriteAccess);
        assert_eq!(args.api.api_base, "https://api.github.com");
        assert_eq!(args.api.retry_max_attempts, 4);
        assert!(!args.user_provided_token);
        assert!(args.label_trigger.is_empty());
    }

    #[test]
    fn functional_prepare_args_split_comma_lists_and_enums() {
        let cli = Cli::try_parse_from([
            "warden",
            "prepare",
            "--api-token=t",
            "--event-name=issues",
            "--event-path=/tmp/event.json",
            "--label-trigger=claude,assistant",
            "--allowed-non-write-users=alice,bob",
            "--phrase-match=case-insensitive",
            "--permission-policy=trusted",
            "--user-provided-token",
            "--assistant-args=--allowedTools Read",
        ])
        .expect("parse");
        let Command::Prepare(args) = cli.command else {
            panic!("expected prepare");
        };
        assert_eq!(args.label_trigger, vec!["claude", "assistant"]);
        assert_eq!(args.allowed_non_write_users, vec!["alice", "bob"]);
        assert_eq!(args.phrase_match, CliPhraseMatchMode::CaseInsensitive);
        assert_eq!(args.permission_policy, CliPermissionPolicy::Trusted);
        assert!(args.user_provided_token);
        assert_eq!(args.assistant_args, "--allowedTools Read");
    }

    #[test]
    fn regression_update_comment_requires_exactly_one_body_source() {
        assert!(Cli::try_parse_from([
            "warden",
            "update-comment",
            "--api-token=t",
            "--comment-id=5",
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "warden",
            "update-comment",
            "--api-token=t",
            "--comment-id=5",
            "--body=x",
            "--body-file=/tmp/body.md",
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "warden",
            "update-comment",
            "--api-token=t",
            "--comment-id=0",
            "--body=x",
        ])
        .is_err());
    }
}
