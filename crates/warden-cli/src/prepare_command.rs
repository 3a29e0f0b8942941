use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::info;
use warden_core::{append_text_line, write_text_atomic};
use warden_github::event_context::{EventContext, FeatureFlags, RepoRef, TriggerInputs};
use warden_github::mode::ModeRouting;
use warden_runtime::{
    prepare, GitHashObject, GithubApiClient, PrepareError, PrepareOptions, PrepareOutcome,
    TokenProvenance,
};

use crate::cli_args::{ApiArgs, PrepareArgs};

pub(crate) async fn run_prepare_command(args: PrepareArgs) -> Result<()> {
    let outcome = execute_prepare(&args)
        .await
        .map_err(|error| anyhow!(render_prepare_failure(&error)))?;
    info!(
        contains_trigger = outcome.contains_trigger,
        mode = outcome.mode,
        "prepare finished"
    );
    write_prepare_outputs(
        &outcome,
        args.output.as_deref(),
        args.github_output.as_deref(),
    )?;
    println!("{}", render_prepare_summary(&outcome));
    Ok(())
}

pub(crate) fn render_prepare_failure(error: &PrepareError) -> String {
    format!("prepare failed: {}: {error}", error.check())
}

async fn execute_prepare(args: &PrepareArgs) -> Result<PrepareOutcome, PrepareError> {
    let payload = load_event_payload(&args.event_path).map_err(configuration_error)?;
    let context = EventContext::from_webhook(
        &args.event_name,
        &payload,
        args.api.repository.as_deref(),
        trigger_inputs_from_args(args),
        FeatureFlags {
            use_commit_signing: args.use_commit_signing,
        },
    )
    .map_err(configuration_error)?;
    let options = PrepareOptions {
        routing: mode_routing_from_args(args).map_err(configuration_error)?,
        permission_policy: args.permission_policy.into(),
        token_provenance: if args.user_provided_token {
            TokenProvenance::UserProvided
        } else {
            TokenProvenance::Ambient
        },
        job_run_url: resolve_job_run_url(args, &context.repository),
    };
    let client =
        build_api_client(&args.api, context.repository.clone()).map_err(configuration_error)?;
    let fingerprinter = GitHashObject::new(args.workspace_dir.clone());
    prepare(&context, &client, &fingerprinter, &options).await
}

fn configuration_error(error: anyhow::Error) -> PrepareError {
    PrepareError::Configuration(format!("{error:#}"))
}

pub(crate) fn build_api_client(api: &ApiArgs, repo: RepoRef) -> Result<GithubApiClient> {
    GithubApiClient::new(
        api.api_base.clone(),
        api.api_token.clone(),
        repo,
        api.request_timeout_ms,
        api.retry_max_attempts,
        api.retry_base_delay_ms,
    )
}

fn load_event_payload(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read event payload {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse event payload {}", path.display()))
}

fn trigger_inputs_from_args(args: &PrepareArgs) -> TriggerInputs {
    TriggerInputs {
        trigger_phrase: args.trigger_phrase.clone(),
        phrase_match: args.phrase_match.into(),
        label_triggers: args.label_trigger.clone(),
        assignee_trigger: args.assignee_trigger.clone(),
        prompt: args.prompt.clone(),
        allowed_non_write_users: args
            .allowed_non_write_users
            .iter()
            .map(|user| user.trim().to_string())
            .filter(|user| !user.is_empty())
            .collect(),
        append_system_prompt: args.append_system_prompt.clone(),
        assistant_args: args.assistant_args.clone(),
    }
}

fn mode_routing_from_args(args: &PrepareArgs) -> Result<ModeRouting> {
    let mut routing = ModeRouting::default();
    if let Some(raw) = args.tag_event_kinds.as_deref() {
        routing.tag_event_kinds = ModeRouting::parse_event_kinds(raw)?;
    }
    if let Some(raw) = args.agent_event_kinds.as_deref() {
        routing.agent_event_kinds = ModeRouting::parse_event_kinds(raw)?;
    }
    Ok(routing)
}

fn resolve_job_run_url(args: &PrepareArgs, repo: &RepoRef) -> Option<String> {
    if let Some(url) = args.job_run_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
        return Some(url.to_string());
    }
    let server_url = args.server_url.as_deref()?.trim().trim_end_matches('/');
    let run_id = args.run_id.as_deref()?.trim();
    if server_url.is_empty() || run_id.is_empty() {
        return None;
    }
    Some(format!(
        "{server_url}/{}/{}/actions/runs/{run_id}",
        repo.owner, repo.name
    ))
}

fn write_prepare_outputs(
    outcome: &PrepareOutcome,
    output: Option<&Path>,
    github_output: Option<&Path>,
) -> Result<()> {
    if let Some(path) = output {
        let json = serde_json::to_string_pretty(outcome)
            .context("failed to serialize prepare outcome")?;
        write_text_atomic(path, &json)?;
    }
    if let Some(path) = github_output {
        for line in render_step_outputs(outcome) {
            append_text_line(path, &line)?;
        }
    }
    Ok(())
}

/// Single-line `key=value` outputs; multi-line values live only in the JSON outcome.
pub(crate) fn render_step_outputs(outcome: &PrepareOutcome) -> Vec<String> {
    let mut lines = vec![
        format!("contains_trigger={}", outcome.contains_trigger),
        format!("mode={}", outcome.mode),
    ];
    if let Some(rule) = outcome.trigger_rule {
        lines.push(format!("trigger_rule={rule}"));
    }
    if let Some(comment_id) = outcome.tracking_comment_id {
        lines.push(format!("tracking_comment_id={comment_id}"));
    }
    if outcome.contains_trigger {
        lines.push(format!("allowed_tools={}", outcome.allowed_tools.join(",")));
        lines.push(format!(
            "disallowed_tools={}",
            outcome.disallowed_tools.join(",")
        ));
    }
    lines
}

fn render_prepare_summary(outcome: &PrepareOutcome) -> String {
    match &outcome.snapshot {
        Some(snapshot) => format!(
            "prepare: mode={} trigger={} comments={} changed_files={} safe_bodies={} body_excluded={}",
            outcome.mode,
            outcome.trigger_rule.unwrap_or("none"),
            snapshot.comments.len(),
            snapshot.changed_files.len(),
            snapshot.safe_bodies.len(),
            snapshot.entity.body_excluded
        ),
        None => format!("prepare: mode={} no trigger found", outcome.mode),
    }
}
