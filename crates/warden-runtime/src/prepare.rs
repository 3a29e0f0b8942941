//! Prepare flow: mode selection, authorization, trigger evaluation, tracking
//! comment creation, and snapshot assembly for one webhook delivery.

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use warden_github::event_context::EventContext;
use warden_github::mode::{select_mode, ModeRouting, ModeSelectionError};
use warden_github::temporal_filter::{extract_trigger_timestamp, TimestampError};

use crate::file_fingerprint::FileFingerprinter;
use crate::permission_gate::{
    PermissionGate, PermissionGateError, PermissionPolicy, TokenProvenance,
};
use crate::repository_api::RepositoryApi;
use crate::snapshot::{assemble_snapshot, Snapshot, SnapshotError};
use crate::tracking_comment::create_tracking_comment;

#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub routing: ModeRouting,
    pub permission_policy: PermissionPolicy,
    pub token_provenance: TokenProvenance,
    pub job_run_url: Option<String>,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            routing: ModeRouting::default(),
            permission_policy: PermissionPolicy::WriteAccess,
            token_provenance: TokenProvenance::Ambient,
            job_run_url: None,
        }
    }
}

#[derive(Debug, Error)]
/// Fatal outcomes of the prepare flow. "No trigger" is not an error.
pub enum PrepareError {
    #[error("{0}")]
    Configuration(String),
    #[error("actor '{actor}' is not authorized to invoke the bot on {repository}")]
    NotAuthorized { actor: String, repository: String },
    #[error("failed to fetch {resource}: {source:#}")]
    Fetch {
        resource: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl PrepareError {
    /// Name of the failed check, reported to operators.
    pub fn check(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::NotAuthorized { .. } => "authorization",
            Self::Fetch { .. } => "fetch",
        }
    }
}

impl From<ModeSelectionError> for PrepareError {
    fn from(error: ModeSelectionError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<TimestampError> for PrepareError {
    fn from(error: TimestampError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<PermissionGateError> for PrepareError {
    fn from(error: PermissionGateError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<SnapshotError> for PrepareError {
    fn from(error: SnapshotError) -> Self {
        match error {
            SnapshotError::Fetch { resource, source } => Self::Fetch { resource, source },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Result handed to the downstream assistant invocation.
pub struct PrepareOutcome {
    pub contains_trigger: bool,
    pub mode: &'static str,
    pub trigger_rule: Option<&'static str>,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub system_prompt: Option<String>,
    pub tracking_comment_id: Option<u64>,
    pub trigger_time: Option<String>,
    pub snapshot: Option<Snapshot>,
}

impl PrepareOutcome {
    fn not_triggered(mode: &'static str) -> Self {
        Self {
            contains_trigger: false,
            mode,
            trigger_rule: None,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            system_prompt: None,
            tracking_comment_id: None,
            trigger_time: None,
            snapshot: None,
        }
    }
}

pub async fn prepare(
    context: &EventContext,
    api: &dyn RepositoryApi,
    fingerprinter: &dyn FileFingerprinter,
    options: &PrepareOptions,
) -> Result<PrepareOutcome, PrepareError> {
    let mode = select_mode(context, &options.routing)?;
    let entity = context.entity.ok_or_else(|| {
        PrepareError::Configuration(format!(
            "event '{}' carries no issue or pull request number",
            context.event_kind
        ))
    })?;
    info!(
        mode = mode.name(),
        description = mode.kind().description(),
        event = context.event_kind.as_str(),
        entity = entity.number,
        "selected mode"
    );

    let gate = PermissionGate::new(options.permission_policy);
    let authorized = gate
        .authorize(
            api,
            &context.actor,
            &context.inputs.allowed_non_write_users,
            options.token_provenance,
        )
        .await?;
    if !authorized {
        return Err(PrepareError::NotAuthorized {
            actor: context.actor.clone(),
            repository: context.repository.as_slug(),
        });
    }

    let Some(rule) = mode.trigger_rule(context) else {
        info!(mode = mode.name(), "no trigger found; skipping remaining steps");
        return Ok(PrepareOutcome::not_triggered(mode.name()));
    };
    info!(
        mode = mode.name(),
        rule = rule.as_str(),
        phrase_match = context.inputs.phrase_match.as_str(),
        "trigger matched"
    );

    let trigger_time = extract_trigger_timestamp(context)?;
    if trigger_time.is_none() {
        info!(
            event = context.event_kind.as_str(),
            "no trigger time for event; content is not time-filtered"
        );
    }

    let tracking_comment_id = if mode.creates_tracking_comment() {
        let response = create_tracking_comment(api, entity.number, options.job_run_url.as_deref())
            .await
            .map_err(|source| PrepareError::Fetch {
                resource: "tracking comment",
                source,
            })?;
        Some(response.id)
    } else {
        None
    };

    let snapshot = assemble_snapshot(
        api,
        fingerprinter,
        entity,
        trigger_time.as_ref(),
        Some(context.actor.as_str()).filter(|actor| !actor.trim().is_empty()),
    )
    .await?;

    Ok(PrepareOutcome {
        contains_trigger: true,
        mode: mode.name(),
        trigger_rule: Some(rule.as_str()),
        allowed_tools: mode.allowed_tools(context),
        disallowed_tools: mode.disallowed_tools(context),
        system_prompt: mode.system_prompt(context),
        tracking_comment_id,
        trigger_time: trigger_time.map(|time| time.as_str().to_string()),
        snapshot: Some(snapshot),
    })
}
