//! Behavior profiles and their selection from event shape.
//!
//! Exactly one mode is chosen per run. Selection is an exhaustive match over
//! [`ModeKind`] in precedence order; an event no mode applies to is a
//! configuration error rather than a silent default.

use anyhow::{bail, Result};
use thiserror::Error;

use crate::event_context::{EventContext, EventKind};
use crate::tool_args::{dedupe_preserving_order, parse_allowed_tools, parse_disallowed_tools};
use crate::trigger::{evaluate_trigger, TriggerRule};

const TAG_MODE_BASE_TOOLS: [&str; 9] = [
    "Edit",
    "MultiEdit",
    "Glob",
    "Grep",
    "LS",
    "Read",
    "Write",
    "mcp__github_comment__update_claude_comment",
    "mcp__gitea__get_file_content",
];
const TAG_MODE_GIT_TOOLS: [&str; 7] = [
    "Bash(git add:*)",
    "Bash(git commit:*)",
    "Bash(git push:*)",
    "Bash(git status:*)",
    "Bash(git diff:*)",
    "Bash(git log:*)",
    "Bash(git rm:*)",
];
const TAG_MODE_SIGNED_COMMIT_TOOLS: [&str; 3] = [
    "mcp__gitea__create_file",
    "mcp__gitea__update_file",
    "mcp__gitea__delete_file",
];
const USER_MCP_TOOL_PREFIX: &str = "mcp__github_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeSelectionError {
    #[error("event '{event_kind}' does not reference an issue or pull request; no mode can handle it")]
    NotAnEntityEvent { event_kind: String },
    #[error("no mode is configured to handle '{event_kind}' events")]
    NoModeForEvent { event_kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `ModeKind` values.
pub enum ModeKind {
    Tag,
    Agent,
}

impl ModeKind {
    /// Evaluation order for selection; earlier entries win.
    pub const PRECEDENCE: [ModeKind; 2] = [ModeKind::Agent, ModeKind::Tag];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Agent => "agent",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Tag => "Interactive mode triggered by mentions, labels, or assignment",
            Self::Agent => "Automation mode driven by an explicitly configured prompt",
        }
    }

    /// Pure applicability predicate for this mode.
    pub fn applies_to(self, context: &EventContext, routing: &ModeRouting) -> bool {
        if !context.is_entity_event() || !routing.accepts(self, &context.event_kind) {
            return false;
        }
        match self {
            Self::Agent => context.inputs.direct_prompt().is_some(),
            Self::Tag => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Event-kind-to-mode mapping from configuration.
pub struct ModeRouting {
    pub tag_event_kinds: Vec<EventKind>,
    pub agent_event_kinds: Vec<EventKind>,
}

impl Default for ModeRouting {
    fn default() -> Self {
        Self {
            tag_event_kinds: EventKind::ENTITY_KINDS.to_vec(),
            agent_event_kinds: EventKind::ENTITY_KINDS.to_vec(),
        }
    }
}

impl ModeRouting {
    pub fn accepted_kinds(&self, mode: ModeKind) -> &[EventKind] {
        match mode {
            ModeKind::Tag => &self.tag_event_kinds,
            ModeKind::Agent => &self.agent_event_kinds,
        }
    }

    pub fn accepts(&self, mode: ModeKind, kind: &EventKind) -> bool {
        self.accepted_kinds(mode).contains(kind)
    }

    /// Parse a comma-separated list of entity event names.
    pub fn parse_event_kinds(raw: &str) -> Result<Vec<EventKind>> {
        let mut kinds = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let kind = EventKind::parse(name);
            if !kind.is_entity_kind() {
                bail!("unsupported event kind '{name}' in mode routing");
            }
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The selected behavior profile; immutable once selected.
pub struct Mode {
    kind: ModeKind,
    accepted_kinds: Vec<EventKind>,
}

impl Mode {
    pub fn new(kind: ModeKind, routing: &ModeRouting) -> Self {
        Self {
            kind,
            accepted_kinds: routing.accepted_kinds(kind).to_vec(),
        }
    }

    pub fn kind(&self) -> ModeKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn trigger_rule(&self, context: &EventContext) -> Option<TriggerRule> {
        evaluate_trigger(context, &self.accepted_kinds)
    }

    pub fn should_trigger(&self, context: &EventContext) -> bool {
        self.trigger_rule(context).is_some()
    }

    /// Tools the downstream assistant invocation may execute.
    pub fn allowed_tools(&self, context: &EventContext) -> Vec<String> {
        let user_tools = parse_allowed_tools(&context.inputs.assistant_args);
        match self.kind {
            ModeKind::Agent => user_tools,
            ModeKind::Tag => {
                let mut tools = TAG_MODE_BASE_TOOLS
                    .iter()
                    .map(|tool| tool.to_string())
                    .collect::<Vec<_>>();
                tools.extend(
                    user_tools
                        .into_iter()
                        .filter(|tool| tool.starts_with(USER_MCP_TOOL_PREFIX)),
                );
                let extra: &[&str] = if context.flags.use_commit_signing {
                    &TAG_MODE_SIGNED_COMMIT_TOOLS
                } else {
                    &TAG_MODE_GIT_TOOLS
                };
                tools.extend(extra.iter().map(|tool| tool.to_string()));
                dedupe_preserving_order(tools)
            }
        }
    }

    pub fn disallowed_tools(&self, context: &EventContext) -> Vec<String> {
        parse_disallowed_tools(&context.inputs.assistant_args)
    }

    /// Consulted only after a trigger fired.
    pub fn system_prompt(&self, context: &EventContext) -> Option<String> {
        match self.kind {
            ModeKind::Tag => None,
            ModeKind::Agent => context
                .inputs
                .append_system_prompt
                .as_deref()
                .map(str::trim)
                .filter(|prompt| !prompt.is_empty())
                .map(ToOwned::to_owned),
        }
    }

    pub fn creates_tracking_comment(&self) -> bool {
        match self.kind {
            ModeKind::Tag => true,
            ModeKind::Agent => false,
        }
    }
}

pub fn select_mode(
    context: &EventContext,
    routing: &ModeRouting,
) -> Result<Mode, ModeSelectionError> {
    if !context.is_entity_event() {
        return Err(ModeSelectionError::NotAnEntityEvent {
            event_kind: context.event_kind.to_string(),
        });
    }
    ModeKind::PRECEDENCE
        .into_iter()
        .find(|kind| kind.applies_to(context, routing))
        .map(|kind| Mode::new(kind, routing))
        .ok_or_else(|| ModeSelectionError::NoModeForEvent {
            event_kind: context.event_kind.to_string(),
        })
}
