use thiserror::Error;
use tracing::{info, warn};
use warden_github::issue_filter::normalize_login;

use crate::repository_api::RepositoryApi;

const WRITE_PERMISSION_LEVELS: [&str; 4] = ["owner", "admin", "maintain", "write"];
const ALLOWLIST_WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `PermissionPolicy` values.
pub enum PermissionPolicy {
    /// Single-tenant deployment: every actor is allowed.
    Trusted,
    /// Actors need write access to the repository unless allowlisted.
    WriteAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where the API token came from. The non-write allowlist is honored only
/// for explicitly user-provided tokens.
pub enum TokenProvenance {
    UserProvided,
    Ambient,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionGateError {
    #[error("actor identity is missing; repository permissions cannot be evaluated")]
    MissingActor,
}

#[derive(Debug, Clone, Copy)]
pub struct PermissionGate {
    policy: PermissionPolicy,
}

impl PermissionGate {
    pub fn new(policy: PermissionPolicy) -> Self {
        Self { policy }
    }

    /// Returns `Ok(false)` when access cannot be established, and an error only
    /// when the check itself is meaningless.
    pub async fn authorize(
        &self,
        api: &dyn RepositoryApi,
        actor: &str,
        allowlist: &[String],
        provenance: TokenProvenance,
    ) -> Result<bool, PermissionGateError> {
        let actor = actor.trim();
        if self.policy == PermissionPolicy::Trusted {
            info!(actor, "trusted deployment; skipping repository permission check");
            return Ok(true);
        }
        if actor.is_empty() {
            return Err(PermissionGateError::MissingActor);
        }

        if !allowlist.is_empty() {
            match provenance {
                TokenProvenance::UserProvided if actor_is_allowlisted(actor, allowlist) => {
                    warn!(
                        actor,
                        reason = "allowlist",
                        "actor allowed without write permission via allowed non-write users"
                    );
                    return Ok(true);
                }
                TokenProvenance::UserProvided => {}
                TokenProvenance::Ambient => {
                    warn!(
                        actor,
                        "allowed non-write users require an explicitly provided token; ignoring allowlist"
                    );
                }
            }
        }

        match api.fetch_collaborator_permission(actor).await {
            Ok(permission) => {
                let permission = permission.trim().to_ascii_lowercase();
                let allowed = WRITE_PERMISSION_LEVELS.contains(&permission.as_str());
                info!(actor, permission = permission.as_str(), allowed, "evaluated repository permission");
                Ok(allowed)
            }
            Err(error) => {
                warn!(
                    actor,
                    reason = "fetch_failure",
                    error = %error,
                    "failed to determine repository permission; denying"
                );
                Ok(false)
            }
        }
    }
}

fn actor_is_allowlisted(actor: &str, allowlist: &[String]) -> bool {
    let actor = normalize_login(actor);
    allowlist.iter().any(|entry| {
        let entry = entry.trim();
        entry == ALLOWLIST_WILDCARD || normalize_login(entry) == actor
    })
}
