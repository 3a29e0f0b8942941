//! Network-facing runtime for the Warden webhook bot.
//!
//! Wires the pure decision logic from `warden-github` to a GitHub- or
//! Gitea-compatible REST API: authorization, tracking comments, and
//! temporally filtered snapshot assembly.

mod file_fingerprint;
mod github_api_client;
mod permission_gate;
mod prepare;
mod repository_api;
mod retry_policy;
mod snapshot;
mod tracking_comment;

pub use file_fingerprint::{validate_relative_path, FileFingerprinter, GitHashObject};
pub use github_api_client::GithubApiClient;
pub use permission_gate::{PermissionGate, PermissionGateError, PermissionPolicy, TokenProvenance};
pub use prepare::{prepare, PrepareError, PrepareOptions, PrepareOutcome};
pub use repository_api::RepositoryApi;
pub use snapshot::{
    assemble_snapshot, ChangeType, ChangedFile, ChangedFileWithSha, EntityRecord, FilteredEntity,
    ReviewBundle, Snapshot, SnapshotError, DELETED_FILE_SHA, UNKNOWN_FILE_SHA,
};
pub use tracking_comment::{
    create_tracking_comment, render_tracking_comment_body, update_tracking_comment,
};
