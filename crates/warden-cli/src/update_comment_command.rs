use anyhow::{anyhow, Context, Result};
use warden_github::event_context::RepoRef;
use warden_runtime::update_tracking_comment;

use crate::cli_args::UpdateCommentArgs;
use crate::prepare_command::build_api_client;

pub(crate) async fn run_update_comment_command(args: UpdateCommentArgs) -> Result<()> {
    let repository = args
        .api
        .repository
        .as_deref()
        .ok_or_else(|| anyhow!("--repository (or GITHUB_REPOSITORY) is required"))?;
    let repo = RepoRef::parse(repository)?;
    let body = resolve_comment_body(&args)?;
    let client = build_api_client(&args.api, repo)?;
    let response = update_tracking_comment(&client, args.comment_id, &body).await?;
    println!("updated comment {}", response.id);
    Ok(())
}

fn resolve_comment_body(args: &UpdateCommentArgs) -> Result<String> {
    match (&args.body, &args.body_file) {
        (Some(body), _) => Ok(body.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read comment body {}", path.display())),
        (None, None) => Err(anyhow!("either --body or --body-file is required")),
    }
}
