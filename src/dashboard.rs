use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::github::{self, GitHubApi, GitHubError};
use crate::pipeline::{self, PipelineOptions};
use crate::report::{CommitListing, Dashboard};
use crate::session::{SessionContext, SessionError};

/// Commits listed per repository, matching GitHub's maximum page size.
pub const COMMITS_PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

impl DashboardError {
    /// Upstream hiccups worth retrying, as opposed to bad input or setup.
    pub fn is_retryable(&self) -> bool {
        match self {
            DashboardError::GitHub(GitHubError::UpstreamUnavailable { status, .. }) => {
                *status == 403 || *status == 429 || *status >= 500
            }
            DashboardError::GitHub(GitHubError::NetworkFailure(_)) => true,
            _ => false,
        }
    }
}

/// Pick the handle to load: an explicit one wins, otherwise the signed-in
/// member's.
fn resolve_handle(
    session: &SessionContext,
    handle_override: Option<&str>,
) -> Result<String, DashboardError> {
    match handle_override {
        Some(handle) => Ok(github::validate_handle(handle)?.to_string()),
        None => Ok(session.require_handle()?),
    }
}

/// Load the dashboard for one member.
///
/// Profile, pull requests and heatmap are fetched concurrently. Profile or
/// search failures fail the whole load; a missing heatmap does not.
#[instrument(skip(api, session, options))]
pub async fn load(
    api: Arc<dyn GitHubApi>,
    session: &SessionContext,
    handle_override: Option<&str>,
    options: &PipelineOptions,
) -> Result<Dashboard, DashboardError> {
    let subscription = session.subscribe();
    let identity = subscription.current();
    let handle = resolve_handle(session, handle_override)?;
    debug!(%handle, signed_in = identity.is_some(), "loading dashboard");

    let (profile, pull_requests, calendar) = tokio::join!(
        api.user_profile(&handle),
        pipeline::fetch_enriched_pull_requests(Arc::clone(&api), &handle, options),
        api.contribution_calendar(&handle),
    );

    let profile = profile?;
    let pull_requests = pull_requests?;
    let calendar = match calendar {
        Ok(calendar) => Some(calendar),
        Err(GitHubError::AuthMissing) => {
            info!("contribution heatmap needs a GitHub token; skipping");
            None
        }
        Err(err) => {
            warn!(error = %err, "contribution heatmap unavailable");
            None
        }
    };
    if subscription.has_changed() {
        warn!(%handle, "session changed while loading; dashboard reflects the identity at load start");
    }
    subscription.release();

    Ok(Dashboard {
        identity,
        handle,
        profile,
        pull_requests,
        calendar,
    })
}

/// List commits authored by `author_override` (or the signed-in member) in `repo`.
#[instrument(skip(api, session))]
pub async fn load_commits(
    api: Arc<dyn GitHubApi>,
    session: &SessionContext,
    repo: &str,
    author_override: Option<&str>,
) -> Result<CommitListing, DashboardError> {
    let repository = github::parse_repo_arg(repo)?;
    let author = resolve_handle(session, author_override)?;
    let commits = api
        .commits_by_author(&repository, &author, COMMITS_PER_PAGE)
        .await?;
    info!(repo = %repository, commits = commits.len(), "fetched commits");
    Ok(CommitListing {
        repository,
        author,
        commits,
    })
}
