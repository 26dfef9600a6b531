pub mod client;
pub mod fixture;
pub mod types;

pub use client::GitHubClient;
pub use fixture::FixtureApi;
pub use types::{
    CommitSummary, ContributionCalendar, PullRequestDetail, RepositoryCoordinates, SearchPage,
    SearchResultItem, UserProfile,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub returned HTTP {status} for {endpoint}")]
    UpstreamUnavailable { status: u16, endpoint: String },

    #[error("GitHub request failed: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Malformed repository reference: {0}")]
    MalformedReference(String),

    #[error("GitHub token not found; set GITHUB_TOKEN or github.token in .gitales.toml")]
    AuthMissing,

    #[error("GitHub handle must not be empty")]
    InvalidHandle,

    #[error("GitHub GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("Failed to decode GitHub payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GitHubError {
    /// HTTP status carried by an upstream rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::UpstreamUnavailable { status, .. } => Some(*status),
            GitHubError::NetworkFailure(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Every upstream call the dashboard makes.
///
/// Implementations must be Send + Sync: the enrichment stage shares one
/// instance across concurrently spawned tasks.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// One page of pull requests authored by `handle`, most recently updated first.
    async fn search_pull_requests(&self, handle: &str, per_page: u32)
        -> Result<SearchPage, GitHubError>;

    /// Merge state and size of a single pull request.
    async fn pull_request_detail(
        &self,
        repo: &RepositoryCoordinates,
        number: u64,
    ) -> Result<PullRequestDetail, GitHubError>;

    async fn user_profile(&self, handle: &str) -> Result<UserProfile, GitHubError>;

    /// Commits in `repo` authored by `author`, newest first.
    async fn commits_by_author(
        &self,
        repo: &RepositoryCoordinates,
        author: &str,
        per_page: u32,
    ) -> Result<Vec<CommitSummary>, GitHubError>;

    /// Daily contribution counts for the last year. Requires a token.
    async fn contribution_calendar(&self, handle: &str)
        -> Result<ContributionCalendar, GitHubError>;
}

/// Reject empty handles before anything goes over the wire.
pub fn validate_handle(handle: &str) -> Result<&str, GitHubError> {
    let trimmed = handle.trim();
    if trimmed.is_empty() {
        return Err(GitHubError::InvalidHandle);
    }
    Ok(trimmed)
}

/// Parse an `OWNER/REPO` argument into coordinates.
pub fn parse_repo_arg(arg: &str) -> Result<RepositoryCoordinates, GitHubError> {
    let mut parts = arg.trim().trim_matches('/').split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Ok(RepositoryCoordinates {
                owner: owner.to_string(),
                name: name.trim_end_matches(".git").to_string(),
            })
        }
        _ => Err(GitHubError::MalformedReference(arg.to_string())),
    }
}
