use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::client::calendar_from_json;
use super::types::CommitResponse;
use super::{
    validate_handle, CommitSummary, ContributionCalendar, GitHubApi, GitHubError,
    PullRequestDetail, RepositoryCoordinates, SearchPage, UserProfile,
};

const SEARCH_PAGE: &str = include_str!("../../tests/fixtures/search_page.json");
const PULL_DETAILS: &str = include_str!("../../tests/fixtures/pull_details.json");
const USER: &str = include_str!("../../tests/fixtures/user.json");
const COMMITS: &str = include_str!("../../tests/fixtures/commits.json");
const CONTRIBUTIONS: &str = include_str!("../../tests/fixtures/contributions.json");

/// Canned GitHub responses for running the dashboard without a token.
///
/// Detail lookups are keyed `owner/name#number`; a missing key answers 404,
/// so the demo always shows one degraded card.
pub struct FixtureApi {
    search: SearchPage,
    details: HashMap<String, PullRequestDetail>,
    user: UserProfile,
    commits: Vec<CommitSummary>,
    calendar_body: &'static str,
}

impl FixtureApi {
    pub fn load() -> Result<Self, GitHubError> {
        let commits: Vec<CommitResponse> = serde_json::from_str(COMMITS)?;
        Ok(Self {
            search: serde_json::from_str(SEARCH_PAGE)?,
            details: serde_json::from_str(PULL_DETAILS)?,
            user: serde_json::from_str(USER)?,
            commits: commits.into_iter().map(CommitSummary::from).collect(),
            calendar_body: CONTRIBUTIONS,
        })
    }
}

#[async_trait]
impl GitHubApi for FixtureApi {
    async fn search_pull_requests(
        &self,
        handle: &str,
        per_page: u32,
    ) -> Result<SearchPage, GitHubError> {
        validate_handle(handle)?;
        let mut page = self.search.clone();
        page.items.truncate(per_page as usize);
        Ok(page)
    }

    async fn pull_request_detail(
        &self,
        repo: &RepositoryCoordinates,
        number: u64,
    ) -> Result<PullRequestDetail, GitHubError> {
        let key = format!("{}#{}", repo.full_name(), number);
        debug!(%key, "fixture detail lookup");
        self.details
            .get(&key)
            .cloned()
            .ok_or_else(|| GitHubError::UpstreamUnavailable {
                status: 404,
                endpoint: format!("/repos/{}/pulls/{}", repo.full_name(), number),
            })
    }

    async fn user_profile(&self, handle: &str) -> Result<UserProfile, GitHubError> {
        let handle = validate_handle(handle)?;
        let mut user = self.user.clone();
        user.login = handle.to_string();
        Ok(user)
    }

    async fn commits_by_author(
        &self,
        _repo: &RepositoryCoordinates,
        author: &str,
        per_page: u32,
    ) -> Result<Vec<CommitSummary>, GitHubError> {
        validate_handle(author)?;
        Ok(self
            .commits
            .iter()
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn contribution_calendar(
        &self,
        handle: &str,
    ) -> Result<ContributionCalendar, GitHubError> {
        let handle = validate_handle(handle)?;
        calendar_from_json(self.calendar_body, handle)
    }
}
