use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::types::{CommitResponse, ContributionDay};
use super::{
    validate_handle, CommitSummary, ContributionCalendar, GitHubApi, GitHubError,
    PullRequestDetail, RepositoryCoordinates, SearchPage, UserProfile,
};
use crate::config::Config;

const USER_AGENT: &str = "gitales";
const ACCEPT: &str = "application/vnd.github+json";

const CONTRIBUTIONS_QUERY: &str = r#"query($login: String!) {
  user(login: $login) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks { contributionDays { date contributionCount contributionLevel } }
      }
    }
  }
}"#;

/// REST + GraphQL client for api.github.com (or a compatible base URL).
pub struct GitHubClient {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GitHubError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if token.is_none() {
            warn!("no GitHub token configured; using anonymous requests with lower rate limits");
        }
        Ok(Self {
            http: builder.build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GitHubError> {
        Self::new(
            config.api_base(),
            config.github_token(),
            config.request_timeout(),
        )
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("Accept", ACCEPT);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(self.http.get(format!("{}{}", self.api_base, path)))
    }

    /// Send, map non-2xx to `UpstreamUnavailable`, and decode the body.
    /// A body that does not match `T` is a `Decode` error, not a network one.
    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<T, GitHubError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%endpoint, status = status.as_u16(), "upstream rejected request");
            return Err(GitHubError::UpstreamUnavailable {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct ContributionsData {
    user: Option<ContributionsUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsUser {
    contributions_collection: ContributionsCollection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: RawCalendar,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCalendar {
    total_contributions: u64,
    weeks: Vec<RawWeek>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWeek {
    contribution_days: Vec<RawDay>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDay {
    date: chrono::NaiveDate,
    contribution_count: u32,
    contribution_level: String,
}

fn contribution_level(level: &str) -> u8 {
    match level {
        "FIRST_QUARTILE" => 1,
        "SECOND_QUARTILE" => 2,
        "THIRD_QUARTILE" => 3,
        "FOURTH_QUARTILE" => 4,
        _ => 0,
    }
}

impl From<RawCalendar> for ContributionCalendar {
    fn from(raw: RawCalendar) -> Self {
        Self {
            total_contributions: raw.total_contributions,
            weeks: raw
                .weeks
                .into_iter()
                .map(|week| {
                    week.contribution_days
                        .into_iter()
                        .map(|day| ContributionDay {
                            date: day.date,
                            count: day.contribution_count,
                            level: contribution_level(&day.contribution_level),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

fn decode_calendar(
    response: GraphQlResponse<ContributionsData>,
    handle: &str,
) -> Result<ContributionCalendar, GitHubError> {
    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(GitHubError::GraphQl(messages.join("; ")));
    }

    let user = response
        .data
        .and_then(|data| data.user)
        .ok_or_else(|| GitHubError::GraphQl(format!("no such user: {}", handle)))?;
    Ok(user.contributions_collection.contribution_calendar.into())
}

/// Decode a raw contributions GraphQL body (used by the fixture backend).
pub(crate) fn calendar_from_json(
    body: &str,
    handle: &str,
) -> Result<ContributionCalendar, GitHubError> {
    let response: GraphQlResponse<ContributionsData> = serde_json::from_str(body)?;
    decode_calendar(response, handle)
}

#[async_trait]
impl GitHubApi for GitHubClient {
    #[instrument(skip(self))]
    async fn search_pull_requests(
        &self,
        handle: &str,
        per_page: u32,
    ) -> Result<SearchPage, GitHubError> {
        let handle = validate_handle(handle)?;
        let query = format!("author:{} type:pr", handle);
        let per_page = per_page.to_string();
        let builder = self.get("/search/issues").query(&[
            ("q", query.as_str()),
            ("sort", "updated"),
            ("order", "desc"),
            ("per_page", per_page.as_str()),
        ]);
        let page: SearchPage = self.send_json("/search/issues", builder).await?;
        debug!(total = page.total_count, returned = page.items.len(), "search complete");
        Ok(page)
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn pull_request_detail(
        &self,
        repo: &RepositoryCoordinates,
        number: u64,
    ) -> Result<PullRequestDetail, GitHubError> {
        let path = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.name, number);
        self.send_json(&path, self.get(&path)).await
    }

    #[instrument(skip(self))]
    async fn user_profile(&self, handle: &str) -> Result<UserProfile, GitHubError> {
        let handle = validate_handle(handle)?;
        let path = format!("/users/{}", handle);
        self.send_json(&path, self.get(&path)).await
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn commits_by_author(
        &self,
        repo: &RepositoryCoordinates,
        author: &str,
        per_page: u32,
    ) -> Result<Vec<CommitSummary>, GitHubError> {
        let author = validate_handle(author)?;
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        let per_page = per_page.to_string();
        let builder = self
            .get(&path)
            .query(&[("author", author), ("per_page", per_page.as_str())]);
        let raw: Vec<CommitResponse> = self.send_json(&path, builder).await?;
        debug!(commits = raw.len(), "fetched commits");
        Ok(raw.into_iter().map(CommitSummary::from).collect())
    }

    #[instrument(skip(self))]
    async fn contribution_calendar(
        &self,
        handle: &str,
    ) -> Result<ContributionCalendar, GitHubError> {
        let handle = validate_handle(handle)?;
        if self.token.is_none() {
            return Err(GitHubError::AuthMissing);
        }
        let body = serde_json::json!({
            "query": CONTRIBUTIONS_QUERY,
            "variables": { "login": handle },
        });
        let builder = self
            .request(self.http.post(format!("{}/graphql", self.api_base)))
            .json(&body);
        let response: GraphQlResponse<ContributionsData> =
            self.send_json("/graphql", builder).await?;
        decode_calendar(response, handle)
    }
}
