use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Open/closed state as reported by the issue search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
        }
    }
}

/// A pull request summary as returned by `GET /search/issues`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResultItem {
    pub id: u64,
    /// PR number within its repository
    pub number: u64,
    pub title: String,
    pub state: PrState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// API URL of the owning repository, e.g. `https://api.github.com/repos/{owner}/{repo}`
    pub repository_url: String,
    /// Browser URL of the pull request
    pub html_url: String,
}

/// One page of search results. `total_count` may exceed `items.len()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<SearchResultItem>,
}

/// Owner and name of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryCoordinates {
    pub owner: String,
    pub name: String,
}

impl RepositoryCoordinates {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepositoryCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Merge and size metadata from `GET /repos/{owner}/{repo}/pulls/{number}`.
///
/// Size fields stay `None` when the upstream omits them: unknown is not zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PullRequestDetail {
    #[serde(default)]
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub changed_files: Option<u64>,
}

/// Public profile from `GET /users/{handle}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
}

/// A commit flattened out of the `GET /repos/{owner}/{repo}/commits` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author_name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub html_url: String,
}

impl CommitSummary {
    /// First line of the commit message.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Everything after the first line, if there is anything.
    pub fn body(&self) -> Option<&str> {
        self.message
            .split_once('\n')
            .map(|(_, rest)| rest.trim())
            .filter(|rest| !rest.is_empty())
    }
}

#[derive(Deserialize)]
pub(crate) struct CommitResponse {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    pub commit: CommitInner,
}

#[derive(Deserialize)]
pub(crate) struct CommitInner {
    pub message: String,
    pub author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
pub(crate) struct CommitAuthor {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl From<CommitResponse> for CommitSummary {
    fn from(raw: CommitResponse) -> Self {
        let (author_name, date) = match raw.commit.author {
            Some(author) => (author.name, author.date),
            None => (None, None),
        };
        Self {
            sha: raw.sha,
            message: raw.commit.message,
            author_name,
            date,
            html_url: raw.html_url,
        }
    }
}

/// A year of daily contribution counts, grouped by week (Sunday first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributionCalendar {
    pub total_contributions: u64,
    pub weeks: Vec<Vec<ContributionDay>>,
}

impl ContributionCalendar {
    /// Day with the most contributions; the earliest wins ties.
    pub fn busiest_day(&self) -> Option<&ContributionDay> {
        self.weeks
            .iter()
            .flatten()
            .filter(|day| day.count > 0)
            .fold(None, |best: Option<&ContributionDay>, day| match best {
                Some(best) if best.count >= day.count => Some(best),
                _ => Some(day),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub count: u32,
    /// Intensity bucket, 0 (none) through 4 (top quartile)
    pub level: u8,
}
