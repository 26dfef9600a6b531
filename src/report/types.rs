use crate::github::{CommitSummary, ContributionCalendar, RepositoryCoordinates, UserProfile};
use crate::pipeline::EnrichedPage;
use crate::session::Identity;

/// Everything shown on the member dashboard.
#[derive(Debug)]
pub struct Dashboard {
    /// Signed-in member, if any
    pub identity: Option<Identity>,
    /// GitHub handle the dashboard was built for
    pub handle: String,
    /// Public GitHub profile stats
    pub profile: UserProfile,
    /// Top pull requests plus the upstream total
    pub pull_requests: EnrichedPage,
    /// Contribution heatmap; absent without a token or when the lookup failed
    pub calendar: Option<ContributionCalendar>,
}

impl Dashboard {
    /// Greeting name: profile name, then GitHub name, then handle.
    pub fn greeting_name(&self) -> &str {
        self.identity
            .as_ref()
            .and_then(|identity| identity.name.as_deref())
            .or(self.profile.name.as_deref())
            .unwrap_or(&self.handle)
    }
}

/// Commits by one author in one repository.
#[derive(Debug)]
pub struct CommitListing {
    pub repository: RepositoryCoordinates,
    pub author: String,
    pub commits: Vec<CommitSummary>,
}
