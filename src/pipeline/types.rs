use chrono::{DateTime, Utc};

use crate::github::{PullRequestDetail, RepositoryCoordinates, SearchResultItem};

/// A search result combined with whatever enrichment succeeded for it.
///
/// `repository` is `None` only when the item's repository reference could
/// not be parsed. `detail` is `None` whenever the detail lookup was skipped
/// or failed; nothing is fabricated in its place.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPullRequest {
    pub item: SearchResultItem,
    pub repository: Option<RepositoryCoordinates>,
    pub detail: Option<PullRequestDetail>,
}

impl EnrichedPullRequest {
    pub fn enriched(
        item: SearchResultItem,
        repository: RepositoryCoordinates,
        detail: PullRequestDetail,
    ) -> Self {
        Self {
            item,
            repository: Some(repository),
            detail: Some(detail),
        }
    }

    /// Upstream answered with a non-success status: keep the summary and the
    /// derived repository.
    pub fn degraded(item: SearchResultItem, repository: RepositoryCoordinates) -> Self {
        Self {
            item,
            repository: Some(repository),
            detail: None,
        }
    }

    /// Nothing beyond the search result is known.
    pub fn summary_only(item: SearchResultItem) -> Self {
        Self {
            item,
            repository: None,
            detail: None,
        }
    }

    /// False unless a successful detail lookup said otherwise.
    pub fn merged(&self) -> bool {
        self.detail.as_ref().is_some_and(|d| d.merged)
    }

    pub fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.detail.as_ref().and_then(|d| d.merged_at)
    }

    pub fn additions(&self) -> Option<u64> {
        self.detail.as_ref().and_then(|d| d.additions)
    }

    pub fn deletions(&self) -> Option<u64> {
        self.detail.as_ref().and_then(|d| d.deletions)
    }

    pub fn changed_files(&self) -> Option<u64> {
        self.detail.as_ref().and_then(|d| d.changed_files)
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedPage {
    pub pull_requests: Vec<EnrichedPullRequest>,
    /// Upstream match count, passed through untouched; may exceed `pull_requests.len()`
    pub total_count: u64,
}

impl EnrichedPage {
    pub fn merged_count(&self) -> usize {
        self.pull_requests.iter().filter(|pr| pr.merged()).count()
    }
}
