pub mod coordinates;
pub mod types;

pub use coordinates::derive_coordinates;
pub use types::{EnrichedPage, EnrichedPullRequest};

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, debug_span, info, instrument, warn, Instrument};

use crate::config::{PipelineConfig, DEFAULT_ENRICH_LIMIT, DEFAULT_PAGE_SIZE};
use crate::github::{validate_handle, GitHubApi, GitHubError, SearchResultItem};

/// Knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// `per_page` sent to the search endpoint
    pub page_size: u32,
    /// Only the first `enrich_limit` search results are enriched and returned
    pub enrich_limit: usize,
    /// Maximum detail requests in flight. `None` issues all of them at once.
    pub concurrency: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            enrich_limit: DEFAULT_ENRICH_LIMIT,
            concurrency: None,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            page_size: config.page_size,
            enrich_limit: config.enrich_limit,
            concurrency: config.concurrency,
        }
    }
}

/// Search for `handle`'s pull requests, then enrich the top results with
/// merge and size details.
///
/// Search failures abort the run. Enrichment failures never do: each one
/// degrades only its own item, so the output always has exactly
/// `min(enrich_limit, items returned)` entries in search order.
#[instrument(skip(api, options), fields(limit = options.enrich_limit, concurrency = ?options.concurrency))]
pub async fn fetch_enriched_pull_requests(
    api: Arc<dyn GitHubApi>,
    handle: &str,
    options: &PipelineOptions,
) -> Result<EnrichedPage, GitHubError> {
    let handle = validate_handle(handle)?;

    let page = api.search_pull_requests(handle, options.page_size).await?;
    let total_count = page.total_count;
    let mut items = page.items;
    items.truncate(options.enrich_limit);
    debug!(total_count, enriching = items.len(), "search stage complete");

    let pull_requests = enrich_all(api, items, options.concurrency).await;
    let degraded = pull_requests.iter().filter(|pr| pr.detail.is_none()).count();
    info!(
        returned = pull_requests.len(),
        degraded, total_count, "enriched pull requests"
    );

    Ok(EnrichedPage {
        pull_requests,
        total_count,
    })
}

/// Fetch details for every item concurrently and wait for all of them to
/// settle. Output order matches input order.
pub async fn enrich_all(
    api: Arc<dyn GitHubApi>,
    items: Vec<SearchResultItem>,
    concurrency: Option<usize>,
) -> Vec<EnrichedPullRequest> {
    let limiter = concurrency.map(|limit| Arc::new(Semaphore::new(limit.max(1))));

    let tasks: Vec<_> = items
        .into_iter()
        .map(|item| {
            let api = Arc::clone(&api);
            let limiter = limiter.clone();
            let fallback = item.clone();
            let span = debug_span!("enrich", id = item.id, number = item.number);
            let task = tokio::spawn(
                async move {
                    // the semaphore is never closed
                    let _permit = match limiter {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    enrich_one(api.as_ref(), item).await
                }
                .instrument(span),
            );
            (fallback, task)
        })
        .collect();

    let mut enriched = Vec::with_capacity(tasks.len());
    for (fallback, task) in tasks {
        match task.await {
            Ok(pr) => enriched.push(pr),
            Err(err) => {
                warn!(id = fallback.id, error = %err, "enrichment task failed; keeping search summary");
                enriched.push(EnrichedPullRequest::summary_only(fallback));
            }
        }
    }
    enriched
}

async fn enrich_one(api: &dyn GitHubApi, item: SearchResultItem) -> EnrichedPullRequest {
    let repository = match derive_coordinates(&item.repository_url) {
        Ok(repository) => repository,
        Err(err) => {
            debug!(error = %err, "skipping detail lookup");
            return EnrichedPullRequest::summary_only(item);
        }
    };

    match api.pull_request_detail(&repository, item.number).await {
        Ok(detail) => {
            debug!(repo = %repository, merged = detail.merged, "detail fetched");
            EnrichedPullRequest::enriched(item, repository, detail)
        }
        Err(err @ GitHubError::UpstreamUnavailable { .. }) => {
            debug!(repo = %repository, status = ?err.status(), error = %err, "detail unavailable; degrading");
            EnrichedPullRequest::degraded(item, repository)
        }
        // no usable response at all: fall back to the bare search summary
        Err(err) => {
            debug!(repo = %repository, error = %err, "detail lookup failed; keeping search summary");
            EnrichedPullRequest::summary_only(item)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::github::types::PrState;
    use crate::github::{
        CommitSummary, ContributionCalendar, PullRequestDetail, RepositoryCoordinates,
        SearchPage, UserProfile,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Helper to create a search result for PR `number` in `owner/repo`.
    pub fn test_item(number: u64, repository_url: &str) -> SearchResultItem {
        SearchResultItem {
            id: 1000 + number,
            number,
            title: format!("PR {}", number),
            state: PrState::Closed,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            repository_url: repository_url.to_string(),
            html_url: format!("https://github.com/o/r/pull/{}", number),
        }
    }

    pub fn test_detail(additions: u64) -> PullRequestDetail {
        PullRequestDetail {
            merged: true,
            merged_at: Some(Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()),
            additions: Some(additions),
            deletions: Some(1),
            changed_files: Some(2),
        }
    }

    /// In-memory GitHub with call tracking.
    ///
    /// Details are keyed by PR number; unknown numbers answer 404. A number
    /// listed in `panic_on` makes the detail call panic.
    #[derive(Default)]
    pub struct MockGitHub {
        pub search_items: Vec<SearchResultItem>,
        pub total_count: u64,
        pub search_status: Option<u16>,
        pub details: HashMap<u64, PullRequestDetail>,
        pub delays: HashMap<u64, Duration>,
        pub panic_on: Option<u64>,
        /// Detail lookups for these numbers hit a refused connection
        pub unreachable: Vec<u64>,
        /// Detail lookups for these numbers answer with an undecodable body
        pub garbled: Vec<u64>,
        pub search_calls: Mutex<Vec<u32>>,
        pub detail_calls: Mutex<Vec<(String, u64)>>,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl GitHubApi for MockGitHub {
        async fn search_pull_requests(
            &self,
            _handle: &str,
            per_page: u32,
        ) -> Result<SearchPage, GitHubError> {
            self.search_calls.lock().unwrap().push(per_page);
            if let Some(status) = self.search_status {
                return Err(GitHubError::UpstreamUnavailable {
                    status,
                    endpoint: "/search/issues".to_string(),
                });
            }
            Ok(SearchPage {
                total_count: self.total_count,
                items: self.search_items.clone(),
            })
        }

        async fn pull_request_detail(
            &self,
            repo: &RepositoryCoordinates,
            number: u64,
        ) -> Result<PullRequestDetail, GitHubError> {
            self.detail_calls
                .lock()
                .unwrap()
                .push((repo.full_name(), number));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let delay = self
                .delays
                .get(&number)
                .copied()
                .unwrap_or(Duration::from_millis(5));
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_on == Some(number) {
                panic!("detail lookup exploded");
            }
            if self.unreachable.contains(&number) {
                let err = reqwest::get("http://127.0.0.1:1/").await.unwrap_err();
                return Err(GitHubError::NetworkFailure(err));
            }
            if self.garbled.contains(&number) {
                let err = serde_json::from_str::<PullRequestDetail>("<html>").unwrap_err();
                return Err(GitHubError::Decode(err));
            }
            self.details
                .get(&number)
                .cloned()
                .ok_or_else(|| GitHubError::UpstreamUnavailable {
                    status: 404,
                    endpoint: format!("/repos/{}/pulls/{}", repo.full_name(), number),
                })
        }

        async fn user_profile(&self, handle: &str) -> Result<UserProfile, GitHubError> {
            Ok(UserProfile {
                login: handle.to_string(),
                name: None,
                bio: None,
                avatar_url: String::new(),
                html_url: String::new(),
                public_repos: 0,
                followers: 0,
                following: 0,
            })
        }

        async fn commits_by_author(
            &self,
            _repo: &RepositoryCoordinates,
            _author: &str,
            _per_page: u32,
        ) -> Result<Vec<CommitSummary>, GitHubError> {
            Ok(Vec::new())
        }

        async fn contribution_calendar(
            &self,
            _handle: &str,
        ) -> Result<ContributionCalendar, GitHubError> {
            Err(GitHubError::AuthMissing)
        }
    }

    const REPO: &str = "https://api.github.com/repos/community/roster";

    fn run(mock: MockGitHub) -> (Arc<MockGitHub>, Arc<dyn GitHubApi>) {
        let mock = Arc::new(mock);
        let api: Arc<dyn GitHubApi> = mock.clone();
        (mock, api)
    }

    #[tokio::test]
    async fn test_all_details_succeed() {
        let (mock, api) = run(MockGitHub {
            search_items: vec![test_item(1, REPO), test_item(2, REPO), test_item(3, REPO)],
            total_count: 41,
            details: HashMap::from([
                (1, test_detail(10)),
                (2, test_detail(20)),
                (3, test_detail(30)),
            ]),
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(page.total_count, 41);
        assert_eq!(page.pull_requests.len(), 3);
        assert!(page.pull_requests.iter().all(|pr| pr.merged()));
        assert_eq!(page.pull_requests[1].additions(), Some(20));
        assert_eq!(page.merged_count(), 3);
        assert_eq!(mock.detail_calls.lock().unwrap().len(), 3);
        assert_eq!(*mock.search_calls.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn test_detail_404_degrades_item() {
        let (_mock, api) = run(MockGitHub {
            search_items: vec![test_item(7, REPO)],
            total_count: 1,
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(page.pull_requests.len(), 1);
        let pr = &page.pull_requests[0];
        assert!(!pr.merged());
        assert!(pr.detail.is_none());
        assert!(pr.additions().is_none());
        assert!(pr.deletions().is_none());
        assert!(pr.changed_files().is_none());
        assert_eq!(pr.item.id, 1007);
        assert_eq!(pr.item.title, "PR 7");
        assert_eq!(pr.repository.as_ref().unwrap().full_name(), "community/roster");
    }

    #[tokio::test]
    async fn test_empty_search_issues_no_detail_calls() {
        let (mock, api) = run(MockGitHub::default());

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert!(page.pull_requests.is_empty());
        assert_eq!(page.total_count, 0);
        assert!(mock.detail_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_fatal() {
        let (mock, api) = run(MockGitHub {
            search_items: vec![test_item(1, REPO)],
            search_status: Some(403),
            ..Default::default()
        });

        let err = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GitHubError::UpstreamUnavailable { status: 403, .. }
        ));
        assert!(mock.detail_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_handle_never_searches() {
        let (mock, api) = run(MockGitHub::default());
        let err = fetch_enriched_pull_requests(api, "  ", &PipelineOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::InvalidHandle));
        assert!(mock.search_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_output_truncated_to_limit() {
        let items: Vec<_> = (1..=25).map(|n| test_item(n, REPO)).collect();
        let (mock, api) = run(MockGitHub {
            search_items: items,
            total_count: 250,
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(page.pull_requests.len(), 20);
        assert_eq!(page.total_count, 250);
        assert_eq!(mock.detail_calls.lock().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_order_preserved_with_mixed_outcomes() {
        // later items finish first; odd numbers have no detail
        let items: Vec<_> = (1..=6).map(|n| test_item(n, REPO)).collect();
        let delays = (1..=6)
            .map(|n| (n, Duration::from_millis(60 - n * 10)))
            .collect();
        let details = [2, 4, 6]
            .into_iter()
            .map(|n| (n, test_detail(n)))
            .collect();
        let (_mock, api) = run(MockGitHub {
            search_items: items.clone(),
            total_count: 6,
            details,
            delays,
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        for (input, output) in items.iter().zip(&page.pull_requests) {
            assert_eq!(input.id, output.item.id);
            assert_eq!(output.merged(), input.number % 2 == 0);
            assert!(output.repository.is_some());
        }
    }

    #[tokio::test]
    async fn test_malformed_reference_skips_lookup() {
        let (mock, api) = run(MockGitHub {
            search_items: vec![test_item(1, "roster"), test_item(2, REPO)],
            total_count: 2,
            details: HashMap::from([(1, test_detail(1)), (2, test_detail(2))]),
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(page.pull_requests.len(), 2);
        assert!(page.pull_requests[0].repository.is_none());
        assert!(!page.pull_requests[0].merged());
        assert!(page.pull_requests[1].merged());
        let calls = mock.detail_calls.lock().unwrap();
        assert_eq!(*calls, vec![("community/roster".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_panicking_lookup_keeps_summary() {
        let (_mock, api) = run(MockGitHub {
            search_items: vec![test_item(1, REPO), test_item(2, REPO)],
            total_count: 2,
            details: HashMap::from([(1, test_detail(1)), (2, test_detail(2))]),
            panic_on: Some(1),
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(page.pull_requests.len(), 2);
        let first = &page.pull_requests[0];
        assert_eq!(first.item.id, 1001);
        assert!(first.repository.is_none());
        assert!(first.detail.is_none());
        assert!(page.pull_requests[1].merged());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_bare_summary() {
        let (mock, api) = run(MockGitHub {
            search_items: vec![test_item(1, REPO), test_item(2, REPO), test_item(3, REPO)],
            total_count: 3,
            details: HashMap::from([(1, test_detail(4)), (3, test_detail(6))]),
            unreachable: vec![2],
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(mock.detail_calls.lock().unwrap().len(), 3);
        let ids: Vec<_> = page.pull_requests.iter().map(|pr| pr.item.id).collect();
        assert_eq!(ids, vec![1001, 1002, 1003]);

        let failed = &page.pull_requests[1];
        assert_eq!(failed.item.title, "PR 2");
        assert!(failed.repository.is_none());
        assert!(failed.detail.is_none());
        assert!(!failed.merged());

        assert_eq!(page.pull_requests[0].additions(), Some(4));
        assert_eq!(
            page.pull_requests[2].repository.as_ref().unwrap().full_name(),
            "community/roster"
        );
    }

    #[tokio::test]
    async fn test_undecodable_detail_keeps_bare_summary() {
        let (_mock, api) = run(MockGitHub {
            search_items: vec![test_item(1, REPO), test_item(2, REPO)],
            details: HashMap::from([(2, test_detail(2))]),
            garbled: vec![1],
            ..Default::default()
        });

        let page = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert!(page.pull_requests[0].repository.is_none());
        assert!(page.pull_requests[1].merged());
    }

    #[tokio::test]
    async fn test_unreachable_client_degrades_every_item() {
        let client = crate::github::GitHubClient::new("http://127.0.0.1:1", None, None).unwrap();
        let api: Arc<dyn GitHubApi> = Arc::new(client);
        let items = vec![test_item(7, REPO), test_item(8, REPO)];

        let enriched = enrich_all(api, items, None).await;

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].item.number, 7);
        assert!(enriched.iter().all(|pr| pr.repository.is_none()));
    }

    #[tokio::test]
    async fn test_unbounded_fan_out_fires_everything() {
        let items: Vec<_> = (1..=8).map(|n| test_item(n, REPO)).collect();
        let delays = (1..=8).map(|n| (n, Duration::from_millis(30))).collect();
        let (mock, api) = run(MockGitHub {
            search_items: items,
            delays,
            ..Default::default()
        });

        fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(mock.max_in_flight.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let items: Vec<_> = (1..=8).map(|n| test_item(n, REPO)).collect();
        let delays = (1..=8).map(|n| (n, Duration::from_millis(20))).collect();
        let (mock, api) = run(MockGitHub {
            search_items: items,
            delays,
            ..Default::default()
        });
        let options = PipelineOptions {
            concurrency: Some(2),
            ..Default::default()
        };

        let page = fetch_enriched_pull_requests(api, "ada-l", &options)
            .await
            .unwrap();

        assert_eq!(page.pull_requests.len(), 8);
        assert!(mock.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(mock.detail_calls.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_repeated_runs_refetch() {
        let (mock, api) = run(MockGitHub {
            search_items: vec![test_item(1, REPO)],
            total_count: 1,
            details: HashMap::from([(1, test_detail(1))]),
            ..Default::default()
        });

        let first = fetch_enriched_pull_requests(api.clone(), "ada-l", &PipelineOptions::default())
            .await
            .unwrap();
        let second = fetch_enriched_pull_requests(api, "ada-l", &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.search_calls.lock().unwrap().len(), 2);
        assert_eq!(mock.detail_calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_options_from_config() {
        let config = PipelineConfig {
            page_size: 50,
            enrich_limit: 5,
            concurrency: Some(3),
        };
        let options = PipelineOptions::from(&config);
        assert_eq!(options.page_size, 50);
        assert_eq!(options.enrich_limit, 5);
        assert_eq!(options.concurrency, Some(3));
    }
}
