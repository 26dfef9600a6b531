pub mod heatmap;
pub mod types;

pub use heatmap::Theme;
pub use types::{CommitListing, Dashboard};

use crate::github::types::PrState;
use crate::pipeline::EnrichedPullRequest;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Output the dashboard to terminal (default) or to a markdown file.
#[instrument(skip(dashboard, theme), fields(handle = %dashboard.handle))]
pub fn output_dashboard(
    dashboard: &Dashboard,
    output_path: Option<&Path>,
    theme: Theme,
) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing dashboard to terminal");
            print_terminal_dashboard(dashboard, theme);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing dashboard to file");
            std::fs::write(path, markdown_dashboard(dashboard))?;
            Ok(())
        }
    }
}

/// Output a commit listing to terminal (default) or to a markdown file.
#[instrument(skip(listing), fields(repo = %listing.repository))]
pub fn output_commits(
    listing: &CommitListing,
    output_path: Option<&Path>,
) -> Result<(), ReportError> {
    match output_path {
        None => {
            print_terminal_commits(listing);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing commits to file");
            std::fs::write(path, markdown_commits(listing))?;
            Ok(())
        }
    }
}

fn short_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Size line for a PR card. Only known values are shown; None when nothing is known.
fn stats_line(pr: &EnrichedPullRequest) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(files) = pr.changed_files() {
        let plural = if files == 1 { "" } else { "s" };
        parts.push(format!("{} file{} changed", files, plural));
    }
    if let Some(additions) = pr.additions() {
        parts.push(format!("+{}", additions));
    }
    if let Some(deletions) = pr.deletions() {
        parts.push(format!("-{}", deletions));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn status_label(pr: &EnrichedPullRequest) -> &'static str {
    match (pr.item.state, pr.merged()) {
        (PrState::Open, _) => "OPEN",
        (PrState::Closed, true) => "MERGED",
        (PrState::Closed, false) => "CLOSED, NOT MERGED",
    }
}

fn date_line(pr: &EnrichedPullRequest) -> String {
    match pr.merged_at() {
        Some(at) => format!("Merged: {}", short_date(at)),
        None => format!("Updated: {}", short_date(pr.item.updated_at)),
    }
}

fn repository_label(pr: &EnrichedPullRequest) -> String {
    pr.repository
        .as_ref()
        .map(|repo| repo.full_name())
        .unwrap_or_else(|| "unknown repository".to_string())
}

fn colorize_status(pr: &EnrichedPullRequest) -> colored::ColoredString {
    let label = status_label(pr);
    match (pr.item.state, pr.merged()) {
        (PrState::Open, _) => label.green().bold(),
        (PrState::Closed, true) => label.purple().bold(),
        (PrState::Closed, false) => label.red().bold(),
    }
}

/// Format and print the dashboard to the terminal with colors.
///
/// Welcome, Ada (@ada-l)
/// Batch: 2024
/// Public repos: 12 | Followers: 340 | Following: 8
///
/// ═══ Pull Requests: 57 total, showing 3, 1 merged ═══
/// [MERGED] Fix profile redirect loop after sign-in
///   community/roster | 1 file changed +9 -0 | Opened: 2024-04-20 | Merged: 2024-04-22
///   ...
fn print_terminal_dashboard(dashboard: &Dashboard, theme: Theme) {
    let profile = &dashboard.profile;
    println!();
    println!(
        "Welcome, {} ({})",
        dashboard.greeting_name().bold(),
        format!("@{}", dashboard.handle).cyan()
    );
    if let Some(batch) = dashboard
        .identity
        .as_ref()
        .and_then(|identity| identity.batch.as_deref())
    {
        println!("Batch: {}", batch);
    }
    if let Some(bio) = &profile.bio {
        println!("{}", bio.italic());
    }
    println!(
        "Public repos: {} | Followers: {} | Following: {}",
        profile.public_repos, profile.followers, profile.following
    );
    if !profile.html_url.is_empty() {
        println!("{}", profile.html_url.underline());
    }
    println!();

    let page = &dashboard.pull_requests;
    println!(
        "═══ Pull Requests: {} total, showing {}, {} merged ═══",
        page.total_count,
        page.pull_requests.len(),
        page.merged_count()
    );
    if page.pull_requests.is_empty() {
        println!("  No pull requests found.");
    }
    for pr in &page.pull_requests {
        println!("[{}] {}", colorize_status(pr), pr.item.title.bold());
        let mut details = vec![repository_label(pr)];
        if let Some(stats) = stats_line(pr) {
            details.push(stats);
        }
        details.push(format!("Opened: {}", short_date(pr.item.created_at)));
        details.push(date_line(pr));
        println!("  {}", details.join(" | "));
        println!("  {}", pr.item.html_url.dimmed());
    }
    println!();

    match &dashboard.calendar {
        Some(calendar) => {
            println!(
                "═══ Contributions: {} in the last year ═══",
                calendar.total_contributions
            );
            print!("{}", heatmap::render_terminal(calendar, theme));
            if let Some(day) = calendar.busiest_day() {
                println!("Busiest day: {} ({} contributions)", day.date, day.count);
            }
        }
        None => println!("═══ Contribution heatmap unavailable ═══"),
    }
    println!();
}

/// Render the dashboard as markdown.
fn markdown_dashboard(dashboard: &Dashboard) -> String {
    let profile = &dashboard.profile;
    let mut md = String::new();
    md.push_str(&format!(
        "# Welcome, {} (@{})\n\n",
        dashboard.greeting_name(),
        dashboard.handle
    ));
    if !profile.avatar_url.is_empty() {
        md.push_str(&format!(
            "<img src=\"{}\" alt=\"{}'s avatar\" width=\"96\">\n\n",
            profile.avatar_url, profile.login
        ));
    }
    if let Some(batch) = dashboard
        .identity
        .as_ref()
        .and_then(|identity| identity.batch.as_deref())
    {
        md.push_str(&format!("**Batch:** {}\n\n", batch));
    }
    if let Some(bio) = &profile.bio {
        md.push_str(&format!("_{}_\n\n", bio));
    }
    md.push_str(&format!(
        "**Public repos:** {} | **Followers:** {} | **Following:** {}\n\n",
        profile.public_repos, profile.followers, profile.following
    ));

    let page = &dashboard.pull_requests;
    md.push_str(&format!(
        "## Pull Requests ({} total, {} merged of {} shown)\n\n",
        page.total_count,
        page.merged_count(),
        page.pull_requests.len()
    ));
    if page.pull_requests.is_empty() {
        md.push_str("No pull requests found.\n\n");
    } else {
        for pr in &page.pull_requests {
            md.push_str(&format!(
                "- **[{}]** [{}]({}) in `{}`",
                status_label(pr),
                pr.item.title,
                pr.item.html_url,
                repository_label(pr)
            ));
            if let Some(stats) = stats_line(pr) {
                md.push_str(&format!(" | {}", stats));
            }
            md.push_str(&format!(" | {}\n", date_line(pr)));
        }
        md.push('\n');
    }

    match &dashboard.calendar {
        Some(calendar) => {
            md.push_str(&format!(
                "## Contributions ({} in the last year)\n\n",
                calendar.total_contributions
            ));
            md.push_str(&heatmap::render_markdown(calendar));
            if let Some(day) = calendar.busiest_day() {
                md.push_str(&format!(
                    "\nBusiest day: {} ({} contributions)\n",
                    day.date, day.count
                ));
            }
        }
        None => md.push_str("## Contributions\n\nHeatmap unavailable.\n"),
    }
    md
}

fn print_terminal_commits(listing: &CommitListing) {
    println!();
    println!(
        "═══ Commits by {} in {} ═══",
        listing.author.bold(),
        listing.repository.full_name().cyan()
    );
    if listing.commits.is_empty() {
        println!("  No commits found for {} in this repository.", listing.author);
    }
    for commit in &listing.commits {
        println!("• {}", commit.headline().bold());
        let when = commit.date.map(short_date).unwrap_or_default();
        let sha: String = commit.sha.chars().take(7).collect();
        match &commit.author_name {
            Some(name) => println!("  {} {} by {}", when, sha.yellow(), name),
            None => println!("  {} {}", when, sha.yellow()),
        }
        if let Some(body) = commit.body() {
            for line in body.lines() {
                println!("    {}", line.dimmed());
            }
        }
        println!("  {}", commit.html_url.dimmed());
    }
    println!();
}

fn markdown_commits(listing: &CommitListing) -> String {
    let mut md = format!(
        "# Commits by {} in [{}]({})\n\n",
        listing.author,
        listing.repository.full_name(),
        listing.repository.html_url()
    );
    if listing.commits.is_empty() {
        md.push_str(&format!(
            "No commits found for {} in this repository.\n",
            listing.author
        ));
        return md;
    }
    for commit in &listing.commits {
        let when = commit.date.map(short_date).unwrap_or_default();
        md.push_str(&format!(
            "- [{}]({}) {}\n",
            commit.headline(),
            commit.html_url,
            when
        ));
    }
    md
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::github::types::ContributionDay;
    use crate::github::{CommitSummary, ContributionCalendar, RepositoryCoordinates, UserProfile};
    use crate::pipeline::tests::{test_detail, test_item};
    use crate::pipeline::EnrichedPage;
    use crate::session::Identity;
    use chrono::{NaiveDate, TimeZone};

    fn roster() -> RepositoryCoordinates {
        RepositoryCoordinates {
            owner: "community".to_string(),
            name: "roster".to_string(),
        }
    }

    pub fn sample_dashboard() -> Dashboard {
        let repo_url = "https://api.github.com/repos/community/roster";
        let mut open = test_item(3, repo_url);
        open.state = PrState::Open;
        Dashboard {
            identity: Some(Identity {
                name: Some("Ada".to_string()),
                github_username: Some("ada-l".to_string()),
                batch: Some("2024".to_string()),
            }),
            handle: "ada-l".to_string(),
            profile: UserProfile {
                login: "ada-l".to_string(),
                name: Some("Ada Lovelace".to_string()),
                bio: Some("Notes on the analytical engine.".to_string()),
                avatar_url: String::new(),
                html_url: "https://github.com/ada-l".to_string(),
                public_repos: 12,
                followers: 340,
                following: 8,
            },
            pull_requests: EnrichedPage {
                pull_requests: vec![
                    EnrichedPullRequest::enriched(test_item(1, repo_url), roster(), test_detail(9)),
                    EnrichedPullRequest::degraded(test_item(2, repo_url), roster()),
                    EnrichedPullRequest::summary_only(open),
                ],
                total_count: 57,
            },
            calendar: Some(ContributionCalendar {
                total_contributions: 4,
                weeks: vec![vec![ContributionDay {
                    date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
                    count: 4,
                    level: 2,
                }]],
            }),
        }
    }

    fn sample_listing() -> CommitListing {
        CommitListing {
            repository: roster(),
            author: "ada-l".to_string(),
            commits: vec![CommitSummary {
                sha: "9f2c4e1a7b".to_string(),
                message: "Render heatmap levels\n\nUses the light palette.".to_string(),
                author_name: Some("Ada".to_string()),
                date: Some(Utc.with_ymd_and_hms(2024, 5, 6, 17, 30, 0).unwrap()),
                html_url: "https://github.com/community/roster/commit/9f2c4e1a7b".to_string(),
            }],
        }
    }

    #[test]
    fn test_stats_line_known_values() {
        let pr = EnrichedPullRequest::enriched(
            test_item(1, "https://api.github.com/repos/community/roster"),
            roster(),
            test_detail(9),
        );
        assert_eq!(stats_line(&pr).as_deref(), Some("2 files changed +9 -1"));
    }

    #[test]
    fn test_stats_line_keeps_zero() {
        let mut detail = test_detail(0);
        detail.changed_files = Some(1);
        detail.deletions = None;
        let pr = EnrichedPullRequest::enriched(test_item(1, "o/r"), roster(), detail);
        assert_eq!(stats_line(&pr).as_deref(), Some("1 file changed +0"));
    }

    #[test]
    fn test_degraded_card_has_no_stats() {
        let pr = EnrichedPullRequest::degraded(test_item(2, "o/r"), roster());
        assert!(stats_line(&pr).is_none());
        assert_eq!(status_label(&pr), "CLOSED, NOT MERGED");
        assert!(date_line(&pr).starts_with("Updated: 2024-01-02"));
    }

    #[test]
    fn test_merged_card_shows_merge_date() {
        let pr = EnrichedPullRequest::enriched(test_item(1, "o/r"), roster(), test_detail(1));
        assert_eq!(status_label(&pr), "MERGED");
        assert_eq!(date_line(&pr), "Merged: 2024-01-03");
    }

    #[test]
    fn test_markdown_dashboard() {
        let md = markdown_dashboard(&sample_dashboard());
        assert!(md.contains("# Welcome, Ada (@ada-l)"));
        assert!(md.contains("**Batch:** 2024"));
        assert!(md.contains("## Pull Requests (57 total, 1 merged of 3 shown)"));
        assert!(md.contains("**[MERGED]** [PR 1]"));
        assert!(md.contains("**[OPEN]** [PR 3]"));
        assert!(md.contains("in `unknown repository`"));
        assert!(md.contains("## Contributions (4 in the last year)"));
        assert!(md.contains("Busiest day: 2024-05-05 (4 contributions)"));
        assert!(!md.contains("<img"));
    }

    #[test]
    fn test_markdown_dashboard_without_heatmap() {
        let mut dashboard = sample_dashboard();
        dashboard.calendar = None;
        dashboard.pull_requests = EnrichedPage::default();
        let md = markdown_dashboard(&dashboard);
        assert!(md.contains("No pull requests found."));
        assert!(md.contains("Heatmap unavailable."));
    }

    #[test]
    fn test_output_dashboard_to_file() {
        let path = std::env::temp_dir().join("gitales_test_dashboard.md");
        output_dashboard(&sample_dashboard(), Some(&path), Theme::Light).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("**Followers:** 340"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_output_dashboard_to_terminal() {
        // Should not panic
        output_dashboard(&sample_dashboard(), None, Theme::Dark).unwrap();
    }

    #[test]
    fn test_markdown_commits() {
        let md = markdown_commits(&sample_listing());
        assert!(md.contains("# Commits by ada-l in [community/roster](https://github.com/community/roster)"));
        assert!(md.contains("- [Render heatmap levels]("));
        assert!(md.contains("2024-05-06"));
    }

    #[test]
    fn test_markdown_commits_empty() {
        let mut listing = sample_listing();
        listing.commits.clear();
        assert!(markdown_commits(&listing).contains("No commits found for ada-l"));
    }

    #[test]
    fn test_output_commits_to_terminal() {
        output_commits(&sample_listing(), None).unwrap();
    }
}
