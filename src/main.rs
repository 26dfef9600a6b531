mod config;
mod dashboard;
mod github;
mod pipeline;
mod report;
mod session;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::github::GitHubApi;

/// GitTales, the story of a community member's GitHub journey: profile
/// stats, recent pull requests with merge status, commits and a
/// contribution heatmap.
#[derive(Parser, Debug)]
#[command(name = "gitales", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use built-in fixture data instead of the GitHub API (no token needed)
    #[arg(long, global = true)]
    r#mock: bool,

    /// Optional output file path for a markdown report
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the dashboard for a GitHub handle (defaults to the signed-in profile)
    Dashboard {
        /// GitHub handle, e.g. octocat
        handle: Option<String>,

        /// Number of pull requests to enrich with merge details
        #[arg(long)]
        limit: Option<usize>,

        /// Maximum concurrent detail requests (unbounded if omitted)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Render the heatmap with the dark palette
        #[arg(long)]
        dark: bool,
    },
    /// List commits by an author in one repository
    Commits {
        /// Repository as OWNER/REPO
        repo: String,

        /// Commit author handle (defaults to the signed-in profile)
        #[arg(long)]
        author: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;
    let session = session::SessionContext::new(session::Identity::from_profile(&config.profile));

    let api: Arc<dyn GitHubApi> = if cli.r#mock {
        info!("using fixture GitHub data for demo");
        Arc::new(github::FixtureApi::load()?)
    } else {
        Arc::new(github::GitHubClient::from_config(&config)?)
    };

    match cli.command {
        Command::Dashboard {
            handle,
            limit,
            concurrency,
            dark,
        } => {
            let _span = info_span!("dashboard", handle = ?handle).entered();
            let mut options = pipeline::PipelineOptions::from(&config.pipeline);
            if let Some(limit) = limit {
                options.enrich_limit = limit;
            }
            if concurrency.is_some() {
                options.concurrency = concurrency;
            }
            debug!(?options, "pipeline options");

            info!("loading dashboard");
            let loaded = dashboard::load(api, &session, handle.as_deref(), &options)
                .await
                .map_err(describe)?;
            info!(
                pull_requests = loaded.pull_requests.pull_requests.len(),
                total = loaded.pull_requests.total_count,
                "dashboard loaded"
            );

            let theme = if dark {
                report::Theme::Dark
            } else {
                report::Theme::Light
            };
            report::output_dashboard(&loaded, cli.output.as_deref(), theme)?;
        }
        Command::Commits { repo, author } => {
            let _span = info_span!("commits", repo = %repo).entered();
            info!("fetching commits");
            let listing = dashboard::load_commits(api, &session, &repo, author.as_deref())
                .await
                .map_err(describe)?;
            report::output_commits(&listing, cli.output.as_deref())?;
        }
    }

    info!("done");
    Ok(())
}

fn describe(err: dashboard::DashboardError) -> String {
    if err.is_retryable() {
        format!("{}; try again later", err)
    } else {
        err.to_string()
    }
}
