mod classify;
mod config;
mod github;
mod repo;
mod report;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// doc-impact — CLI tool that scans pull requests merged since a release
/// and reports which documentation needs updating.
#[derive(Parser, Debug)]
#[command(name = "doc-impact", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze merged PRs in a repository and generate a documentation update report
    Analyze {
        /// GitHub repository, as a URL or owner/name shorthand
        repo: String,

        /// Only analyze PRs merged on or after this date (YYYY-MM-DD).
        /// Defaults to the latest release date, or 30 days ago.
        #[arg(long, conflicts_with = "release_tag")]
        since: Option<String>,

        /// Analyze PRs merged since this release tag was created
        #[arg(long)]
        release_tag: Option<String>,

        /// GitHub token, overriding GITHUB_TOKEN from the environment
        #[arg(long)]
        token: Option<String>,

        /// Directory to write the report into
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Write a JSON report instead of Markdown
        #[arg(long)]
        json: bool,
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
    let Commands::Analyze {
        repo,
        since,
        release_tag,
        token,
        output_dir,
        json,
    } = cli.command;

    let _main_span = info_span!("analyze", repo = %repo).entered();

    info!("parsing repository reference");
    let repo_ref = repo::parse_repo_ref(&repo)?;
    debug!(owner = %repo_ref.owner, name = %repo_ref.name, "parsed repository reference");

    info!("loading configuration");
    let config = config::Config::load(token)?;

    let client = github::GitHubClient::new(&config)?;

    info!("resolving cutoff date");
    let cutoff = client
        .resolve_cutoff(&repo_ref, since.as_deref(), release_tag.as_deref())
        .await?;
    info!(cutoff = %cutoff, "resolved cutoff date");

    info!("fetching merged pull requests");
    let prs = client.fetch_merged_prs(&repo_ref, cutoff).await?;
    info!(count = prs.len(), "fetched pull requests");

    info!("classifying pull requests");
    let classifier = classify::OpenAiClassifier::new(&config)?;
    let entries = classify::classify_all(&classifier, &prs).await;
    let failed = entries.iter().filter(|e| e.classification.is_none()).count();
    info!(classified = entries.len() - failed, failed, "classification complete");

    info!("building report");
    let built = report::build(&repo_ref, cutoff, entries);
    let format = if json {
        report::Format::Json
    } else {
        report::Format::Markdown
    };
    let path = report::write(&built, &output_dir, format)?;

    println!(
        "{} {}",
        "Report generated:".green().bold(),
        path.display()
    );
    Ok(())
}
