use std::path::PathBuf;

use activity_core::concurrent::{all_or_first_error, run_bounded};
use activity_core::dedup::dedup_by_key;
use activity_core::report::{Report, ReportItem};
use activity_sources::github::{self, GithubClient, PullRequest};
use activity_sources::SourceError;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;

use super::{save, today, CommonArgs};

pub const KIND: &str = "github";
pub const OPENED: &str = "Pull requests opened";
pub const MERGED: &str = "Pull requests merged";

/// Weekly report of the pull requests a person opened and merged in a
/// GitHub organization, found through the emails they commit with.
#[derive(Debug, Parser)]
#[command(name = "github-activity", version)]
pub struct Args {
    /// GitHub token with read access to the organization
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = github::DEFAULT_URL)]
    pub api_url: String,

    /// Organization to search
    #[arg(long, env = "GITHUB_ORG")]
    pub org: String,

    /// Comma-separated commit author emails
    #[arg(long, env = "GITHUB_EMAILS", value_parser = parse_emails)]
    pub emails: Emails,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Trimmed, non-empty email list.
#[derive(Debug, Clone, PartialEq)]
pub struct Emails(pub Vec<String>);

fn parse_emails(raw: &str) -> Result<Emails, String> {
    let emails: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect();
    if emails.is_empty() {
        return Err("expected at least one email".into());
    }
    Ok(Emails(emails))
}

#[derive(Debug, Clone, Copy)]
enum Search {
    Opened,
    Merged,
}

pub async fn run(args: Args) -> anyhow::Result<PathBuf> {
    let year = args.common.year();
    let concurrency = args.common.concurrency();
    let client = GithubClient::new(&args.api_url, &args.token)?;

    let logins = client
        .discover_logins(&args.org, &args.emails.0, year, concurrency)
        .await?;
    tracing::info!(org = %args.org, logins = ?logins, year, "building GitHub report");

    let client = &client;
    let org = args.org.as_str();
    let searches: Vec<(Search, &str)> = logins
        .iter()
        .flat_map(|login| [(Search::Opened, login.as_str()), (Search::Merged, login.as_str())])
        .collect();
    let results = run_bounded(searches, concurrency, |(search, login)| async move {
        let prs = match search {
            Search::Opened => client.pull_requests_opened(org, login, year).await?,
            Search::Merged => client.pull_requests_merged(org, login, year).await?,
        };
        Ok::<_, SourceError>((search, prs))
    })
    .await;

    let (mut opened, mut merged) = (Vec::new(), Vec::new());
    for (search, prs) in all_or_first_error(results)? {
        match search {
            Search::Opened => opened.extend(prs),
            Search::Merged => merged.extend(prs),
        }
    }

    let report = build_report(org, year, today(), opened, merged);
    save(&report, KIND, &[org], &args.common.output_dir)
}

/// Pull requests found by several logins' searches appear once per category.
pub fn build_report(
    org: &str,
    year: i32,
    generated: NaiveDate,
    opened: Vec<PullRequest>,
    merged: Vec<PullRequest>,
) -> Report {
    let mut report = Report::new("GitHub Activity", "Organization", org, year, generated)
        .category(OPENED)
        .category(MERGED);

    report.extend(
        dedup_by_key(opened, |pr| pr.id)
            .iter()
            .map(|pr| pr_item(OPENED, pr, pr.created_at)),
    );
    report.extend(
        dedup_by_key(merged, |pr| pr.id)
            .iter()
            .filter_map(|pr| pr.merged_at().map(|at| pr_item(MERGED, pr, at))),
    );
    report
}

fn pr_item(category: &str, pr: &PullRequest, at: DateTime<Utc>) -> ReportItem {
    let repo = pr.repo();
    ReportItem::new(category, format!("{repo}#{}", pr.number), at)
        .section(repo)
        .url(&pr.html_url)
        .title(&pr.title)
        .meta(pr.status())
        .body(pr.body.as_deref())
}
