use std::path::PathBuf;

use activity_core::concurrent::{all_or_first_error, run_bounded};
use activity_core::dedup::dedup_by_key;
use activity_core::report::{Report, ReportItem};
use activity_sources::linear::{self, Comment, Issue, LinearClient, Viewer};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;

use super::{save, today, CommonArgs};

pub const KIND: &str = "linear";
pub const CREATED: &str = "Issues created";
pub const COMPLETED: &str = "Issues completed";
pub const COMMENTS: &str = "Comments";

/// Weekly report of the Linear issues and comments of the API key's owner.
#[derive(Debug, Parser)]
#[command(name = "linear-activity", version)]
pub struct Args {
    /// Linear personal API key
    #[arg(long, env = "LINEAR_API_KEY", hide_env_values = true)]
    pub token: String,

    /// GraphQL endpoint
    #[arg(long, env = "LINEAR_API_URL", default_value = linear::DEFAULT_URL)]
    pub api_url: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Clone, Copy)]
enum Fetch {
    Created,
    Completed,
    Comments,
}

enum Fetched {
    Created(Vec<Issue>),
    Completed(Vec<Issue>),
    Comments(Vec<Comment>),
}

pub async fn run(args: Args) -> anyhow::Result<PathBuf> {
    let year = args.common.year();
    let client = LinearClient::new(&args.api_url, &args.token)?;
    let viewer = client.viewer().await.context("resolving the API key's user")?;
    tracing::info!(user = %viewer.name, year, "building Linear report");

    let client = &client;
    let user_id = viewer.id.as_str();
    let fetches = vec![Fetch::Created, Fetch::Completed, Fetch::Comments];
    let results = run_bounded(fetches, args.common.concurrency(), |fetch| async move {
        match fetch {
            Fetch::Created => client.issues_created(user_id, year).await.map(Fetched::Created),
            Fetch::Completed => client.issues_completed(user_id, year).await.map(Fetched::Completed),
            Fetch::Comments => client.comments(user_id, year).await.map(Fetched::Comments),
        }
    })
    .await;

    let (mut created, mut completed, mut comments) = (Vec::new(), Vec::new(), Vec::new());
    for fetched in all_or_first_error(results)? {
        match fetched {
            Fetched::Created(v) => created = v,
            Fetched::Completed(v) => completed = v,
            Fetched::Comments(v) => comments = v,
        }
    }

    let report = build_report(&viewer.name, year, today(), created, completed, comments);
    save(&report, KIND, &file_identities(&viewer), &args.common.output_dir)
}

/// Filename candidates: the name, then the email's local part, then the id.
fn file_identities(viewer: &Viewer) -> Vec<&str> {
    let local_part = viewer
        .email
        .as_deref()
        .and_then(|email| email.split('@').next());
    std::iter::once(viewer.name.as_str())
        .chain(local_part)
        .chain(std::iter::once(viewer.id.as_str()))
        .collect()
}

pub fn build_report(
    user: &str,
    year: i32,
    generated: NaiveDate,
    created: Vec<Issue>,
    completed: Vec<Issue>,
    comments: Vec<Comment>,
) -> Report {
    let mut report = Report::new("Linear Activity", "User", user, year, generated)
        .category(CREATED)
        .category(COMPLETED)
        .category(COMMENTS);

    report.extend(
        dedup_by_key(created, |i| i.id.clone())
            .iter()
            .map(|i| issue_item(CREATED, i, i.created_at)),
    );
    report.extend(
        dedup_by_key(completed, |i| i.id.clone())
            .iter()
            .filter_map(|i| i.completed_at.map(|at| issue_item(COMPLETED, i, at))),
    );
    report.extend(dedup_by_key(comments, |c| c.id.clone()).iter().map(comment_item));
    report
}

fn issue_item(category: &str, issue: &Issue, at: DateTime<Utc>) -> ReportItem {
    let item = ReportItem::new(category, &issue.identifier, at)
        .url(&issue.url)
        .title(&issue.title)
        .meta(issue.state_name().unwrap_or_default())
        .body(issue.description.as_deref());
    match issue.team_name() {
        Some(team) => item.section(team),
        None => item,
    }
}

fn comment_item(comment: &Comment) -> ReportItem {
    let Some(issue) = &comment.issue else {
        return ReportItem::new(COMMENTS, "comment", comment.created_at)
            .url(&comment.url)
            .body(Some(comment.body.as_str()));
    };
    let item = ReportItem::new(COMMENTS, &issue.identifier, comment.created_at)
        .url(&comment.url)
        .title(&issue.title)
        .body(Some(comment.body.as_str()));
    match issue.team.as_ref() {
        Some(team) => item.section(&team.name),
        None => item,
    }
}
