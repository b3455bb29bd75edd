use std::path::PathBuf;

use activity_core::identity;
use activity_core::report::{Report, ReportItem};
use activity_sources::slack::{self, ChannelLabels, Message, SlackClient, User};
use chrono::NaiveDate;
use clap::Parser;

use super::{save, today, CommonArgs};

pub const KIND: &str = "slack";
pub const MESSAGES: &str = "Messages";

/// Weekly report of the messages a workspace member sent.
#[derive(Debug, Parser)]
#[command(name = "slack-activity", version)]
pub struct Args {
    /// Slack user token with `search:read`, `users:read` and
    /// `im:read` scopes
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Web API base URL
    #[arg(long, env = "SLACK_API_URL", default_value = slack::DEFAULT_URL)]
    pub api_url: String,

    /// Name, real name or display name (or part of one) of the member
    #[arg(long, env = "SLACK_USER")]
    pub user: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn run(args: Args) -> anyhow::Result<PathBuf> {
    let year = args.common.year();
    let concurrency = args.common.concurrency();
    let client = SlackClient::new(&args.api_url, &args.token)?;

    let users = client.users().await?;
    let resolved = identity::resolve(&args.user, &users, User::names)?;
    let user = resolved.user;
    tracing::info!(
        user = user.label(),
        id = %user.id,
        exact = resolved.exact,
        year,
        "building Slack report"
    );

    let messages = client.messages_from(&user.id, year, concurrency).await?;
    let labels = ChannelLabels::new(&client);
    let channels = messages.iter().map(|m| m.channel.clone()).collect();
    let sections = labels.label_all(channels, concurrency).await;
    tracing::debug!(dms = labels.resolved_dms(), "labelled channels");

    let report = build_report(user.label(), year, today(), messages.iter().zip(sections));
    save(&report, KIND, &[user.name.as_str(), user.id.as_str()], &args.common.output_dir)
}

/// `messages` pairs each message with its channel section label.
pub fn build_report<'a>(
    user: &str,
    year: i32,
    generated: NaiveDate,
    messages: impl IntoIterator<Item = (&'a Message, String)>,
) -> Report {
    let mut report = Report::new("Slack Activity", "User", user, year, generated).category(MESSAGES);
    for (message, section) in messages {
        let Some(at) = message.timestamp() else {
            tracing::warn!(ts = %message.ts, channel = %message.channel.id, "unparseable timestamp, skipped");
            continue;
        };
        let item = ReportItem::new(MESSAGES, at.format("%H:%M").to_string(), at)
            .section(section)
            .body(Some(message.text.as_str()));
        report.push(match &message.permalink {
            Some(link) => item.url(link),
            None => item,
        });
    }
    report
}
