use activity_core::cache::LookupCache;
use activity_core::concurrent::{all_or_first_error, run_bounded};
use activity_core::config::PAGE_SIZE;
use activity_core::dedup::dedup_by_key;
use activity_core::paginate::{paginate, Continuation, Page};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::http::{ApiClient, Response};
use crate::{Result, SourceError};

pub const DEFAULT_URL: &str = "https://slack.com/api";

/// `users.list` page size; Slack recommends at most 200.
const USERS_PAGE_SIZE: u32 = 200;

// ─── Records ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub real_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: Profile,
}

impl User {
    /// Every name the user goes by, most specific first.
    pub fn names(&self) -> Vec<&str> {
        vec![
            self.profile.display_name.as_str(),
            self.profile.real_name.as_str(),
            self.real_name.as_deref().unwrap_or(""),
            self.name.as_str(),
        ]
    }

    /// Human label: display name, then real name, then handle, then id.
    pub fn label(&self) -> &str {
        self.names()
            .into_iter()
            .find(|n| !n.is_empty())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_im: bool,
    #[serde(default)]
    pub is_mpim: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    pub channel: Channel,
}

impl Message {
    /// Unique per workspace: a `ts` is only unique within its channel.
    pub fn key(&self) -> String {
        format!("{}:{}", self.channel.id, self.ts)
    }

    /// `ts` is `seconds.micros` since the epoch.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let (secs, frac) = self.ts.split_once('.').unwrap_or((self.ts.as_str(), "0"));
        let secs: i64 = secs.parse().ok()?;
        let micros: u32 = format!("{frac:0<6}").get(..6)?.parse().ok()?;
        DateTime::from_timestamp(secs, micros * 1000)
    }
}

// ─── Wire envelopes ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct UsersList {
    #[serde(default)]
    members: Vec<User>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct Paging {
    page: u32,
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct Matches {
    #[serde(default)]
    matches: Vec<Message>,
    paging: Paging,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    messages: Matches,
}

#[derive(Debug, Deserialize)]
struct ConversationInfo {
    channel: ConversationDetail,
}

#[derive(Debug, Deserialize)]
struct ConversationDetail {
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: User,
}

/// Slack answers 200 with `"ok": false` on failure; treat that as a failed
/// attempt and decode the rest of the body otherwise.
fn slack_body<T: DeserializeOwned>(response: Response<Value>) -> Result<T> {
    let body = response.body;
    if body.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(SourceError::Api(error.to_string()));
    }
    Ok(serde_json::from_value(body)?)
}

// ─── SlackClient ──────────────────────────────────────────────────────────

pub struct SlackClient {
    api: ApiClient,
}

impl SlackClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        Ok(Self::from_api(ApiClient::new(api_url, &format!("Bearer {token}"))?))
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    async fn call<T: DeserializeOwned>(&self, context: &str, method: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.api.endpoint(method);
        self.api
            .request(context, |c| c.get(&url).query(query), slack_body::<T>)
            .await
    }

    /// Every active human in the workspace, in listing order.
    pub async fn users(&self) -> Result<Vec<User>> {
        let users = paginate(self.api.throttle(), |next| async move {
            let mut query = vec![("limit", USERS_PAGE_SIZE.to_string())];
            if let Some(cursor) = next.as_ref().and_then(Continuation::as_cursor) {
                query.push(("cursor", cursor.to_string()));
            }
            let list: UsersList = self.call("slack users.list", "users.list", &query).await?;
            let cursor = list.response_metadata.next_cursor;
            Ok::<_, SourceError>(Page::new(list.members, Continuation::cursor(true, Some(cursor.as_str()))))
        })
        .await?;
        Ok(users
            .into_iter()
            .filter(|u| !u.deleted && !u.is_bot && u.id != "USLACKBOT")
            .collect())
    }

    /// All matches for a `search.messages` query, oldest first.
    pub async fn search_messages(&self, query: &str) -> Result<Vec<Message>> {
        let context = format!("slack search '{query}'");
        let context = context.as_str();
        paginate(self.api.throttle(), |next| async move {
            let page = next.as_ref().and_then(Continuation::as_page).unwrap_or(1);
            let params = [
                ("query", query.to_string()),
                ("count", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
                ("sort", "timestamp".to_string()),
                ("sort_dir", "asc".to_string()),
            ];
            let found: SearchResponse = self.call(context, "search.messages", &params).await?;
            let paging = &found.messages.paging;
            let next = Continuation::page(paging.page, paging.pages);
            Ok(Page::new(found.messages.matches, next))
        })
        .await
    }

    /// Messages sent by `user_id` during `year`.
    ///
    /// The year is searched month by month (search results are capped per
    /// query), up to `concurrency` months at a time. Any failed month fails
    /// the whole fetch. Results are deduplicated by channel + `ts`.
    pub async fn messages_from(&self, user_id: &str, year: i32, concurrency: usize) -> Result<Vec<Message>> {
        let queries = month_queries(user_id, year)?;
        let results = run_bounded(queries, concurrency, |q| async move { self.search_messages(&q).await }).await;
        let months = all_or_first_error(results)?;
        let messages = dedup_by_key(months.into_iter().flatten(), Message::key);
        tracing::info!(user_id, count = messages.len(), "fetched messages");
        Ok(messages)
    }

    /// The other participant of a direct-message channel.
    pub async fn dm_counterpart(&self, channel_id: &str) -> Result<User> {
        let info: ConversationInfo = self
            .call(
                &format!("slack conversations.info {channel_id}"),
                "conversations.info",
                &[("channel", channel_id.to_string())],
            )
            .await?;
        let user_id = info
            .channel
            .user
            .ok_or_else(|| SourceError::NotFound(format!("no counterpart for {channel_id}")))?;
        let info: UserInfo = self
            .call(
                &format!("slack users.info {user_id}"),
                "users.info",
                &[("user", user_id.clone())],
            )
            .await?;
        Ok(info.user)
    }
}

/// `from:<@ID> after:… before:…` for each month of `year`. Slack's
/// `after`/`before` are exclusive, so each window is bounded by the day
/// before the month and the first day of the next month.
pub fn month_queries(user_id: &str, year: i32) -> Result<Vec<String>> {
    (1..=12)
        .map(|month| -> Result<String> {
            let first = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or(activity_core::CoreError::InvalidYear(year))?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)
            }
            .ok_or(activity_core::CoreError::InvalidYear(year))?;
            let before_first = first - Duration::days(1);
            Ok(format!(
                "from:<@{user_id}> after:{} before:{}",
                before_first.format("%Y-%m-%d"),
                next.format("%Y-%m-%d")
            ))
        })
        .collect()
}

// ─── ChannelLabels ────────────────────────────────────────────────────────

/// Section labels for channels, with DM counterparts looked up once per
/// channel and shared across concurrent tasks.
pub struct ChannelLabels<'a> {
    client: &'a SlackClient,
    dm_names: LookupCache<String, String>,
}

impl<'a> ChannelLabels<'a> {
    pub fn new(client: &'a SlackClient) -> Self {
        Self {
            client,
            dm_names: LookupCache::new(),
        }
    }

    /// `#name` for channels, `DM: name` for direct messages, `Group DM` for
    /// multi-person DMs.
    ///
    /// A failed DM lookup falls back to the raw id the search result
    /// carries; it never fails the run.
    pub async fn label(&self, channel: &Channel) -> String {
        if channel.is_mpim {
            return "Group DM".to_string();
        }
        if !channel.is_im {
            let name = if channel.name.is_empty() { &channel.id } else { &channel.name };
            return format!("#{name}");
        }
        let name = self
            .dm_names
            .get_or_compute(channel.id.clone(), || async move {
                match self.client.dm_counterpart(&channel.id).await {
                    Ok(user) => user.label().to_string(),
                    Err(e) => {
                        let fallback = if channel.name.is_empty() { &channel.id } else { &channel.name };
                        tracing::warn!(channel = %channel.id, error = %e, "DM lookup failed, using raw id");
                        fallback.clone()
                    }
                }
            })
            .await;
        format!("DM: {name}")
    }

    /// Labels for `channels` (input order), DM lookups `concurrency` at a time.
    pub async fn label_all(&self, channels: Vec<Channel>, concurrency: usize) -> Vec<String> {
        run_bounded(channels, concurrency, |channel| async move { self.label(&channel).await }).await
    }

    pub fn resolved_dms(&self) -> usize {
        self.dm_names.len()
    }
}
