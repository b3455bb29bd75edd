use activity_core::config::PAGE_SIZE;
use activity_core::paginate::{paginate, Continuation, Page};
use activity_core::week::year_bounds;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::{ApiClient, Response};
use crate::{Result, SourceError};

pub const DEFAULT_URL: &str = "https://api.linear.app/graphql";

// ─── GraphQL documents ────────────────────────────────────────────────────

const VIEWER_QUERY: &str = "query Viewer { viewer { id name displayName email } }";

const ISSUES_QUERY: &str = r#"
query Issues($filter: IssueFilter, $first: Int, $after: String) {
  issues(filter: $filter, first: $first, after: $after) {
    nodes {
      id identifier title url description createdAt completedAt
      state { name }
      team { name }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

const COMMENTS_QUERY: &str = r#"
query Comments($filter: CommentFilter, $first: Int, $after: String) {
  comments(filter: $filter, first: $first, after: $after) {
    nodes {
      id body url createdAt
      issue { identifier title team { name } }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

// ─── Records ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: Option<Named>,
    #[serde(default)]
    pub team: Option<Named>,
}

impl Issue {
    pub fn state_name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.name.as_str())
    }

    pub fn team_name(&self) -> Option<&str> {
        self.team.as_ref().map(|t| t.name.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentIssue {
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub team: Option<Named>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub body: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub issue: Option<CommentIssue>,
}

// ─── Wire envelopes ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    nodes: Vec<T>,
    page_info: PageInfo,
}

impl<T> Connection<T> {
    fn into_page(self) -> Page<T> {
        let next = Continuation::cursor(self.page_info.has_next_page, self.page_info.end_cursor.as_deref());
        Page::new(self.nodes, next)
    }
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: Connection<Issue>,
}

#[derive(Debug, Deserialize)]
struct CommentsData {
    comments: Connection<Comment>,
}

/// Unwrap `data`, treating a non-empty `errors` array as a failed attempt.
fn graphql_data<T>(response: Response<GraphqlResponse<T>>) -> Result<T> {
    let GraphqlResponse { data, errors } = response.body;
    if !errors.is_empty() {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(SourceError::Api(messages.join("; ")));
    }
    data.ok_or_else(|| SourceError::Api("GraphQL response has no data".into()))
}

// ─── LinearClient ─────────────────────────────────────────────────────────

pub struct LinearClient {
    api: ApiClient,
}

impl LinearClient {
    /// Linear personal API keys go in `Authorization` as-is, without `Bearer`.
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self::from_api(ApiClient::new(api_url, api_key)?))
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    async fn query<T>(&self, context: &str, document: &str, variables: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = json!({ "query": document, "variables": variables });
        let url = self.api.endpoint("");
        self.api
            .request(context, |c| c.post(&url).json(&body), graphql_data::<T>)
            .await
    }

    /// The user the API key belongs to.
    pub async fn viewer(&self) -> Result<Viewer> {
        let data: ViewerData = self.query("linear viewer", VIEWER_QUERY, json!({})).await?;
        Ok(data.viewer)
    }

    /// Issues created by `user_id` during `year`.
    pub async fn issues_created(&self, user_id: &str, year: i32) -> Result<Vec<Issue>> {
        let (from, to) = year_bounds(year)?;
        let filter = json!({
            "creator": { "id": { "eq": user_id } },
            "createdAt": { "gte": from.to_rfc3339(), "lt": to.to_rfc3339() },
        });
        self.issues("linear issues created", filter).await
    }

    /// Issues assigned to `user_id` and completed during `year`.
    pub async fn issues_completed(&self, user_id: &str, year: i32) -> Result<Vec<Issue>> {
        let (from, to) = year_bounds(year)?;
        let filter = json!({
            "assignee": { "id": { "eq": user_id } },
            "completedAt": { "gte": from.to_rfc3339(), "lt": to.to_rfc3339() },
        });
        self.issues("linear issues completed", filter).await
    }

    /// Comments written by `user_id` during `year`.
    pub async fn comments(&self, user_id: &str, year: i32) -> Result<Vec<Comment>> {
        let (from, to) = year_bounds(year)?;
        let filter = json!({
            "user": { "id": { "eq": user_id } },
            "createdAt": { "gte": from.to_rfc3339(), "lt": to.to_rfc3339() },
        });
        paginate(self.api.throttle(), |next| {
            let variables = page_variables(&filter, next);
            async move {
                let data: CommentsData = self.query("linear comments", COMMENTS_QUERY, variables).await?;
                Ok(data.comments.into_page())
            }
        })
        .await
    }

    async fn issues(&self, context: &str, filter: Value) -> Result<Vec<Issue>> {
        let issues = paginate(self.api.throttle(), |next| {
            let variables = page_variables(&filter, next);
            async move {
                let data: IssuesData = self.query(context, ISSUES_QUERY, variables).await?;
                Ok::<_, SourceError>(data.issues.into_page())
            }
        })
        .await?;
        tracing::info!(context, count = issues.len(), "fetched");
        Ok(issues)
    }
}

fn page_variables(filter: &Value, next: Option<Continuation>) -> Value {
    json!({
        "filter": filter,
        "first": PAGE_SIZE,
        "after": next.as_ref().and_then(Continuation::as_cursor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn response<T>(body: GraphqlResponse<T>) -> Response<GraphqlResponse<T>> {
        Response {
            body,
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn errors_array_is_an_api_error() {
        let body: GraphqlResponse<ViewerData> = serde_json::from_str(
            r#"{"data": null, "errors": [{"message": "Authentication required"}, {"message": "x"}]}"#,
        )
        .unwrap();
        let err = graphql_data(response(body)).unwrap_err();
        assert!(matches!(err, SourceError::Api(m) if m == "Authentication required; x"));
    }

    #[test]
    fn missing_data_is_an_api_error() {
        let body: GraphqlResponse<ViewerData> = serde_json::from_str(r#"{}"#).unwrap();
        assert!(graphql_data(response(body)).is_err());
    }

    #[test]
    fn parses_issue_page() {
        let body: GraphqlResponse<IssuesData> = serde_json::from_str(
            r#"{"data": {"issues": {
                "nodes": [{
                    "id": "i1", "identifier": "ENG-1", "title": "Fix login",
                    "url": "https://linear.app/acme/issue/ENG-1",
                    "description": null,
                    "createdAt": "2025-01-02T10:00:00.000Z",
                    "completedAt": "2025-01-09T10:00:00.000Z",
                    "state": {"name": "Done"}, "team": {"name": "Platform"}
                }],
                "pageInfo": {"hasNextPage": true, "endCursor": "c1"}
            }}}"#,
        )
        .unwrap();
        let page = graphql_data(response(body)).unwrap().issues.into_page();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].identifier, "ENG-1");
        assert_eq!(page.items[0].state_name(), Some("Done"));
        assert_eq!(page.items[0].team_name(), Some("Platform"));
        assert!(page.items[0].completed_at.is_some());
        assert_eq!(page.next, Some(Continuation::Cursor("c1".into())));
    }

    #[test]
    fn page_variables_carry_cursor() {
        let filter = json!({"a": 1});
        let first = page_variables(&filter, None);
        assert_eq!(first["after"], Value::Null);
        assert_eq!(first["first"], 100);
        let second = page_variables(&filter, Some(Continuation::Cursor("abc".into())));
        assert_eq!(second["after"], "abc");
        assert_eq!(second["filter"], filter);
    }
}
