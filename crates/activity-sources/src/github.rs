use std::collections::BTreeSet;

use activity_core::concurrent::{ok_or_log, run_bounded};
use activity_core::config::PAGE_SIZE;
use activity_core::paginate::{paginate, Continuation, Page};
use activity_core::week::year_bounds;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::http::ApiClient;
use crate::{Result, SourceError};

pub const DEFAULT_URL: &str = "https://api.github.com";

// ─── Records ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
    /// GitHub account linked to the commit author email, if any.
    #[serde(default)]
    pub author: Option<Account>,
}

impl Commit {
    /// Login of the account that authored this commit as `email`.
    pub fn login_for(&self, email: &str) -> Option<&str> {
        let git_author = self.commit.author.as_ref()?;
        if !git_author.email.eq_ignore_ascii_case(email) {
            return None;
        }
        self.author.as_ref().map(|a| a.login.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestLinks {
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

/// A pull request as returned by the issue search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub repository_url: String,
    #[serde(default)]
    pub pull_request: Option<PullRequestLinks>,
    #[serde(default)]
    pub user: Option<Account>,
}

impl PullRequest {
    pub fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.pull_request.as_ref().and_then(|p| p.merged_at)
    }

    /// `owner/repo`, taken from the last two segments of `repository_url`.
    pub fn repo(&self) -> String {
        let mut segments = self.repository_url.trim_end_matches('/').rsplit('/');
        match (segments.next(), segments.next()) {
            (Some(repo), Some(owner)) => format!("{owner}/{repo}"),
            _ => self.repository_url.clone(),
        }
    }

    /// `merged`, `open` or `closed`, with a draft marker.
    pub fn status(&self) -> String {
        let state = if self.merged_at().is_some() {
            "merged"
        } else {
            self.state.as_str()
        };
        if self.draft {
            format!("{state} (draft)")
        } else {
            state.to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults<T> {
    items: Vec<T>,
}

// ─── GithubClient ─────────────────────────────────────────────────────────

pub struct GithubClient {
    api: ApiClient,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let api = ApiClient::new(api_url, &format!("Bearer {token}"))?
            .with_header("accept", "application/vnd.github+json")
            .with_header("x-github-api-version", "2022-11-28");
        Ok(Self::from_api(api))
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    /// GET `path` and every page its `Link: rel="next"` header points to.
    async fn get_all<B, T, F>(&self, context: &str, path: &str, query: Vec<(&str, String)>, items: F) -> Result<Vec<T>>
    where
        B: DeserializeOwned,
        F: Fn(B) -> Vec<T>,
    {
        let items = &items;
        let query = &query;
        paginate(self.api.throttle(), |next| async move {
            let response = match next.as_ref().and_then(Continuation::as_url) {
                // The next URL already carries every query parameter.
                Some(url) => self.api.get::<B>(context, url, &[]).await?,
                None => self.api.get::<B>(context, path, query).await?,
            };
            let next = response.header("link").and_then(Continuation::from_link_header);
            Ok(Page::new(items(response.body), next))
        })
        .await
    }

    /// Every repository in `org` visible to the token.
    pub async fn org_repos(&self, org: &str) -> Result<Vec<Repo>> {
        let context = format!("github repos for {org}");
        let query = vec![("type", "all".to_string()), ("per_page", PAGE_SIZE.to_string())];
        let repos = self
            .get_all(&context, &format!("/orgs/{org}/repos"), query, |repos: Vec<Repo>| repos)
            .await?;
        tracing::info!(org, count = repos.len(), "fetched repositories");
        Ok(repos)
    }

    /// Logins of accounts that authored commits in `owner/repo` as `email`
    /// during `year`.
    pub async fn commit_logins(&self, owner: &str, repo: &str, email: &str, year: i32) -> Result<BTreeSet<String>> {
        let (since, until) = year_bounds(year)?;
        let context = format!("github commits {owner}/{repo} by {email}");
        let query = vec![
            ("author", email.to_string()),
            ("since", since.to_rfc3339()),
            ("until", until.to_rfc3339()),
            ("per_page", PAGE_SIZE.to_string()),
        ];
        let commits = self
            .get_all(&context, &format!("/repos/{owner}/{repo}/commits"), query, |c: Vec<Commit>| c)
            .await?;
        Ok(commits
            .iter()
            .filter_map(|c| c.login_for(email))
            .map(String::from)
            .collect())
    }

    /// Match `emails` to GitHub logins through commit authorship in `org`.
    ///
    /// Each repository/email pair is one fetch under the bounded runner. A
    /// failing pair (an empty repository answers 409) is logged and skipped.
    pub async fn discover_logins(&self, org: &str, emails: &[String], year: i32, concurrency: usize) -> Result<Vec<String>> {
        let repos = self.org_repos(org).await?;
        let pairs: Vec<(&Repo, &String)> = repos
            .iter()
            .flat_map(|r| emails.iter().map(move |e| (r, e)))
            .collect();
        tracing::info!(pairs = pairs.len(), "scanning commit authorship");

        let results = run_bounded(pairs, concurrency, |(repo, email)| async move {
            self.commit_logins(org, &repo.name, email, year)
                .await
                .map(|logins| (email, logins))
        })
        .await;

        let mut by_email: Vec<(&String, BTreeSet<String>)> =
            emails.iter().map(|e| (e, BTreeSet::new())).collect();
        for (email, logins) in ok_or_log(results, "github commit scan") {
            if let Some((_, found)) = by_email.iter_mut().find(|(e, _)| *e == email) {
                found.extend(logins);
            }
        }

        let mut all = BTreeSet::new();
        for (email, logins) in by_email {
            if logins.is_empty() {
                tracing::warn!(email = %email, "no GitHub account found for email");
            } else {
                tracing::info!(email = %email, logins = ?logins, "matched");
            }
            all.extend(logins);
        }
        if all.is_empty() {
            return Err(SourceError::NotFound(format!(
                "no GitHub accounts found in '{org}' for {}",
                emails.join(", ")
            )));
        }
        Ok(all.into_iter().collect())
    }

    /// Issue search restricted to pull requests. `query` is GitHub search
    /// syntax; `is:pr` is added here.
    pub async fn search_pull_requests(&self, query: &str) -> Result<Vec<PullRequest>> {
        let q = format!("is:pr {query}");
        let context = format!("github search '{q}'");
        let params = vec![("q", q.clone()), ("per_page", PAGE_SIZE.to_string())];
        let prs = self
            .get_all(&context, "/search/issues", params, |r: SearchResults<PullRequest>| r.items)
            .await?;
        tracing::info!(query = %q, count = prs.len(), "search complete");
        Ok(prs)
    }

    /// Pull requests `login` opened in `org` during `year`.
    pub async fn pull_requests_opened(&self, org: &str, login: &str, year: i32) -> Result<Vec<PullRequest>> {
        self.search_pull_requests(&format!("author:{login} org:{org} created:{}", year_range(year)))
            .await
    }

    /// Pull requests by `login` in `org` merged during `year`.
    pub async fn pull_requests_merged(&self, org: &str, login: &str, year: i32) -> Result<Vec<PullRequest>> {
        self.search_pull_requests(&format!(
            "is:merged author:{login} org:{org} merged:{}",
            year_range(year)
        ))
        .await
    }
}

/// `YYYY-01-01..YYYY-12-31` search qualifier value.
fn year_range(year: i32) -> String {
    format!("{year}-01-01..{year}-12-31")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(json: &str) -> PullRequest {
        serde_json::from_str(json).unwrap()
    }

    const PR: &str = r#"{
        "id": 11, "number": 42, "title": "Add retries", "html_url": "https://github.com/acme/api/pull/42",
        "state": "closed", "draft": false, "body": "Adds retries\n\nDetails",
        "created_at": "2025-02-03T09:00:00Z", "closed_at": "2025-02-04T09:00:00Z",
        "repository_url": "https://api.github.com/repos/acme/api",
        "pull_request": {"merged_at": "2025-02-04T09:00:00Z"},
        "user": {"login": "ada"}
    }"#;

    #[test]
    fn pull_request_helpers() {
        let p = pr(PR);
        assert_eq!(p.repo(), "acme/api");
        assert_eq!(p.status(), "merged");
        assert!(p.merged_at().is_some());
    }

    #[test]
    fn open_draft_status() {
        let p = pr(r#"{
            "id": 12, "number": 7, "title": "WIP", "html_url": "https://github.com/acme/web/pull/7",
            "state": "open", "draft": true, "created_at": "2025-03-01T00:00:00Z",
            "repository_url": "https://api.github.com/repos/acme/web",
            "pull_request": {"merged_at": null}
        }"#);
        assert_eq!(p.status(), "open (draft)");
        assert_eq!(p.merged_at(), None);
        assert_eq!(p.body, None);
    }

    #[test]
    fn commit_login_requires_matching_email() {
        let c: Commit = serde_json::from_str(
            r#"{"sha": "abc", "commit": {"author": {"name": "Ada", "email": "Ada@Example.com"}}, "author": {"login": "ada"}}"#,
        )
        .unwrap();
        assert_eq!(c.login_for("ada@example.com"), Some("ada"));
        assert_eq!(c.login_for("bob@example.com"), None);

        let unlinked: Commit = serde_json::from_str(
            r#"{"sha": "def", "commit": {"author": {"name": "Ada", "email": "ada@example.com"}}, "author": null}"#,
        )
        .unwrap();
        assert_eq!(unlinked.login_for("ada@example.com"), None);
    }

    #[test]
    fn year_range_qualifier() {
        assert_eq!(year_range(2025), "2025-01-01..2025-12-31");
    }
}
