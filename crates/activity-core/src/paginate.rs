use std::future::Future;
use std::time::Duration;

// ─── Continuation ─────────────────────────────────────────────────────────

/// How to ask for the next page. Each upstream API speaks one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Opaque cursor from a `pageInfo { hasNextPage endCursor }` style response.
    Cursor(String),
    /// 1-based page number for `page` / `pages` style responses.
    Page(u32),
    /// Absolute URL taken from a `Link: <…>; rel="next"` header.
    Url(String),
}

impl Continuation {
    /// Continuation for cursor APIs. `None` when there is no next page, or
    /// when the API claims a next page but hands back an empty cursor.
    pub fn cursor(has_next: bool, end_cursor: Option<&str>) -> Option<Self> {
        match end_cursor {
            Some(c) if has_next && !c.is_empty() => Some(Continuation::Cursor(c.to_string())),
            _ => None,
        }
    }

    /// Continuation for page-number APIs: the next page while `current < total`.
    pub fn page(current: u32, total: u32) -> Option<Self> {
        (current < total).then(|| Continuation::Page(current + 1))
    }

    /// Continuation from an RFC 8288 `Link` header value, following `rel="next"`.
    pub fn from_link_header(header: &str) -> Option<Self> {
        header.split(',').find_map(|part| {
            let mut pieces = part.split(';');
            let target = pieces.next()?.trim();
            let url = target.strip_prefix('<')?.strip_suffix('>')?;
            let is_next = pieces.any(|param| {
                let param = param.trim();
                param
                    .strip_prefix("rel=")
                    .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                    .unwrap_or(false)
            });
            is_next.then(|| Continuation::Url(url.to_string()))
        })
    }

    pub fn as_cursor(&self) -> Option<&str> {
        match self {
            Continuation::Cursor(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<u32> {
        match self {
            Continuation::Page(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            Continuation::Url(u) => Some(u),
            _ => None,
        }
    }
}

// ─── Page ─────────────────────────────────────────────────────────────────

/// One page of results plus how to get the next one (`None` = last page).
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Continuation>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<Continuation>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

// ─── paginate ─────────────────────────────────────────────────────────────

/// Drive `fetch` from the first page (`None`) until a page comes back
/// without a continuation, concatenating items in page order.
///
/// Pages are strictly sequential: the request for page N+1 is only built
/// from page N's continuation. `throttle` is slept between requests, never
/// before the first. There is no page limit and no cycle detection.
pub async fn paginate<T, E, F, Fut>(throttle: Duration, mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<Continuation>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut next = None;
    let mut pages = 0usize;
    loop {
        if pages > 0 && !throttle.is_zero() {
            tokio::time::sleep(throttle).await;
        }
        let page = fetch(next.take()).await?;
        pages += 1;
        items.extend(page.items);
        match page.next {
            Some(c) => next = Some(c),
            None => break,
        }
    }
    tracing::debug!(pages, items = items.len(), "pagination complete");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn three_pages_accumulate_in_order() {
        let sizes = [100usize, 100, 37];
        let seen = RefCell::new(Vec::new());
        let items: Vec<(usize, usize)> = paginate(Duration::ZERO, |next| {
            seen.borrow_mut().push(next.clone());
            let index = match &next {
                None => 0,
                Some(c) => c.as_cursor().unwrap().parse::<usize>().unwrap(),
            };
            async move {
                let items = (0..sizes[index]).map(|i| (index, i)).collect();
                let next = Continuation::cursor(index + 1 < sizes.len(), Some(&(index + 1).to_string()));
                Ok::<_, std::io::Error>(Page::new(items, next))
            }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 237);
        assert_eq!(items[0], (0, 0));
        assert_eq!(items[100], (1, 0));
        assert_eq!(items[236], (2, 36));
        assert!(items.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            *seen.borrow(),
            vec![
                None,
                Some(Continuation::Cursor("1".into())),
                Some(Continuation::Cursor("2".into()))
            ]
        );
    }

    #[tokio::test]
    async fn single_terminal_page() {
        let items = paginate(Duration::from_secs(60), |_| async {
            Ok::<_, std::io::Error>(Page::last(vec![1, 2, 3]))
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn error_on_later_page_propagates() {
        let calls = RefCell::new(0);
        let result: Result<Vec<u32>, _> = paginate(Duration::ZERO, |_| {
            *calls.borrow_mut() += 1;
            let n = *calls.borrow();
            async move {
                if n == 1 {
                    Ok(Page::new(vec![1], Continuation::page(1, 5)))
                } else {
                    Err(std::io::Error::other("page 2 failed"))
                }
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(*calls.borrow(), 2);
    }

    #[tokio::test]
    async fn page_numbers_walk_to_total() {
        let requested = RefCell::new(Vec::new());
        let items = paginate(Duration::ZERO, |next| {
            let page = next.and_then(|c| c.as_page()).unwrap_or(1);
            requested.borrow_mut().push(page);
            async move { Ok::<_, std::io::Error>(Page::new(vec![page], Continuation::page(page, 3))) }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(*requested.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn cursor_requires_has_next_and_non_empty_cursor() {
        assert_eq!(
            Continuation::cursor(true, Some("abc")),
            Some(Continuation::Cursor("abc".into()))
        );
        assert_eq!(Continuation::cursor(false, Some("abc")), None);
        assert_eq!(Continuation::cursor(true, Some("")), None);
        assert_eq!(Continuation::cursor(true, None), None);
    }

    #[test]
    fn page_stops_at_total() {
        assert_eq!(Continuation::page(1, 3), Some(Continuation::Page(2)));
        assert_eq!(Continuation::page(3, 3), None);
        assert_eq!(Continuation::page(1, 0), None);
    }

    #[test]
    fn link_header_next() {
        let header = r#"<https://api.github.com/orgs/acme/repos?page=2>; rel="next", <https://api.github.com/orgs/acme/repos?page=5>; rel="last""#;
        assert_eq!(
            Continuation::from_link_header(header),
            Some(Continuation::Url(
                "https://api.github.com/orgs/acme/repos?page=2".into()
            ))
        );
    }

    #[test]
    fn link_header_next_not_first() {
        let header = r#"<https://x/?page=1>; rel="prev", <https://x/?page=3>; rel="next""#;
        assert_eq!(
            Continuation::from_link_header(header).and_then(|c| c.as_url().map(String::from)),
            Some("https://x/?page=3".into())
        );
    }

    #[test]
    fn link_header_without_next() {
        let header = r#"<https://x/?page=1>; rel="first", <https://x/?page=4>; rel="prev""#;
        assert_eq!(Continuation::from_link_header(header), None);
        assert_eq!(Continuation::from_link_header(""), None);
    }
}
