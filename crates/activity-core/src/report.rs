//! Report Assembler: weekly buckets rendered as markdown.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::config::PREVIEW_CHARS;
use crate::week::WeekKey;

// ---------------------------------------------------------------------------
// ReportItem
// ---------------------------------------------------------------------------

/// One line of activity in the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportItem {
    /// Summary/heading category, e.g. "Issues created".
    pub category: String,
    /// Sub-heading inside the category (team, repo, channel).
    pub section: Option<String>,
    /// Link text, e.g. `ENG-12` or `acme/api#42`.
    pub reference: String,
    pub url: Option<String>,
    pub title: String,
    /// Status and similar short annotations, rendered `·`-separated.
    pub meta: Vec<String>,
    pub preview: Option<String>,
    /// Timestamp the item is bucketed by.
    pub at: DateTime<Utc>,
}

impl ReportItem {
    pub fn new(category: impl Into<String>, reference: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            section: None,
            reference: reference.into(),
            url: None,
            title: String::new(),
            meta: Vec::new(),
            preview: None,
            at,
        }
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        let meta = meta.into();
        if !meta.is_empty() {
            self.meta.push(meta);
        }
        self
    }

    /// Attach a preview built from `body` with [`preview`].
    pub fn body(mut self, body: Option<&str>) -> Self {
        self.preview = body.and_then(preview);
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date_naive()
    }

    pub fn week(&self) -> WeekKey {
        WeekKey::of(self.date())
    }
}

/// First line of `body`, cut to [`PREVIEW_CHARS`] characters. `...` marks
/// a cut line or dropped following lines. Blank bodies have no preview.
pub fn preview(body: &str) -> Option<String> {
    let mut lines = body.trim().lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next()?;
    let more_lines = lines.next().is_some();

    let mut text: String = first.chars().take(PREVIEW_CHARS).collect();
    if more_lines || first.chars().count() > PREVIEW_CHARS {
        text = text.trim_end().to_string();
        text.push_str("...");
    }
    Some(text)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A year of activity for one identity. `Display` renders the markdown.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    /// Label for the identity line, e.g. "User" or "Organization".
    pub identity_label: String,
    pub identity: String,
    pub year: i32,
    pub generated: NaiveDate,
    categories: Vec<String>,
    items: Vec<ReportItem>,
}

impl Report {
    pub fn new(
        title: impl Into<String>,
        identity_label: impl Into<String>,
        identity: impl Into<String>,
        year: i32,
        generated: NaiveDate,
    ) -> Self {
        Self {
            title: title.into(),
            identity_label: identity_label.into(),
            identity: identity.into(),
            year,
            generated,
            categories: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Declare a category up front so it is listed (with a zero count) even
    /// when empty. Categories render in declaration order.
    pub fn category(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.categories.contains(&name) {
            self.categories.push(name);
        }
        self
    }

    /// Add an item. Items dated outside the report year are dropped.
    pub fn push(&mut self, item: ReportItem) {
        if item.date().year() != self.year {
            tracing::debug!(reference = %item.reference, at = %item.at, "outside report year, skipped");
            return;
        }
        if !self.categories.contains(&item.category) {
            self.categories.push(item.category.clone());
        }
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ReportItem>) {
        for item in items {
            self.push(item);
        }
    }

    pub fn items(&self) -> &[ReportItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, category: &str) -> usize {
        self.items.iter().filter(|i| i.category == category).count()
    }

    /// Items grouped by week, weeks ascending, items by timestamp.
    pub fn weeks(&self) -> BTreeMap<WeekKey, Vec<&ReportItem>> {
        let mut weeks: BTreeMap<WeekKey, Vec<&ReportItem>> = BTreeMap::new();
        for item in &self.items {
            weeks.entry(item.week()).or_default().push(item);
        }
        for items in weeks.values_mut() {
            items.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.reference.cmp(&b.reference)));
        }
        weeks
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    fn write_week(&self, f: &mut fmt::Formatter<'_>, items: &[&ReportItem]) -> fmt::Result {
        for category in &self.categories {
            let in_category: Vec<&ReportItem> = items
                .iter()
                .copied()
                .filter(|i| &i.category == category)
                .collect();
            if in_category.is_empty() {
                continue;
            }
            writeln!(f, "### {category}")?;
            writeln!(f)?;

            let mut sections: BTreeMap<Option<&str>, Vec<&ReportItem>> = BTreeMap::new();
            for item in in_category {
                sections.entry(item.section.as_deref()).or_default().push(item);
            }
            // `None` sorts first: unsectioned items sit directly under the category.
            for (section, items) in sections {
                if let Some(section) = section {
                    writeln!(f, "#### {section}")?;
                    writeln!(f)?;
                }
                for item in items {
                    write_item(f, item)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {} ({})", self.title, self.year)?;
        writeln!(f)?;
        writeln!(f, "> **{}:** {}", self.identity_label, self.identity)?;
        writeln!(f, "> **Generated:** {}", self.generated.format("%Y-%m-%d"))?;
        writeln!(f)?;

        let weeks = self.weeks();

        writeln!(f, "## Summary")?;
        writeln!(f)?;
        for category in &self.categories {
            writeln!(f, "- **{category}:** {}", self.count(category))?;
        }
        writeln!(f, "- **Active weeks:** {}", weeks.len())?;
        writeln!(f)?;

        if weeks.is_empty() {
            writeln!(f, "_No activity found for {}._", self.year)?;
            return Ok(());
        }

        for (key, items) in &weeks {
            match key.range_label() {
                Ok(range) => writeln!(f, "## {key} ({range})")?,
                Err(_) => writeln!(f, "## {key}")?,
            }
            writeln!(f)?;
            self.write_week(f, items)?;
        }
        Ok(())
    }
}

fn write_item(f: &mut fmt::Formatter<'_>, item: &ReportItem) -> fmt::Result {
    let reference = escape_link_text(&item.reference);
    match &item.url {
        Some(url) => write!(f, "- [{reference}]({url})")?,
        None => write!(f, "- **{reference}**")?,
    }
    if !item.title.is_empty() {
        write!(f, " {}", item.title)?;
    }
    for meta in &item.meta {
        write!(f, " · {meta}")?;
    }
    writeln!(f, " · {}", item.date().format("%Y-%m-%d"))?;
    if let Some(preview) = &item.preview {
        writeln!(f, "  > {preview}")?;
    }
    Ok(())
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}
