pub mod github;
pub mod linear;
pub mod slack;

use std::path::{Path, PathBuf};

use activity_core::config::DEFAULT_CONCURRENCY;
use activity_core::output::{report_filename_from, write_report};
use activity_core::report::Report;
use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::Args;

/// Options every report binary accepts.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Calendar year to report on [default: current UTC year]
    #[arg(long, env = "YEAR", value_parser = clap::value_parser!(i32).range(1970..=9999))]
    pub year: Option<i32>,

    /// Maximum number of requests in flight at once
    #[arg(
        long,
        env = "CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY as u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub concurrency: u32,

    /// Directory the report is written to
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

impl CommonArgs {
    pub fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency as usize
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Render `report` to `{dir}/{kind}-{identity}-{year}.md`, naming it after
/// the first of `identities` that still has letters or digits once
/// sanitized.
pub(crate) fn save(report: &Report, kind: &str, identities: &[&str], dir: &Path) -> anyhow::Result<PathBuf> {
    let filename = report_filename_from(kind, identities, report.year)
        .context("cannot build a report filename")?;
    let path = write_report(dir, &filename, &report.render())
        .with_context(|| format!("writing {}", dir.join(&filename).display()))?;
    tracing::info!(path = %path.display(), items = report.items().len(), "report written");
    Ok(path)
}
