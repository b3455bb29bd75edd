use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tempfile::NamedTempFile;

use crate::error::{CoreError, Result};

static SEPARATORS: OnceLock<Regex> = OnceLock::new();

fn separators() -> &'static Regex {
    SEPARATORS.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex"))
}

/// Lowercase `identity` and collapse every run of characters that are not
/// letters or digits (in any script) to `-`.
///
/// `"Ada Lovelace"` → `ada-lovelace`, `"ACME Corp."` → `acme-corp`,
/// `"Zoë Ångström"` → `zoë-ångström`.
pub fn sanitize_identity(identity: &str) -> Result<String> {
    let lowered = identity.to_lowercase();
    let slug = separators().replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        return Err(CoreError::EmptyIdentity(identity.to_string()));
    }
    Ok(slug.to_string())
}

/// `{kind}-{identity}-{year}.md`, e.g. `linear-ada-lovelace-2025.md`.
pub fn report_filename(kind: &str, identity: &str, year: i32) -> Result<String> {
    Ok(format!("{kind}-{}-{year}.md", sanitize_identity(identity)?))
}

/// [`report_filename`] for the first of `candidates` that survives
/// sanitizing, e.g. a display name, then an email local part, then an id.
pub fn report_filename_from(kind: &str, candidates: &[&str], year: i32) -> Result<String> {
    candidates
        .iter()
        .find_map(|identity| report_filename(kind, identity, year).ok())
        .ok_or_else(|| CoreError::EmptyIdentity(candidates.join(", ")))
}

/// Write `contents` to `dir/filename`, replacing any existing file.
///
/// Goes through a tempfile in the same directory so a failed run never
/// leaves a half-written report behind.
pub fn write_report(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(&path).map_err(|e| e.error)?;
    Ok(path)
}
