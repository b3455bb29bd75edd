use std::time::Duration;

// ---------------------------------------------------------------------------
// Shared constants
// ---------------------------------------------------------------------------

/// Total attempts per network operation, first try included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed pause between failed attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Per-request timeout. Applied by the HTTP client, not by the retry loop.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between consecutive page requests of one paginated fetch.
pub const PAGE_THROTTLE: Duration = Duration::from_millis(100);

/// Default cap on in-flight fetches for the bounded runner.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Maximum characters kept in a body preview before the ellipsis.
pub const PREVIEW_CHARS: usize = 100;

/// Page size requested from every paginated endpoint.
pub const PAGE_SIZE: u32 = 100;
