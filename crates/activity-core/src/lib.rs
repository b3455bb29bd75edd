//! `activity-core`: the shared pipeline behind the activity report scripts.
//!
//! Every script follows the same shape:
//!
//! ```text
//! fetch fn (one page)
//!     │
//!     ▼
//! with_retry      ← fixed attempts, fixed delay, context label
//!     │
//!     ▼
//! paginate        ← cursor / page number / Link URL until no continuation
//!     │
//!     ▼
//! run_bounded     ← independent fetches, sliding window of N in flight
//!     │
//!     ▼
//! dedup_by_key    ← one record per upstream id, last writer wins
//!     │
//!     ▼
//! report::render  ← WeekKey buckets → markdown
//! ```

pub mod cache;
pub mod concurrent;
pub mod config;
pub mod dedup;
pub mod error;
pub mod identity;
pub mod output;
pub mod paginate;
pub mod report;
pub mod retry;
pub mod week;

pub use error::{CoreError, Result};
pub use retry::{RetryExhausted, RetryPolicy};
