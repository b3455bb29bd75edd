//! `activity-sources`: clients for the three upstream APIs.
//!
//! Each client turns one API into plain record types and leaves retrying,
//! paging and concurrency to `activity-core`:
//!
//! - [`linear`]: GraphQL, cursor pagination (`pageInfo.hasNextPage`).
//! - [`github`]: REST, `Link: rel="next"` pagination.
//! - [`slack`]: Web API, cursor (`users.list`) and page-number
//!   (`search.messages`) pagination.

pub mod error;
pub mod github;
pub mod http;
pub mod linear;
pub mod slack;

pub use error::SourceError;
pub use http::ApiClient;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, SourceError>;
