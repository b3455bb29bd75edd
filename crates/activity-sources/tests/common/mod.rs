use std::time::Duration;

use activity_core::RetryPolicy;
use activity_sources::ApiClient;

/// Client for a local mock server: no retry delay, no page throttle.
pub fn api(url: &str, authorization: &str) -> ApiClient {
    ApiClient::new(url, authorization)
        .unwrap()
        .with_retry(RetryPolicy::immediate())
        .with_throttle(Duration::ZERO)
}
