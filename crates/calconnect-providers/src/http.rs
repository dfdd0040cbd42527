//! Small helpers shared by the provider HTTP clients.

use std::time::Duration;

use crate::error::{CalendarError, CalendarResult};

/// Builds a `reqwest` client with the adapter's timeout and user agent.
pub(crate) fn build_client(timeout: Duration, user_agent: &str) -> CalendarResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| CalendarError::configuration(format!("failed to create HTTP client: {e}")).with_source(e))
}

/// Returns the body of a successful response, or the mapped status error.
pub(crate) async fn read_success_body(response: reqwest::Response) -> CalendarResult<String> {
    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        return Err(CalendarError::from_status(status.as_u16(), retry_after, &body));
    }

    response.text().await.map_err(CalendarError::from_transport)
}
