//! HTTP client construction.

use reqwest::Client;

use crate::config::{Config, USER_AGENT};

/// Create a client with the configured timeout and user agent.
///
/// The timeout bounds every request, so a stalled server surfaces as a
/// timeout error instead of hanging the run.
pub fn create_client(config: &Config) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT)
        .build()
}
