//! HTTP client wrapper for fetching the License XML schema.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::{LicenseXmlError, Result};

/// User agent string identifying this library.
const USER_AGENT: &str = concat!("spdx-license-xml/", env!("CARGO_PKG_VERSION"));

/// Attempts made before a schema fetch is given up.
const FETCH_ATTEMPTS: u32 = 3;

/// Delay before the second attempt; doubled for each attempt after it.
const FIRST_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Build the client used for schema requests.
///
/// Every request made through the client is bounded by `timeout`.
pub fn create_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Fetch the schema document at `url` as text.
///
/// The schema host is retried when it is unreachable, times out or answers
/// with a 5xx status. Any other HTTP failure becomes
/// [`LicenseXmlError::SchemaFetch`] right away, so the caller can fall back
/// to the packaged schema without waiting.
pub fn download_text(client: &Client, url: &str) -> Result<String> {
    let response = fetch_with_retries(client, url)?;
    let body = response
        .error_for_status()
        .and_then(Response::bytes)
        .map_err(|source| LicenseXmlError::SchemaFetch {
            url: url.to_string(),
            source,
        })?;

    String::from_utf8(body.to_vec())
        .map_err(|e| LicenseXmlError::SchemaLoad(format!("{url} is not valid UTF-8: {e}")))
}

/// Send GET requests until one gets an answer that is not a server error.
fn fetch_with_retries(client: &Client, url: &str) -> Result<Response> {
    let mut last_failure = String::new();

    for attempt in 1..=FETCH_ATTEMPTS {
        if attempt > 1 {
            let delay = FIRST_RETRY_DELAY * 2u32.pow(attempt - 2);
            tracing::debug!(url, attempt, ?delay, "Retrying schema fetch");
            thread::sleep(delay);
        }

        match client.get(url).send() {
            Ok(response) if response.status().is_server_error() => {
                tracing::warn!(
                    url,
                    status = %response.status(),
                    attempt,
                    "Schema host returned a server error"
                );
                last_failure = format!("Server error: {}", response.status());
            }
            Ok(response) => return Ok(response),
            Err(e) if e.is_connect() || e.is_timeout() => {
                tracing::warn!(url, error = %e, attempt, "Schema host unreachable");
                last_failure = e.to_string();
            }
            Err(source) => {
                return Err(LicenseXmlError::SchemaFetch {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }

    Err(LicenseXmlError::RetriesExhausted {
        attempts: FETCH_ATTEMPTS,
        message: last_failure,
    })
}
