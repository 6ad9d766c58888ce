//! Remote CSV source over HTTP.

use super::{DataSource, RetryPolicy, source_error};
use crate::error::{DataError, Result};
use crate::table::RawTable;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Fetches the universe table as CSV from a URL.
#[derive(Debug, Clone)]
pub struct HttpCsvSource {
    url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpCsvSource {
    /// Create a source with a 30 second timeout and the default retry policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the request timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch_once(&self, client: &Client) -> Result<String> {
        let response = client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response.text()?)
    }
}

/// Reject bodies that are clearly not CSV, such as an HTML interstitial page.
fn validate_body(source_id: &str, body: &str) -> Result<()> {
    let head = body.trim_start();
    if head.is_empty() {
        return Err(source_error(source_id, "empty response body"));
    }
    if head.starts_with('<') {
        return Err(source_error(source_id, "response is HTML, not CSV"));
    }
    Ok(())
}

impl DataSource for HttpCsvSource {
    fn id(&self) -> String {
        self.url.clone()
    }

    fn load(&self) -> Result<RawTable> {
        let client = Client::builder().timeout(self.timeout).build()?;
        let body = self.retry.run(|attempt| {
            debug!(url = %self.url, attempt, "Fetching dataset");
            self.fetch_once(&client)
        })?;

        validate_body(&self.id(), &body)?;
        let table = RawTable::from_csv_str(&body)?;
        info!(url = %self.url, rows = table.len(), "Fetched dataset");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_body() {
        assert!(validate_body("s", "Ticker,Sector\nA,Tech\n").is_ok());
        assert!(matches!(
            validate_body("s", "   "),
            Err(DataError::Source { .. })
        ));
        assert!(matches!(
            validate_body("s", "<!DOCTYPE html><html></html>"),
            Err(DataError::Source { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let source = HttpCsvSource::new("https://example.com/universe.csv")
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::none());
        assert_eq!(source.id(), "https://example.com/universe.csv");
        assert_eq!(source.url(), "https://example.com/universe.csv");
        assert_eq!(source.retry.max_attempts, 1);
        assert_eq!(source.timeout, Duration::from_secs(5));
    }
}
