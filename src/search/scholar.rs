//! Google Scholar Client
//!
//! Google Scholar has no count API, so the count is read from the
//! "About 1,230 results (0.05 sec)" line of a year-restricted search page.
//!
//! Scholar leaves that line out entirely when nothing matches, so a page
//! without it counts as zero rather than as a failure. Scholar also blocks
//! fast or numerous requests quickly; keep the pause between queries generous.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::CountProvider;
use crate::types::{AppError, AppResult};

pub const SCHOLAR_BASE_URL: &str = "https://scholar.google.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/48.0.2564.109 Safari/537.36";
const PROVIDER_NAME: &str = "Google Scholar";
const RESULTS_SELECTOR: &str = "div#gs_ab_md";

// Up to three digit groups joined by any separator, e.g. "1,234,567 ".
static RESULTS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+).?(\d+)?.?(\d+)?\s").expect("results pattern is valid"));

pub struct ScholarClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl ScholarClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InvalidInput(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl CountProvider for ScholarClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn count(&self, term: &str, year: i32, field: Option<&str>) -> AppResult<u64> {
        if let Some(field) = field {
            debug!(field = %field, "Field selectors are not supported by Google Scholar; ignoring");
        }

        let url = format!("{}/scholar", self.base_url);
        let year_param = year.to_string();

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .query(&[
                ("as_vis", "1"),
                ("hl", "en"),
                ("as_sdt", "1,5"),
                ("q", term),
                ("as_ylo", year_param.as_str()),
                ("as_yhi", year_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::transport(PROVIDER_NAME, term, year, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transport(
                PROVIDER_NAME,
                term,
                year,
                format!("HTTP status {}", status),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::transport(PROVIDER_NAME, term, year, e.to_string()))?;

        let count = parse_results_count(&html);
        if count == 0 {
            warn!(term = %term, year, "No results line on Google Scholar page; counting as zero");
        }
        Ok(count)
    }
}

/// Read the hit count from a Scholar results page; zero when the line is absent.
fn parse_results_count(html: &str) -> u64 {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(RESULTS_SELECTOR) {
        Ok(selector) => selector,
        Err(_) => return 0,
    };

    let Some(element) = document.select(&selector).next() else {
        return 0;
    };
    let text: String = element.text().collect();

    RESULTS_PATTERN
        .captures(&text)
        .map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn page(results_line: &str) -> String {
        format!(
            r#"<html><body><div id="gs_ab_md"><div class="gs_ab_mdw">{}</div></div></body></html>"#,
            results_line
        )
    }

    #[test]
    fn test_parse_results_count_with_separators() {
        assert_eq!(parse_results_count(&page("About 1,230 results (<b>0.05</b> sec)")), 1230);
        assert_eq!(parse_results_count(&page("About 1,234,567 results (0.1 sec)")), 1234567);
        assert_eq!(parse_results_count(&page("About 12.500 results (0.1 sec)")), 12500);
        assert_eq!(parse_results_count(&page("7 results (0.02 sec)")), 7);
        assert_eq!(parse_results_count(&page("1 result (0.02 sec)")), 1);
    }

    #[test]
    fn test_missing_results_line_counts_as_zero() {
        assert_eq!(parse_results_count("<html><body>No hits</body></html>"), 0);
        assert_eq!(parse_results_count(&page("")), 0);
    }

    #[tokio::test]
    async fn test_count_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "\"banana\"".into()),
                Matcher::UrlEncoded("as_ylo".into(), "2015".into()),
                Matcher::UrlEncoded("as_yhi".into(), "2015".into()),
            ]))
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_body(page("About 4,560 results (0.03 sec)"))
            .create_async()
            .await;

        let client =
            ScholarClient::new(&server.url(), DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        let count = client.count("\"banana\"", 2015, None).await.unwrap();

        assert_eq!(count, 4560);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blocked_request_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scholar")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client =
            ScholarClient::new(&server.url(), DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        let err = client.count("banana", 2015, None).await.unwrap_err();
        match err {
            AppError::Transport { provider, year, .. } => {
                assert_eq!(provider, "Google Scholar");
                assert_eq!(year, 2015);
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }
}
