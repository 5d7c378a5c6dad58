//! PubMed Client
//!
//! Counts PubMed records through the NCBI E-utilities `esearch` endpoint with
//! `rettype=count`, so only the hit count travels over the wire.
//!
//! Useful field tags for the optional field selector:
//! `word` (text word, default), `tiab` (title/abstract), `titl` (title),
//! `mesh` (MeSH terms), `majr` (MeSH major topic), `auth` (author),
//! `jour` (journal), `all` (all fields).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::CountProvider;
use crate::types::{AppError, AppResult};

pub const PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_FIELD: &str = "word";
const PROVIDER_NAME: &str = "PubMed";

pub struct PubMedClient {
    client: Client,
    base_url: String,
}

impl PubMedClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InvalidInput(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Entrez query restricting `term` to `field` and to publications dated `year`.
    fn build_term(term: &str, year: i32, field: Option<&str>) -> String {
        format!("{}[{}] AND {}[pdat]", term, field.unwrap_or(DEFAULT_FIELD), year)
    }
}

#[async_trait]
impl CountProvider for PubMedClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn count(&self, term: &str, year: i32, field: Option<&str>) -> AppResult<u64> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let query = Self::build_term(term, year, field);
        debug!(query = %query, "Querying PubMed esearch");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("db", "pubmed"),
                ("retmode", "json"),
                ("rettype", "count"),
                ("term", query.as_str()),
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

        let body = response
            .text()
            .await
            .map_err(|e| AppError::transport(PROVIDER_NAME, term, year, e.to_string()))?;

        parse_count(&body).map_err(|message| AppError::parse(PROVIDER_NAME, term, year, message))
    }
}

/// Extract `esearchresult.count` from an esearch JSON body.
fn parse_count(body: &str) -> Result<u64, String> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| format!("malformed JSON: {}", e))?;

    let count = json
        .get("esearchresult")
        .ok_or_else(|| "missing 'esearchresult'".to_string())?
        .get("count")
        .ok_or_else(|| "missing 'esearchresult.count'".to_string())?;

    // E-utilities sends the count as a string; accept a bare number too.
    match count {
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("count '{}' is not a non-negative integer", s)),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("count {} is not a non-negative integer", n)),
        other => Err(format!("unexpected count value {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_build_term() {
        assert_eq!(
            PubMedClient::build_term("\"fart\"", 2001, None),
            "\"fart\"[word] AND 2001[pdat]"
        );
        assert_eq!(
            PubMedClient::build_term("lung cancer", 1999, Some("tiab")),
            "lung cancer[tiab] AND 1999[pdat]"
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(r#"{"esearchresult":{"count":"1234"}}"#), Ok(1234));
        assert_eq!(parse_count(r#"{"esearchresult":{"count":7}}"#), Ok(7));
        assert!(parse_count(r#"{"header":{}}"#).is_err());
        assert!(parse_count(r#"{"esearchresult":{"ERROR":"bad"}}"#).is_err());
        assert!(parse_count(r#"{"esearchresult":{"count":"-3"}}"#).is_err());
        assert!(parse_count("<html>oops</html>").is_err());
    }

    #[tokio::test]
    async fn test_count_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded("rettype".into(), "count".into()),
                Matcher::UrlEncoded("term".into(), "\"banana\"[word] AND 2010[pdat]".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"header":{"type":"esearch"},"esearchresult":{"count":"321"}}"#)
            .create_async()
            .await;

        let client = PubMedClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let count = client.count("\"banana\"", 2010, None).await.unwrap();

        assert_eq!(count, 321);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_count_is_parse_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult":{}}"#)
            .create_async()
            .await;

        let client = PubMedClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = client.count("banana", 2010, None).await.unwrap_err();

        match err {
            AppError::Parse { provider, term, year, .. } => {
                assert_eq!(provider, "PubMed");
                assert_eq!(term, "banana");
                assert_eq!(year, 2010);
            }
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let client = PubMedClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = client.count("banana", 2010, None).await.unwrap_err();
        assert!(matches!(err, AppError::Transport { .. }));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let client = PubMedClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.count("banana", 2010, None).await.unwrap_err();
        assert!(matches!(err, AppError::Transport { .. }));
    }
}
