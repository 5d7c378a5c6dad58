//! Search Module
//!
//! Yearly publication counts from bibliographic databases:
//! - PubMed (NCBI E-utilities esearch, count-only JSON)
//! - Google Scholar (results line scraped from the HTML page)
//!
//! Each database implements [`CountProvider`]; [`Database`] picks one at
//! construction time.

pub mod pubmed;
pub mod scholar;

pub use pubmed::PubMedClient;
pub use scholar::ScholarClient;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::types::{AppError, AppResult};

/// Number of publications matching `term` in a single `year`.
#[async_trait]
pub trait CountProvider: Send + Sync {
    /// Human-readable provider name used in logs and errors.
    fn name(&self) -> &str;

    async fn count(&self, term: &str, year: i32, field: Option<&str>) -> AppResult<u64>;
}

/// Supported databases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Database {
    #[default]
    PubMed,
    Scholar,
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Database::PubMed => write!(f, "pubmed"),
            Database::Scholar => write!(f, "scholar"),
        }
    }
}

impl FromStr for Database {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pubmed" | "ncbi" | "pm" | "medline" => Ok(Database::PubMed),
            "scholar" | "google scholar" | "googlescholar" | "gscholar" => Ok(Database::Scholar),
            other => Err(AppError::InvalidInput(format!("unknown database '{}'", other))),
        }
    }
}

impl Database {
    /// Build the provider for this database from configuration.
    pub fn provider(&self, config: &SearchConfig) -> AppResult<Box<dyn CountProvider>> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let provider: Box<dyn CountProvider> = match self {
            Database::PubMed => Box::new(PubMedClient::new(&config.pubmed_base_url, timeout)?),
            Database::Scholar => Box::new(ScholarClient::new(
                &config.scholar_base_url,
                &config.scholar_user_agent,
                timeout,
            )?),
        };
        Ok(provider)
    }
}
