use anyhow::Result;
use serde::Deserialize;
use std::env;

use crate::search::pubmed::{DEFAULT_FIELD, PUBMED_BASE_URL};
use crate::search::scholar::{DEFAULT_USER_AGENT, SCHOLAR_BASE_URL};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    pub query: QueryDefaults,
}

/// Provider endpoints and HTTP settings
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub pubmed_base_url: String,
    pub scholar_base_url: String,
    pub scholar_user_agent: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pubmed_base_url: PUBMED_BASE_URL.to_string(),
            scholar_base_url: SCHOLAR_BASE_URL.to_string(),
            scholar_user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Defaults for a query run; CLI flags override these.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDefaults {
    pub database: String,
    pub pause_secs: f64,
    pub exact_phrase: bool,
    pub pubmed_field: String,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            database: "pubmed".to_string(),
            pause_secs: 1.0,
            exact_phrase: true,
            pubmed_field: DEFAULT_FIELD.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            query: QueryDefaults::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let search = SearchConfig::default();
        let query = QueryDefaults::default();

        Ok(Self {
            search: SearchConfig {
                pubmed_base_url: env::var("PUBMED_BASE_URL").unwrap_or(search.pubmed_base_url),
                scholar_base_url: env::var("SCHOLAR_BASE_URL").unwrap_or(search.scholar_base_url),
                scholar_user_agent: env::var("SCHOLAR_USER_AGENT")
                    .unwrap_or(search.scholar_user_agent),
                timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| search.timeout_secs.to_string())
                    .parse()?,
            },
            query: QueryDefaults {
                database: env::var("BIBLIO_DATABASE").unwrap_or(query.database),
                pause_secs: env::var("BIBLIO_PAUSE_SECS")
                    .unwrap_or_else(|_| query.pause_secs.to_string())
                    .parse()?,
                exact_phrase: env::var("BIBLIO_EXACT_PHRASE")
                    .unwrap_or_else(|_| query.exact_phrase.to_string())
                    .parse()?,
                pubmed_field: env::var("BIBLIO_PUBMED_FIELD").unwrap_or(query.pubmed_field),
            },
        })
    }
}
