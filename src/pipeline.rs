//! End-to-end run: query, optionally save, optionally plot.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::analysis::{plot_yearly_count, ChartConfig};
use crate::collector::{QueryOptions, YearlyCountCollector};
use crate::config::Config;
use crate::models::{ResultSet, YearRange};
use crate::search::{CountProvider, Database};
use crate::storage::write_results;
use crate::types::{AppError, AppResult};

/// Comparison term used when none is given.
pub const DEFAULT_COMPARISON: &str = "banana";

#[derive(Debug, Clone)]
pub struct CitationRequest {
    pub search_terms: Vec<String>,
    pub comparison_terms: Vec<String>,
    pub start_year: i32,
    pub end_year: i32,
    pub database: Database,
    pub exact_phrase: bool,
    /// PubMed field tag; ignored by Scholar.
    pub field: Option<String>,
    pub pause_secs: f64,
    pub verbose: bool,
    pub save_to: Option<PathBuf>,
    pub plot_to: Option<PathBuf>,
    pub chart: ChartConfig,
}

impl CitationRequest {
    /// A request using the defaults from `config`.
    pub fn new(search_terms: Vec<String>, start_year: i32, end_year: i32, config: &Config) -> AppResult<Self> {
        Ok(Self {
            search_terms,
            comparison_terms: vec![DEFAULT_COMPARISON.to_string()],
            start_year,
            end_year,
            database: config.query.database.parse()?,
            exact_phrase: config.query.exact_phrase,
            field: Some(config.query.pubmed_field.clone()),
            pause_secs: config.query.pause_secs,
            verbose: false,
            save_to: None,
            plot_to: None,
            chart: ChartConfig::default(),
        })
    }

    pub fn query_options(&self) -> AppResult<QueryOptions> {
        let pause = Duration::try_from_secs_f64(self.pause_secs).map_err(|_| {
            AppError::InvalidInput(format!("pause of {} seconds is not valid", self.pause_secs))
        })?;
        Ok(QueryOptions {
            exact_phrase: self.exact_phrase,
            field: self.field.clone(),
            pause,
            verbose: self.verbose,
        })
    }
}

/// Query `request.database` for every term, then save and plot as requested.
pub async fn compute_yearly_citations(request: &CitationRequest, config: &Config) -> AppResult<ResultSet> {
    let provider = request.database.provider(&config.search)?;
    compute_with_provider(request, provider).await
}

/// Same as [`compute_yearly_citations`] with an explicit provider.
pub async fn compute_with_provider(
    request: &CitationRequest,
    provider: Box<dyn CountProvider>,
) -> AppResult<ResultSet> {
    let years = YearRange::new(request.start_year, request.end_year)?;
    let collector = YearlyCountCollector::new(provider, request.query_options()?);

    let results = ResultSet::build(&request.search_terms, &request.comparison_terms, years, &collector).await?;

    if let Some(path) = &request.save_to {
        let written = write_results(path, &results)?;
        info!(path = %written.display(), "Saved yearly counts");
    }

    if let Some(path) = &request.plot_to {
        let written = plot_yearly_count(&results, &request.chart, path)?;
        info!(path = %written.display(), "Saved chart");
    }

    Ok(results)
}
