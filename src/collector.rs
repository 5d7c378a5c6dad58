//! Yearly Count Collector
//!
//! Walks a year range one year at a time, asking a [`CountProvider`] for each
//! year's count and pausing between requests. Providers throttle by request
//! rate, so queries are never issued concurrently.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::models::{CountSeries, SearchTerm, YearRange};
use crate::search::CountProvider;
use crate::types::AppResult;

/// Per-run query settings.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Wrap terms in double quotes so the provider matches the exact phrase.
    pub exact_phrase: bool,
    /// Provider field selector, e.g. PubMed's `tiab`. `None` uses the provider default.
    pub field: Option<String>,
    /// Wait between consecutive requests.
    pub pause: Duration,
    /// Report each year's count to the progress observer.
    pub verbose: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            exact_phrase: true,
            field: None,
            pause: Duration::from_secs(1),
            verbose: false,
        }
    }
}

/// Receives progress while a term is being collected.
pub trait ProgressObserver {
    fn on_start(&mut self, _query: &str, _years: YearRange) {}

    fn on_year(&mut self, query: &str, year: i32, count: u64);
}

/// Observer that reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_start(&mut self, query: &str, years: YearRange) {
        info!("Searching for '{}' from {} until {}", query, years.start(), years.end());
    }

    fn on_year(&mut self, query: &str, year: i32, count: u64) {
        info!(query = %query, year, count, "Yearly count");
    }
}

pub struct YearlyCountCollector {
    provider: Box<dyn CountProvider>,
    options: QueryOptions,
}

impl YearlyCountCollector {
    pub fn new(provider: Box<dyn CountProvider>, options: QueryOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// The query string sent to the provider for `term`.
    pub fn query_for(&self, term: &SearchTerm) -> String {
        if self.options.exact_phrase {
            format!("\"{}\"", term)
        } else {
            term.to_string()
        }
    }

    /// Collect one count per year, logging progress when verbose.
    pub async fn collect(&self, term: &SearchTerm, years: YearRange) -> AppResult<CountSeries> {
        self.collect_with(term, years, &mut LogObserver).await
    }

    /// Collect one count per year in ascending order. The first failing year
    /// aborts the collection and no later years are queried.
    pub async fn collect_with(
        &self,
        term: &SearchTerm,
        years: YearRange,
        observer: &mut dyn ProgressObserver,
    ) -> AppResult<CountSeries> {
        let query = self.query_for(term);
        let field = self.options.field.as_deref();

        if self.options.verbose {
            observer.on_start(&query, years);
        }

        let mut counts = Vec::with_capacity(years.len());
        for year in years.iter() {
            let count = match self.provider.count(&query, year, field).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(term = %term, year, provider = self.provider.name(), error = %e, "Yearly count failed");
                    return Err(e);
                }
            };
            counts.push(count);

            if self.options.verbose {
                observer.on_year(&query, year, count);
            }

            if year < years.end() && !self.options.pause.is_zero() {
                debug!(pause_ms = self.options.pause.as_millis() as u64, "Pausing before next request");
                tokio::time::sleep(self.options.pause).await;
            }
        }

        Ok(CountSeries::new(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::ScriptedProvider;
    use crate::types::AppError;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        years: Vec<(i32, u64)>,
    }

    impl ProgressObserver for Recorder {
        fn on_start(&mut self, query: &str, _years: YearRange) {
            self.started.push(query.to_string());
        }

        fn on_year(&mut self, _query: &str, year: i32, count: u64) {
            self.years.push((year, count));
        }
    }

    fn options(exact_phrase: bool, verbose: bool) -> QueryOptions {
        QueryOptions {
            exact_phrase,
            field: None,
            pause: Duration::ZERO,
            verbose,
        }
    }

    #[tokio::test]
    async fn test_collects_one_count_per_year_in_order() {
        let provider = Arc::new(ScriptedProvider::new(|_, year| Ok((year - 1999) as u64)));
        let collector = YearlyCountCollector::new(Box::new(provider.clone()), options(false, false));
        let term = SearchTerm::new("fart").unwrap();
        let years = YearRange::new(2000, 2004).unwrap();

        let series = collector.collect(&term, years).await.unwrap();

        assert_eq!(series.len(), years.len());
        assert_eq!(series.values(), &[1, 2, 3, 4, 5]);
        let queried: Vec<i32> = provider.calls().iter().map(|(_, y, _)| *y).collect();
        assert_eq!(queried, vec![2000, 2001, 2002, 2003, 2004]);
    }

    #[tokio::test]
    async fn test_exact_phrase_quotes_term_and_field_is_forwarded() {
        let provider = Arc::new(ScriptedProvider::new(|_, _| Ok(1)));
        let mut opts = options(true, false);
        opts.field = Some("tiab".to_string());
        let collector = YearlyCountCollector::new(Box::new(provider.clone()), opts);
        let term = SearchTerm::new("prefrontal cortex").unwrap();

        collector.collect(&term, YearRange::new(2000, 2000).unwrap()).await.unwrap();

        assert_eq!(
            provider.calls(),
            vec![("\"prefrontal cortex\"".to_string(), 2000, Some("tiab".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_first_failure_stops_collection() {
        let provider = Arc::new(ScriptedProvider::new(|term, year| {
            if year == 2002 {
                Err(AppError::parse("Scripted", term, year, "no count"))
            } else {
                Ok(10)
            }
        }));
        let collector = YearlyCountCollector::new(Box::new(provider.clone()), options(false, false));
        let term = SearchTerm::new("banana").unwrap();

        let err = collector
            .collect(&term, YearRange::new(2000, 2005).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.year(), Some(2002));
        let queried: Vec<i32> = provider.calls().iter().map(|(_, y, _)| *y).collect();
        assert_eq!(queried, vec![2000, 2001, 2002]);
    }

    #[tokio::test]
    async fn test_verbose_reports_each_year() {
        let provider = ScriptedProvider::new(|_, year| Ok(year as u64 % 100));
        let collector = YearlyCountCollector::new(Box::new(provider), options(true, true));
        let term = SearchTerm::new("banana").unwrap();
        let mut recorder = Recorder::default();

        collector
            .collect_with(&term, YearRange::new(2010, 2012).unwrap(), &mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.started, vec!["\"banana\"".to_string()]);
        assert_eq!(recorder.years, vec![(2010, 10), (2011, 11), (2012, 12)]);
    }

    #[tokio::test]
    async fn test_quiet_run_skips_observer() {
        let collector =
            YearlyCountCollector::new(Box::new(ScriptedProvider::new(|_, _| Ok(3))), options(true, false));
        let mut recorder = Recorder::default();

        collector
            .collect_with(&SearchTerm::new("banana").unwrap(), YearRange::new(2010, 2011).unwrap(), &mut recorder)
            .await
            .unwrap();

        assert!(recorder.started.is_empty());
        assert!(recorder.years.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_between_requests_but_not_after_last() {
        let mut opts = options(false, false);
        opts.pause = Duration::from_secs(2);
        let collector = YearlyCountCollector::new(Box::new(ScriptedProvider::new(|_, _| Ok(0))), opts);
        let start = tokio::time::Instant::now();

        collector
            .collect(&SearchTerm::new("banana").unwrap(), YearRange::new(2000, 2002).unwrap())
            .await
            .unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }
}
