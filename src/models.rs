// Core data model: terms, year ranges, count series and the result set

use std::fmt;

use tracing::info;

use crate::collector::YearlyCountCollector;
use crate::types::{AppError, AppResult};

/// A non-empty query subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn new(term: impl Into<String>) -> AppResult<Self> {
        let term = term.into();
        if term.trim().is_empty() {
            return Err(AppError::InvalidTerm(
                "search terms cannot be empty strings".to_string(),
            ));
        }
        Ok(Self(term))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SearchTerm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Inclusive range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> AppResult<Self> {
        if start > end {
            return Err(AppError::InvalidInput(format!(
                "start year {} is after end year {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// Always false; a range holds at least one year.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }
}

/// Yearly counts for one term, in ascending year order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountSeries(Vec<u64>);

impl CountSeries {
    pub fn new(counts: Vec<u64>) -> Self {
        Self(counts)
    }

    pub fn values(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        self.0.get(index).copied()
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().map(|&c| c as f64).collect()
    }
}

impl From<Vec<u64>> for CountSeries {
    fn from(counts: Vec<u64>) -> Self {
        Self(counts)
    }
}

/// Role a term plays in a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermRole {
    Target,
    Comparison,
}

impl TermRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermRole::Target => "target",
            TermRole::Comparison => "comparison",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "target" => Some(TermRole::Target),
            "comparison" => Some(TermRole::Comparison),
            _ => None,
        }
    }
}

impl fmt::Display for TermRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yearly counts for target and comparison terms over a shared year range.
///
/// Series are stored by list position, so a term that appears in both lists
/// owns two independent series. Instances are immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    years: YearRange,
    targets: Vec<SearchTerm>,
    comparisons: Vec<SearchTerm>,
    target_series: Vec<CountSeries>,
    comparison_series: Vec<CountSeries>,
}

impl ResultSet {
    /// Assemble a result set from already collected series, checking that
    /// every term has exactly one series of the right length.
    pub fn from_parts(
        years: YearRange,
        targets: Vec<(SearchTerm, CountSeries)>,
        comparisons: Vec<(SearchTerm, CountSeries)>,
    ) -> AppResult<Self> {
        for (term, series) in targets.iter().chain(comparisons.iter()) {
            if series.len() != years.len() {
                return Err(AppError::InvalidInput(format!(
                    "series for '{}' has {} values but the range {}-{} spans {} years",
                    term,
                    series.len(),
                    years.start(),
                    years.end(),
                    years.len()
                )));
            }
        }

        let (targets, target_series) = targets.into_iter().unzip();
        let (comparisons, comparison_series) = comparisons.into_iter().unzip();

        Ok(Self {
            years,
            targets,
            comparisons,
            target_series,
            comparison_series,
        })
    }

    /// Query every target and then every comparison term, one collection per
    /// term. Terms are validated up front so a bad term costs no requests.
    pub async fn build<S: AsRef<str>>(
        targets: &[S],
        comparisons: &[S],
        years: YearRange,
        collector: &YearlyCountCollector,
    ) -> AppResult<Self> {
        if targets.is_empty() {
            return Err(AppError::InvalidInput(
                "at least one search term is required".to_string(),
            ));
        }

        let targets = validate_terms(targets)?;
        let comparisons = validate_terms(comparisons)?;

        info!(
            targets = targets.len(),
            comparisons = comparisons.len(),
            start = years.start(),
            end = years.end(),
            database = collector.provider_name(),
            "Building result set"
        );

        let mut target_pairs = Vec::with_capacity(targets.len());
        for term in targets {
            let series = collector.collect(&term, years).await?;
            target_pairs.push((term, series));
        }

        let mut comparison_pairs = Vec::with_capacity(comparisons.len());
        for term in comparisons {
            let series = collector.collect(&term, years).await?;
            comparison_pairs.push((term, series));
        }

        Self::from_parts(years, target_pairs, comparison_pairs)
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    pub fn targets(&self) -> &[SearchTerm] {
        &self.targets
    }

    pub fn comparisons(&self) -> &[SearchTerm] {
        &self.comparisons
    }

    /// Series for a term, looking at targets before comparisons.
    pub fn series_for(&self, term: &str) -> Option<&CountSeries> {
        self.target_series()
            .chain(self.comparison_series())
            .find(|(t, _)| t.as_str() == term)
            .map(|(_, s)| s)
    }

    pub fn target_series(&self) -> impl Iterator<Item = (&SearchTerm, &CountSeries)> {
        self.targets.iter().zip(self.target_series.iter())
    }

    pub fn comparison_series(&self) -> impl Iterator<Item = (&SearchTerm, &CountSeries)> {
        self.comparisons.iter().zip(self.comparison_series.iter())
    }

    /// All columns in serialization order: targets first, then comparisons.
    pub fn columns(&self) -> impl Iterator<Item = (TermRole, &SearchTerm, &CountSeries)> {
        self.target_series()
            .map(|(t, s)| (TermRole::Target, t, s))
            .chain(self.comparison_series().map(|(t, s)| (TermRole::Comparison, t, s)))
    }
}

fn validate_terms<S: AsRef<str>>(terms: &[S]) -> AppResult<Vec<SearchTerm>> {
    terms
        .iter()
        .map(|t| SearchTerm::new(t.as_ref()))
        .collect()
}
