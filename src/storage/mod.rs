//! Results storage (delimited text)
//!
//! Layout, comma separated by default and tab separated for `.tsv` files:
//!
//! ```text
//! year,fart,banana
//! year,target,comparison
//! 2000,1,10
//! 2001,2,20
//! ```
//!
//! The first row names the terms, the second tags each column with its role,
//! and every further row holds one year's counts.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::info;

use crate::models::{CountSeries, ResultSet, SearchTerm, TermRole, YearRange};
use crate::types::{AppError, AppResult};

const YEAR_COLUMN: &str = "year";

/// Delimiter implied by the file extension.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Write `results` to `path`, appending `.csv` when the path has no
/// extension. Returns the path written.
pub fn write_results(path: &Path, results: &ResultSet) -> AppResult<PathBuf> {
    let path = if path.extension().is_none() {
        path.with_extension("csv")
    } else {
        path.to_path_buf()
    };

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter_for(&path))
        .has_headers(false)
        .from_path(&path)?;

    let mut header = vec![YEAR_COLUMN.to_string()];
    let mut roles = vec![YEAR_COLUMN.to_string()];
    for (role, term, _) in results.columns() {
        header.push(term.to_string());
        roles.push(role.to_string());
    }
    writer.write_record(&header)?;
    writer.write_record(&roles)?;

    for (i, year) in results.years().iter().enumerate() {
        let mut row = vec![year.to_string()];
        row.extend(
            results
                .columns()
                .map(|(_, _, series)| series.get(i).unwrap_or_default().to_string()),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), years = results.years().len(), "Results written");
    Ok(path)
}

/// Read a results file. The delimiter follows the extension unless given.
pub fn load_results(path: &Path, delimiter: Option<u8>) -> AppResult<ResultSet> {
    if !path.is_file() {
        return Err(AppError::InvalidInput(format!(
            "could not find file at path {}",
            path.display()
        )));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter.unwrap_or_else(|| delimiter_for(path)))
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let header = next_header(&mut records, "term header")?;
    let roles = next_header(&mut records, "role header")?;

    let year_index = roles
        .iter()
        .position(|tag| tag == YEAR_COLUMN)
        .ok_or_else(|| AppError::Format("could not find the year column in the second header".to_string()))?;

    // (column, role, term); columns with other tags are skipped.
    let mut columns = Vec::new();
    for (index, tag) in roles.iter().enumerate() {
        if let Some(role) = TermRole::from_tag(tag) {
            let name = header
                .get(index)
                .ok_or_else(|| AppError::Format(format!("no term name for column {}", index + 1)))?;
            let term = SearchTerm::new(name)
                .map_err(|_| AppError::Format(format!("empty term name in column {}", index + 1)))?;
            columns.push((index, role, term));
        }
    }

    let mut years = Vec::new();
    let mut counts: Vec<Vec<u64>> = vec![Vec::new(); columns.len()];
    for (line, record) in records.enumerate() {
        let record = record?;
        let line = line + 3;
        years.push(parse_field::<i32>(&record, year_index, line)?);
        for (slot, (index, _, _)) in counts.iter_mut().zip(&columns) {
            slot.push(parse_field::<u64>(&record, *index, line)?);
        }
    }

    let range = year_range(&years)?;

    let mut targets = Vec::new();
    let mut comparisons = Vec::new();
    for ((_, role, term), values) in columns.into_iter().zip(counts) {
        let entry = (term, CountSeries::new(values));
        match role {
            TermRole::Target => targets.push(entry),
            TermRole::Comparison => comparisons.push(entry),
        }
    }

    let results = ResultSet::from_parts(range, targets, comparisons)?;
    info!(
        path = %path.display(),
        targets = results.targets().len(),
        comparisons = results.comparisons().len(),
        "Results loaded"
    );
    Ok(results)
}

fn next_header(
    records: &mut csv::StringRecordsIter<'_, std::fs::File>,
    what: &str,
) -> AppResult<StringRecord> {
    match records.next() {
        Some(record) => Ok(record?),
        None => Err(AppError::Format(format!("missing {}", what))),
    }
}

fn parse_field<T: std::str::FromStr>(record: &StringRecord, index: usize, line: usize) -> AppResult<T> {
    let raw = record
        .get(index)
        .ok_or_else(|| AppError::Format(format!("line {} has no column {}", line, index + 1)))?;
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::Format(format!("line {}: '{}' is not a valid number", line, raw)))
}

/// The rows must cover consecutive ascending years.
fn year_range(years: &[i32]) -> AppResult<YearRange> {
    let (Some(&first), Some(&last)) = (years.first(), years.last()) else {
        return Err(AppError::Format("file contains no years".to_string()));
    };
    let contiguous = years
        .iter()
        .enumerate()
        .all(|(i, &y)| i64::from(y) == i64::from(first) + i as i64);
    if !contiguous {
        return Err(AppError::Format(
            "years must be consecutive and in ascending order".to_string(),
        ));
    }
    YearRange::new(first, last)
}
