// Oxidized Biblio - yearly publication counts, normalized against comparison terms

pub mod config;
pub mod types;
pub mod models;
pub mod search;    // PubMed and Google Scholar count providers
pub mod collector;
pub mod analysis;  // Normalization and charts
pub mod storage;   // CSV/TSV results files
pub mod pipeline;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::{CountSeries, ResultSet, SearchTerm, TermRole, YearRange};
pub use pipeline::{compute_yearly_citations, CitationRequest};
pub use types::{AppError, AppResult};
