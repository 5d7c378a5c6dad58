use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use oxidized_biblio::analysis::{plot_yearly_count, ChartConfig};
use oxidized_biblio::pipeline::{compute_yearly_citations, CitationRequest};
use oxidized_biblio::storage::load_results;
use oxidized_biblio::utils::init_logger;
use oxidized_biblio::Config;

/// Count yearly publications on PubMed or Google Scholar and compare them to bananas.
#[derive(Parser, Debug)]
#[command(name = "oxidized-biblio", version, about, long_about = None)]
struct Cli {
    /// Report each year's count; repeat for debug logging (-vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query yearly counts for one or more terms
    Fetch(FetchArgs),
    /// Plot a previously saved results file
    Plot(PlotArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Search terms to count
    #[arg(required = true)]
    terms: Vec<String>,

    /// First year (inclusive)
    #[arg(long)]
    start: i32,

    /// Last year (inclusive)
    #[arg(long)]
    end: i32,

    /// Comparison terms (defaults to "banana")
    #[arg(short, long = "compare")]
    compare: Vec<String>,

    /// Database: pubmed or scholar (defaults to BIBLIO_DATABASE or pubmed)
    #[arg(short, long)]
    database: Option<String>,

    /// Search the words separately instead of as an exact phrase
    #[arg(long)]
    no_exact_phrase: bool,

    /// PubMed field tag, e.g. word, tiab, mesh
    #[arg(long)]
    field: Option<String>,

    /// Seconds to wait between requests
    #[arg(long)]
    pause: Option<f64>,

    /// Save counts to a .csv or .tsv file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Save a chart to a .png or .svg file
    #[arg(long)]
    plot: Option<PathBuf>,

    #[command(flatten)]
    chart: ChartArgs,
}

#[derive(Args, Debug)]
struct PlotArgs {
    /// Results file written by `fetch --save`
    input: PathBuf,

    /// Output image (.png or .svg)
    #[arg(short, long)]
    output: PathBuf,

    /// Column delimiter; inferred from the extension when omitted
    #[arg(long)]
    delimiter: Option<char>,

    #[command(flatten)]
    chart: ChartArgs,
}

#[derive(Args, Debug)]
struct ChartArgs {
    /// Plot targets as a ratio of the comparison terms
    #[arg(long)]
    ratio: bool,

    /// Plot each comparison term instead of their average
    #[arg(long)]
    individual_comparisons: bool,

    /// Scale every line to its own maximum
    #[arg(long)]
    scale_to_max: bool,

    /// Figure width in inches
    #[arg(long, default_value_t = 8.0)]
    width: f64,

    /// Figure height in inches
    #[arg(long, default_value_t = 6.0)]
    height: f64,

    /// Pixels per inch
    #[arg(long, default_value_t = 100.0)]
    dpi: f64,
}

impl From<&ChartArgs> for ChartConfig {
    fn from(args: &ChartArgs) -> Self {
        ChartConfig {
            plot_ratio: args.ratio,
            plot_average_comparison: !args.individual_comparisons,
            scale_to_max: args.scale_to_max,
            figure_size: (args.width, args.height),
            dpi: args.dpi,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose.saturating_sub(1));

    let config = Config::from_env()?;

    match cli.command {
        Command::Fetch(args) => fetch(args, cli.verbose > 0, &config).await,
        Command::Plot(args) => plot(args),
    }
}

async fn fetch(args: FetchArgs, verbose: bool, config: &Config) -> anyhow::Result<()> {
    let mut request = CitationRequest::new(args.terms, args.start, args.end, config)?;
    if !args.compare.is_empty() {
        request.comparison_terms = args.compare;
    }
    if let Some(database) = args.database {
        request.database = database.parse()?;
    }
    if args.no_exact_phrase {
        request.exact_phrase = false;
    }
    if let Some(field) = args.field {
        request.field = Some(field);
    }
    if let Some(pause) = args.pause {
        request.pause_secs = pause;
    }
    request.verbose = verbose;
    request.save_to = args.save;
    request.plot_to = args.plot;
    request.chart = ChartConfig::from(&args.chart);

    info!(database = %request.database, terms = ?request.search_terms, "Fetching yearly counts");
    let results = compute_yearly_citations(&request, config).await?;

    for (role, term, series) in results.columns() {
        println!("{} ({}): {:?}", term, role, series.values());
    }
    Ok(())
}

fn plot(args: PlotArgs) -> anyhow::Result<()> {
    let delimiter = match args.delimiter {
        Some(c) if c.is_ascii() => Some(c as u8),
        Some(c) => anyhow::bail!("delimiter '{}' must be a single ASCII character", c),
        None => None,
    };

    let results = load_results(&args.input, delimiter)?;
    let written = plot_yearly_count(&results, &ChartConfig::from(&args.chart), &args.output)?;
    println!("Chart saved to {}", written.display());
    Ok(())
}
