use clap::Parser;
use std::path::PathBuf;

/// Command-line settings. Each flag falls back to an environment variable,
/// which may come from a `.env` file.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Sentiment report for product review CSV exports")]
pub struct Settings {
    /// CSV export with a `reviews.text` column
    #[arg(short, long, env = "REVIEWS_CSV", default_value = "data.csv")]
    pub input: PathBuf,

    /// Directory the chart images are written to
    #[arg(short, long, env = "CHART_OUTPUT_DIR", default_value = "charts")]
    pub output_dir: PathBuf,

    /// Print the console report only, without rendering charts
    #[arg(long, env = "SKIP_CHARTS")]
    pub no_charts: bool,
}
