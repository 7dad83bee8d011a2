//! The analysis run.
//!
//! Steps execute in order on a single thread:
//! 1. Load and clean the CSV export
//! 2. Label every review
//! 3. Independent chart and report sections, each guarded so that one
//!    failure is reported and the next section still runs

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::aggregate::{self, AggregateError, ProductSummary};
use crate::charts;
use crate::config::Settings;
use crate::loader::{load_reviews, ReviewTable};
use crate::report;
use crate::sentiment::{label_reviews, LabeledReview, LexiconScorer, Sentiment};
use crate::wordcloud::{self, WordCloudConfig};

/// What a run produced, for the final log line and for tests.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reviews: usize,
    pub charts: Vec<PathBuf>,
    /// Sections or charts that failed and were skipped
    pub failures: Vec<String>,
    pub ranking: Vec<ProductSummary>,
}

impl RunSummary {
    /// Runs one guarded step: errors are reported and recorded, never returned.
    fn guarded<F>(&mut self, what: &str, step: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        match step(self) {
            Ok(()) => true,
            Err(e) => {
                error!("{} failed: {:#}", what, e);
                report::failure(&format!("Error while creating the {}: {:#}", what, e));
                self.failures.push(what.to_string());
                false
            }
        }
    }

    /// Renders one chart into `dir`, unless chart output is disabled.
    fn chart<F>(&mut self, dir: Option<&Path>, what: &str, file_name: &str, draw: F)
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let Some(dir) = dir else {
            return;
        };
        let path = dir.join(file_name);
        let ok = self.guarded(what, |_| draw(&path));
        if ok {
            info!("📊 {} saved to {}", what, path.display());
            self.charts.push(path);
        }
    }
}

/// File-name friendly form of a product name
fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed: String = out.trim_end_matches('-').chars().take(40).collect();
    trimmed.trim_end_matches('-').to_string()
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Runs the whole analysis. Only loading and output-directory errors are
/// returned; everything after that is guarded per section.
pub fn run(settings: &Settings) -> Result<RunSummary> {
    report::status(&format!("Reading {}...", settings.input.display()));
    let table = load_reviews(&settings.input)?;
    if table.dropped > 0 {
        report::note(&format!("Skipped {} rows without review text", table.dropped));
    }

    let chart_dir = if settings.no_charts {
        None
    } else {
        fs::create_dir_all(&settings.output_dir).with_context(|| {
            format!("failed to create output directory {}", settings.output_dir.display())
        })?;
        Some(settings.output_dir.as_path())
    };

    report::status("Analyzing sentiment...");
    let reviews = label_reviews(&LexiconScorer::new(), &table);

    let mut summary = RunSummary {
        reviews: table.len(),
        ..Default::default()
    };

    sentiment_section(&mut summary, chart_dir, &reviews);
    if table.has_ratings {
        rating_section(&mut summary, chart_dir, &reviews);
    }
    top_products_section(&mut summary, chart_dir, &table, &reviews);
    keyword_section(&mut summary, chart_dir, &reviews);
    negative_breakdown_section(&mut summary, chart_dir, &table, &reviews);

    report::banner("🎉 ANALYSIS COMPLETE!");
    info!(
        "Run finished: {} reviews, {} charts, {} failed steps",
        summary.reviews,
        summary.charts.len(),
        summary.failures.len()
    );
    Ok(summary)
}

fn sentiment_section(summary: &mut RunSummary, dir: Option<&Path>, reviews: &[LabeledReview]) {
    report::heading("SENTIMENT DISTRIBUTION");
    let counts = aggregate::sentiment_distribution(reviews);
    for s in Sentiment::ORDER {
        println!(
            "  {:<9} {:>7} ({:.1}%)",
            s.as_str(),
            counts.get(s),
            percent(counts.get(s), counts.total())
        );
    }

    summary.chart(dir, "sentiment distribution chart", "sentiment_distribution.png", |path| {
        charts::sentiment_distribution(path, &counts)
    });
}

fn rating_section(summary: &mut RunSummary, dir: Option<&Path>, reviews: &[LabeledReview]) {
    report::heading("STAR RATING ANALYSIS");

    for (s, mean) in aggregate::mean_rating_by_sentiment(reviews) {
        match mean {
            Some(m) => println!("  {:<9} mean rating {:.2}", s.as_str(), m),
            None => println!("  {:<9} no rated reviews", s.as_str()),
        }
    }
    match aggregate::rating_polarity_correlation(reviews) {
        Some(r) => println!("  Rating vs polarity correlation: r = {:.2}", r),
        None => report::note("  Not enough rated reviews for a rating/polarity correlation"),
    }

    summary.chart(dir, "rating distribution chart", "rating_distribution.png", |path| {
        charts::rating_distribution(path, &aggregate::rating_distribution(reviews))
    });
    summary.chart(dir, "rating by sentiment chart", "rating_by_sentiment.png", |path| {
        charts::rating_by_sentiment(path, &aggregate::ratings_by_sentiment(reviews))
    });
}

fn top_products_section(
    summary: &mut RunSummary,
    dir: Option<&Path>,
    table: &ReviewTable,
    reviews: &[LabeledReview],
) {
    report::heading("TOP PRODUCTS");
    summary.guarded("top products analysis", |summary| {
        if !table.has_products {
            return Err(AggregateError::NoProductColumn.into());
        }
        let counts = aggregate::product_sentiment_counts(reviews);
        let top = aggregate::top_products_by_volume(&counts, aggregate::TOP_PRODUCTS_BY_VOLUME);
        for p in &top {
            println!(
                "  {:<40} {:>5} reviews ({} positive, {} negative)",
                p.product,
                p.total(),
                p.counts.positive,
                p.counts.negative
            );
        }
        summary.chart(dir, "top products chart", "top_products_sentiment.png", |path| {
            charts::top_products(path, &top)
        });
        Ok(())
    });
}

fn keyword_section(summary: &mut RunSummary, dir: Option<&Path>, reviews: &[LabeledReview]) {
    report::heading("KEYWORD OVERVIEW");
    let config = WordCloudConfig::default();

    for (sentiment, file_name, title) in [
        (Sentiment::Positive, "wordcloud_positive.png", "Common words in positive reviews"),
        (Sentiment::Negative, "wordcloud_negative.png", "Common words in negative reviews"),
    ] {
        let text = aggregate::concatenated_text(reviews, sentiment);
        let label = sentiment.as_str().to_lowercase();
        if text.trim().is_empty() {
            report::note(&format!("  No {} reviews, skipping keyword cloud", label));
            continue;
        }
        let what = format!("{} keyword cloud", label);
        summary.chart(dir, &what, file_name, |path| {
            wordcloud::render(path, title, &text, &config).map(|_| ())
        });
    }
}

fn negative_breakdown_section(
    summary: &mut RunSummary,
    dir: Option<&Path>,
    table: &ReviewTable,
    reviews: &[LabeledReview],
) {
    report::banner("NEGATIVE REVIEW BREAKDOWN");

    let ranked = summary.guarded("negative ratio ranking", |summary| {
        if !table.has_products {
            return Err(AggregateError::NoProductColumn.into());
        }
        let counts = aggregate::product_sentiment_counts(reviews);
        summary.ranking =
            aggregate::negative_ratio_ranking(&counts, aggregate::MIN_REVIEWS_FOR_RANKING)?;
        Ok(())
    });
    if !ranked {
        return;
    }

    report::heading(&format!(
        "TOP {} PRODUCTS BY NEGATIVE REVIEW RATIO",
        aggregate::RANKING_TABLE_ROWS
    ));
    report::note(&format!(
        "(only products with at least {} reviews)\n",
        aggregate::MIN_REVIEWS_FOR_RANKING
    ));
    println!("{}", report::ranking_table(&summary.ranking, aggregate::RANKING_TABLE_ROWS));

    report::heading(&format!(
        "NEGATIVE KEYWORDS FOR THE TOP {} PRODUCTS",
        aggregate::KEYWORD_PRODUCTS
    ));
    let config = WordCloudConfig::default();
    let top: Vec<String> = summary
        .ranking
        .iter()
        .take(aggregate::KEYWORD_PRODUCTS)
        .map(|p| p.product.clone())
        .collect();

    for (rank, product) in top.iter().enumerate().map(|(i, p)| (i + 1, p)) {
        let texts = aggregate::negative_texts_for(reviews, product);
        if texts.is_empty() {
            continue;
        }

        report::separator();
        report::note(&format!("#{}: {}", rank, product));
        println!("Negative reviews: {}", texts.len());
        report::separator();

        let text = texts.join(" ");
        let file_name = format!("wordcloud_negative_{}_{}.png", rank, slug(product));
        let title = format!("Negative keywords - {}", product);
        summary.chart(dir, &format!("keyword cloud for {}", product), &file_name, |path| {
            wordcloud::render(path, &title, &text, &config).map(|_| ())
        });
    }
}
