//! CSV review loader.
//!
//! Reads an export with a required `reviews.text` column and optional
//! `reviews.rating` and `name` columns. Rows without review text are dropped.

use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const TEXT_COLUMN: &str = "reviews.text";
pub const RATING_COLUMN: &str = "reviews.rating";
pub const PRODUCT_COLUMN: &str = "name";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("input file {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("column '{0}' not found in the data")]
    MissingColumn(&'static str),
    #[error("no review rows left after dropping rows without text")]
    Empty,
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One review row
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub text: String,
    pub rating: Option<f64>,
    pub product: Option<String>,
}

#[cfg(test)]
impl Review {
    pub fn new(text: &str, rating: Option<f64>, product: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            rating,
            product: product.map(str::to_string),
        }
    }
}

/// Raw CSV row; every column is optional so that blank cells survive
/// deserialization and get filtered afterwards.
#[derive(Debug, Deserialize)]
struct ReviewRow {
    #[serde(rename = "reviews.text", default)]
    text: Option<String>,
    #[serde(rename = "reviews.rating", default, deserialize_with = "csv::invalid_option")]
    rating: Option<f64>,
    #[serde(rename = "name", default)]
    product: Option<String>,
}

/// Loaded reviews in input order
#[derive(Debug, Clone)]
pub struct ReviewTable {
    pub reviews: Vec<Review>,
    /// Whether the header carried a rating column
    pub has_ratings: bool,
    /// Whether the header carried a product-name column
    pub has_products: bool,
    /// Rows dropped for missing or blank text
    pub dropped: usize,
}

impl ReviewTable {
    pub fn len(&self) -> usize {
        self.reviews.len()
    }
}

/// Loads and cleans the review export at `path`.
pub fn load_reviews(path: &Path) -> Result<ReviewTable, LoadError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    let has_column = |name: &str| headers.iter().any(|h| h == name);

    if !has_column(TEXT_COLUMN) {
        return Err(LoadError::MissingColumn(TEXT_COLUMN));
    }
    let has_ratings = has_column(RATING_COLUMN);
    let has_products = has_column(PRODUCT_COLUMN);

    let mut reviews = Vec::new();
    let mut dropped = 0;

    for row in rdr.deserialize::<ReviewRow>() {
        let row = row?;
        let text = match row.text {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                dropped += 1;
                continue;
            }
        };

        reviews.push(Review {
            text,
            rating: row.rating.filter(|r| r.is_finite()),
            product: row.product.filter(|p| !p.trim().is_empty()),
        });
    }

    debug!("Dropped {} rows without review text", dropped);

    if reviews.is_empty() {
        return Err(LoadError::Empty);
    }

    info!(
        "Loaded {} reviews from {} (ratings: {}, products: {})",
        reviews.len(),
        path.display(),
        has_ratings,
        has_products
    );

    Ok(ReviewTable {
        reviews,
        has_ratings,
        has_products,
        dropped,
    })
}
