//! Group-by statistics over labeled reviews.

use std::collections::HashMap;
use thiserror::Error;

use crate::sentiment::{LabeledReview, Sentiment};

/// Products need at least this many reviews to enter the negative-ratio ranking
pub const MIN_REVIEWS_FOR_RANKING: usize = 5;
pub const TOP_PRODUCTS_BY_VOLUME: usize = 10;
pub const RANKING_TABLE_ROWS: usize = 10;
pub const KEYWORD_PRODUCTS: usize = 5;

#[derive(Error, Debug, PartialEq)]
pub enum AggregateError {
    #[error("the data has no product name column")]
    NoProductColumn,
    #[error("no product has at least {min_reviews} reviews")]
    NoQualifyingProducts { min_reviews: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

/// Sentiment counts for one product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSentimentCounts {
    pub product: String,
    pub counts: SentimentCounts,
}

impl ProductSentimentCounts {
    pub fn total(&self) -> usize {
        self.counts.total()
    }
}

/// Ranking row for the negative-ratio report
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub product: String,
    pub total: usize,
    pub negative: usize,
    pub negative_ratio: f64,
}

pub fn sentiment_distribution(reviews: &[LabeledReview]) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for r in reviews {
        counts.add(r.sentiment);
    }
    counts
}

/// Number of reviews per distinct rating, ascending by rating.
pub fn rating_distribution(reviews: &[LabeledReview]) -> Vec<(f64, usize)> {
    let mut ratings: Vec<f64> = reviews.iter().filter_map(|r| r.review.rating).collect();
    ratings.sort_by(|a, b| a.total_cmp(b));

    let mut out: Vec<(f64, usize)> = Vec::new();
    for rating in ratings {
        match out.last_mut() {
            Some((value, count)) if *value == rating => *count += 1,
            _ => out.push((rating, 1)),
        }
    }
    out
}

/// Ratings grouped by label, in the fixed label order.
pub fn ratings_by_sentiment(reviews: &[LabeledReview]) -> Vec<(Sentiment, Vec<f64>)> {
    Sentiment::ORDER
        .iter()
        .map(|&s| {
            let ratings = reviews
                .iter()
                .filter(|r| r.sentiment == s)
                .filter_map(|r| r.review.rating)
                .collect();
            (s, ratings)
        })
        .collect()
}

pub fn mean_rating_by_sentiment(reviews: &[LabeledReview]) -> Vec<(Sentiment, Option<f64>)> {
    ratings_by_sentiment(reviews)
        .into_iter()
        .map(|(s, ratings)| {
            let mean = if ratings.is_empty() {
                None
            } else {
                Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
            };
            (s, mean)
        })
        .collect()
}

/// Pearson correlation between star rating and polarity.
///
/// Only reviews that have both values take part. Returns `None` with fewer
/// than two pairs or when either side has zero variance.
pub fn rating_polarity_correlation(reviews: &[LabeledReview]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = reviews
        .iter()
        .filter_map(|r| Some((r.review.rating?, r.polarity?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Per-product sentiment counts in order of first appearance. Reviews
/// without a product name are skipped.
pub fn product_sentiment_counts(reviews: &[LabeledReview]) -> Vec<ProductSentimentCounts> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<ProductSentimentCounts> = Vec::new();

    for r in reviews {
        let Some(product) = r.review.product.as_deref() else {
            continue;
        };
        let i = *index.entry(product).or_insert_with(|| {
            out.push(ProductSentimentCounts {
                product: product.to_string(),
                counts: SentimentCounts::default(),
            });
            out.len() - 1
        });
        out[i].counts.add(r.sentiment);
    }
    out
}

/// The `n` most-reviewed products, whatever their sentiment mix.
/// Equal totals keep first-appearance order.
pub fn top_products_by_volume(
    counts: &[ProductSentimentCounts],
    n: usize,
) -> Vec<ProductSentimentCounts> {
    let mut sorted = counts.to_vec();
    sorted.sort_by(|a, b| b.total().cmp(&a.total()));
    sorted.truncate(n);
    sorted
}

/// Products with at least `min_reviews` reviews, highest negative ratio first.
/// Equal ratios keep first-appearance order.
pub fn negative_ratio_ranking(
    counts: &[ProductSentimentCounts],
    min_reviews: usize,
) -> Result<Vec<ProductSummary>, AggregateError> {
    let mut ranking: Vec<ProductSummary> = counts
        .iter()
        .filter(|c| c.total() >= min_reviews)
        .map(|c| ProductSummary {
            product: c.product.clone(),
            total: c.total(),
            negative: c.counts.negative,
            negative_ratio: c.counts.negative as f64 / c.total() as f64,
        })
        .collect();

    if ranking.is_empty() {
        return Err(AggregateError::NoQualifyingProducts { min_reviews });
    }

    ranking.sort_by(|a, b| b.negative_ratio.total_cmp(&a.negative_ratio));
    Ok(ranking)
}

pub fn format_ratio(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Review texts with the given label joined by single spaces.
pub fn concatenated_text(reviews: &[LabeledReview], sentiment: Sentiment) -> String {
    reviews
        .iter()
        .filter(|r| r.sentiment == sentiment)
        .map(|r| r.review.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn negative_texts_for<'a>(reviews: &'a [LabeledReview], product: &str) -> Vec<&'a str> {
    reviews
        .iter()
        .filter(|r| {
            r.sentiment == Sentiment::Negative && r.review.product.as_deref() == Some(product)
        })
        .map(|r| r.review.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Review;

    fn labeled(product: Option<&str>, rating: Option<f64>, sentiment: Sentiment) -> LabeledReview {
        let polarity = match sentiment {
            Sentiment::Positive => 0.5,
            Sentiment::Neutral => 0.0,
            Sentiment::Negative => -0.5,
        };
        LabeledReview {
            review: Review::new(&format!("{} review", sentiment), rating, product),
            polarity: Some(polarity),
            sentiment,
        }
    }

    fn many(product: &str, sentiment: Sentiment, n: usize) -> Vec<LabeledReview> {
        (0..n).map(|_| labeled(Some(product), None, sentiment)).collect()
    }

    #[test]
    fn test_sentiment_distribution() {
        let reviews = vec![
            labeled(None, None, Sentiment::Positive),
            labeled(None, None, Sentiment::Positive),
            labeled(None, None, Sentiment::Negative),
        ];
        let counts = sentiment_distribution(&reviews);
        assert_eq!(counts.positive, 2);
        assert_eq!(counts.neutral, 0);
        assert_eq!(counts.negative, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_rating_distribution_sorted_and_grouped() {
        let reviews = vec![
            labeled(None, Some(5.0), Sentiment::Positive),
            labeled(None, Some(1.0), Sentiment::Negative),
            labeled(None, None, Sentiment::Neutral),
            labeled(None, Some(5.0), Sentiment::Positive),
            labeled(None, Some(3.0), Sentiment::Neutral),
        ];
        assert_eq!(
            rating_distribution(&reviews),
            vec![(1.0, 1), (3.0, 1), (5.0, 2)]
        );
    }

    #[test]
    fn test_ratings_by_sentiment_uses_fixed_order() {
        let reviews = vec![
            labeled(None, Some(1.0), Sentiment::Negative),
            labeled(None, Some(5.0), Sentiment::Positive),
            labeled(None, Some(4.0), Sentiment::Positive),
        ];
        let grouped = ratings_by_sentiment(&reviews);
        assert_eq!(grouped[0], (Sentiment::Positive, vec![5.0, 4.0]));
        assert_eq!(grouped[1], (Sentiment::Neutral, vec![]));
        assert_eq!(grouped[2], (Sentiment::Negative, vec![1.0]));

        let means = mean_rating_by_sentiment(&reviews);
        assert_eq!(means[0], (Sentiment::Positive, Some(4.5)));
        assert_eq!(means[1], (Sentiment::Neutral, None));
    }

    #[test]
    fn test_rating_polarity_correlation() {
        let reviews = vec![
            labeled(None, Some(5.0), Sentiment::Positive),
            labeled(None, Some(3.0), Sentiment::Neutral),
            labeled(None, Some(1.0), Sentiment::Negative),
        ];
        let r = rating_polarity_correlation(&reviews).unwrap();
        assert!((r - 1.0).abs() < 1e-9);

        let flat = vec![
            labeled(None, Some(4.0), Sentiment::Positive),
            labeled(None, Some(4.0), Sentiment::Negative),
        ];
        assert_eq!(rating_polarity_correlation(&flat), None);
        assert_eq!(rating_polarity_correlation(&flat[..1]), None);
    }

    #[test]
    fn test_product_counts_skip_missing_names() {
        let reviews = vec![
            labeled(Some("Kindle"), None, Sentiment::Positive),
            labeled(None, None, Sentiment::Negative),
            labeled(Some("Echo"), None, Sentiment::Negative),
            labeled(Some("Kindle"), None, Sentiment::Neutral),
        ];
        let counts = product_sentiment_counts(&reviews);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].product, "Kindle");
        assert_eq!(counts[0].total(), 2);
        assert_eq!(counts[1].product, "Echo");
        assert_eq!(counts[1].counts.negative, 1);
    }

    #[test]
    fn test_top_products_ignore_sentiment() {
        let mut reviews = Vec::new();
        for i in 0..11 {
            reviews.extend(many(&format!("P{}", i), Sentiment::Negative, 2));
        }
        reviews.extend(many("A", Sentiment::Neutral, 40));
        reviews.extend(many("A", Sentiment::Positive, 10));

        let counts = product_sentiment_counts(&reviews);
        let top = top_products_by_volume(&counts, TOP_PRODUCTS_BY_VOLUME);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].product, "A");
        assert_eq!(top[0].counts.negative, 0);
        assert_eq!(top[0].total(), 50);
        // ties keep first-appearance order, so P10 falls off
        assert_eq!(top[9].product, "P8");
    }

    #[test]
    fn test_ranking_threshold_and_ratio() {
        let mut reviews = many("Four", Sentiment::Negative, 4);
        reviews.extend(many("Five", Sentiment::Negative, 3));
        reviews.extend(many("Five", Sentiment::Positive, 2));

        let counts = product_sentiment_counts(&reviews);
        let ranking = negative_ratio_ranking(&counts, MIN_REVIEWS_FOR_RANKING).unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].product, "Five");
        assert_eq!(ranking[0].total, 5);
        assert_eq!(ranking[0].negative, 3);
        assert_eq!(format_ratio(ranking[0].negative_ratio), "60.0%");
    }

    #[test]
    fn test_ranking_sorted_desc_and_stable() {
        let mut reviews = many("Calm", Sentiment::Positive, 5);
        reviews.extend(many("TieA", Sentiment::Negative, 1));
        reviews.extend(many("TieA", Sentiment::Positive, 4));
        reviews.extend(many("Worst", Sentiment::Negative, 5));
        reviews.extend(many("TieB", Sentiment::Negative, 2));
        reviews.extend(many("TieB", Sentiment::Neutral, 8));

        let counts = product_sentiment_counts(&reviews);
        let ranking = negative_ratio_ranking(&counts, MIN_REVIEWS_FOR_RANKING).unwrap();
        let names: Vec<&str> = ranking.iter().map(|p| p.product.as_str()).collect();
        assert_eq!(names, vec!["Worst", "TieA", "TieB", "Calm"]);
        assert_eq!(format_ratio(ranking[0].negative_ratio), "100.0%");
        assert_eq!(format_ratio(ranking[3].negative_ratio), "0.0%");
    }

    #[test]
    fn test_ranking_without_qualifying_products() {
        let reviews = many("Small", Sentiment::Negative, 4);
        let counts = product_sentiment_counts(&reviews);
        let err = negative_ratio_ranking(&counts, MIN_REVIEWS_FOR_RANKING).unwrap_err();
        assert_eq!(err, AggregateError::NoQualifyingProducts { min_reviews: 5 });
    }

    #[test]
    fn test_format_ratio_rounds_to_one_decimal() {
        assert_eq!(format_ratio(1.0 / 3.0), "33.3%");
        assert_eq!(format_ratio(2.0 / 3.0), "66.7%");
    }

    #[test]
    fn test_text_selection() {
        let reviews = vec![
            LabeledReview {
                review: Review::new("screen cracked", None, Some("Fire")),
                polarity: Some(-0.4),
                sentiment: Sentiment::Negative,
            },
            LabeledReview {
                review: Review::new("lovely screen", None, Some("Fire")),
                polarity: Some(0.8),
                sentiment: Sentiment::Positive,
            },
            LabeledReview {
                review: Review::new("battery died", None, Some("Echo")),
                polarity: Some(-0.6),
                sentiment: Sentiment::Negative,
            },
        ];
        assert_eq!(negative_texts_for(&reviews, "Fire"), vec!["screen cracked"]);
        assert_eq!(
            concatenated_text(&reviews, Sentiment::Negative),
            "screen cracked battery died"
        );
        assert_eq!(concatenated_text(&reviews, Sentiment::Neutral), "");
    }
}
