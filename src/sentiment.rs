//! Lexicon-based sentiment classification for review text.
//!
//! Each review is scored with a polarity in [-1, 1] and mapped to a label:
//! - polarity above `POSITIVE_THRESHOLD` is Positive
//! - polarity below `NEGATIVE_THRESHOLD` is Negative
//! - anything else, including a scorer failure, is Neutral
//!
//! The scorer averages the polarity of the opinion words it finds. A preceding
//! intensifier ("very", "extremely") scales a word, and a negation within a
//! short window ("not", "never", "doesn't") flips and dampens it.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::loader::{Review, ReviewTable};
use crate::text::tokenize;

pub const POSITIVE_THRESHOLD: f64 = 0.1;
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Tokens after a negation that it still applies to
const NEGATION_WINDOW: usize = 3;
const NEGATION_FACTOR: f64 = -0.5;

// Opinion words with their polarity
static POLARITY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    vec![
        // strongly positive
        ("excellent", 1.0),
        ("perfect", 1.0),
        ("awesome", 1.0),
        ("best", 1.0),
        ("outstanding", 0.9),
        ("superb", 0.9),
        ("fantastic", 0.9),
        ("amazing", 0.9),
        ("wonderful", 0.9),
        ("incredible", 0.9),
        ("flawless", 0.9),
        ("brilliant", 0.9),
        ("great", 0.8),
        ("happy", 0.8),
        ("impressive", 0.8),
        ("delighted", 0.8),
        ("exceptional", 0.8),
        ("beautiful", 0.8),
        ("terrific", 0.8),
        ("lovely", 0.8),
        // moderately positive
        ("good", 0.7),
        ("pleased", 0.7),
        ("satisfied", 0.6),
        ("nice", 0.6),
        ("recommend", 0.6),
        ("recommended", 0.6),
        ("reliable", 0.6),
        ("sturdy", 0.5),
        ("love", 0.5),
        ("loved", 0.5),
        ("loves", 0.5),
        ("enjoy", 0.5),
        ("enjoyed", 0.5),
        ("better", 0.5),
        ("fun", 0.5),
        ("helpful", 0.5),
        ("comfortable", 0.5),
        ("worth", 0.4),
        ("works", 0.3),
        ("easy", 0.43),
        ("useful", 0.4),
        ("solid", 0.4),
        ("cheap", 0.4),
        ("clear", 0.3),
        ("fast", 0.3),
        ("quick", 0.3),
        ("smooth", 0.4),
        ("convenient", 0.4),
        ("durable", 0.5),
        ("bright", 0.4),
        ("fine", 0.4),
        ("handy", 0.4),
        ("favorite", 0.5),
        ("affordable", 0.4),
        ("responsive", 0.4),
        ("simple", 0.2),
        ("glad", 0.5),
        ("thanks", 0.2),
        ("value", 0.2),
        // strongly negative
        ("terrible", -1.0),
        ("horrible", -1.0),
        ("awful", -1.0),
        ("worst", -1.0),
        ("useless", -0.9),
        ("garbage", -0.9),
        ("junk", -0.8),
        ("pathetic", -0.9),
        ("disappointing", -0.8),
        ("disappointed", -0.75),
        ("hate", -0.8),
        ("hated", -0.8),
        ("defective", -0.8),
        ("worthless", -0.9),
        ("dead", -0.6),
        ("scam", -0.9),
        // moderately negative
        ("bad", -0.7),
        ("poor", -0.6),
        ("poorly", -0.6),
        ("broken", -0.5),
        ("broke", -0.4),
        ("waste", -0.5),
        ("wasted", -0.5),
        ("worse", -0.6),
        ("annoying", -0.6),
        ("frustrating", -0.6),
        ("frustrated", -0.6),
        ("unhappy", -0.6),
        ("faulty", -0.6),
        ("cheaply", -0.4),
        ("flimsy", -0.5),
        ("slow", -0.3),
        ("difficult", -0.5),
        ("hard", -0.3),
        ("problem", -0.3),
        ("problems", -0.3),
        ("issue", -0.25),
        ("issues", -0.25),
        ("fail", -0.5),
        ("failed", -0.5),
        ("fails", -0.5),
        ("stopped", -0.3),
        ("crashes", -0.5),
        ("crashed", -0.5),
        ("freezes", -0.5),
        ("confusing", -0.5),
        ("expensive", -0.5),
        ("overpriced", -0.6),
        ("noisy", -0.4),
        ("weak", -0.4),
        ("wrong", -0.5),
        ("unreliable", -0.6),
        ("refund", -0.3),
        ("returned", -0.3),
        ("sad", -0.5),
        ("angry", -0.6),
        ("mediocre", -0.4),
        ("uncomfortable", -0.5),
        ("dull", -0.4),
        ("laggy", -0.5),
        ("glitchy", -0.5),
    ]
    .into_iter()
    .collect()
});

// Multipliers applied to the next opinion word
static INTENSIFIERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    vec![
        ("very", 1.3),
        ("really", 1.3),
        ("extremely", 1.5),
        ("incredibly", 1.5),
        ("super", 1.3),
        ("absolutely", 1.5),
        ("totally", 1.3),
        ("completely", 1.4),
        ("highly", 1.4),
        ("so", 1.2),
        ("too", 1.2),
        ("quite", 1.1),
        ("pretty", 1.1),
        ("most", 1.3),
        ("somewhat", 0.8),
        ("slightly", 0.7),
        ("fairly", 0.9),
        ("barely", 0.5),
        ("kinda", 0.8),
        ("mostly", 0.9),
    ]
    .into_iter()
    .collect()
});

static NEGATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "not", "no", "never", "neither", "nor", "nothing", "nobody", "nowhere",
        "hardly", "without", "cannot", "dont", "doesnt", "didnt", "isnt", "wasnt",
        "wont", "cant", "wouldnt", "shouldnt", "arent", "werent", "havent", "hasnt",
    ]
    .into_iter()
    .collect()
});

/// Three-valued sentiment label attached to every review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Fixed display order for every chart and table
    pub const ORDER: [Sentiment; 3] =
        [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// Thresholds are strict: exactly 0.1 or -0.1 stays Neutral.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if polarity < NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can turn text into a polarity in [-1, 1].
pub trait PolarityScorer {
    fn polarity(&self, text: &str) -> Result<f64>;
}

/// Default scorer backed by the built-in English opinion lexicon.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(token) || token.ends_with("n't")
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> Result<f64> {
        let mut scores: Vec<f64> = Vec::new();
        let mut modifier: Option<f64> = None;
        // Tokens seen since the last negation, if one is still active
        let mut since_negation: Option<usize> = None;

        for token in tokenize(text) {
            if is_negation(&token) {
                since_negation = Some(0);
                modifier = None;
                continue;
            }

            if let Some(m) = INTENSIFIERS.get(token.as_str()) {
                modifier = Some(modifier.unwrap_or(1.0) * m);
                continue;
            }

            if let Some(base) = POLARITY.get(token.as_str()) {
                let mut score = (base * modifier.take().unwrap_or(1.0)).clamp(-1.0, 1.0);
                if since_negation.take().is_some() {
                    score *= NEGATION_FACTOR;
                }
                scores.push(score);
                continue;
            }

            modifier = None;
            since_negation = since_negation
                .map(|n| n + 1)
                .filter(|n| *n < NEGATION_WINDOW);
        }

        if scores.is_empty() {
            return Ok(0.0);
        }

        let polarity = scores.iter().sum::<f64>() / scores.len() as f64;
        if !polarity.is_finite() {
            bail!("polarity is not a finite number");
        }
        Ok(polarity.clamp(-1.0, 1.0))
    }
}

/// A review with its computed polarity and label.
#[derive(Debug, Clone)]
pub struct LabeledReview {
    pub review: Review,
    /// `None` when the scorer failed for this text
    pub polarity: Option<f64>,
    pub sentiment: Sentiment,
}

/// Scores one text. Scorer errors are downgraded to Neutral.
pub fn classify<S: PolarityScorer + ?Sized>(scorer: &S, text: &str) -> (Option<f64>, Sentiment) {
    match scorer.polarity(text) {
        Ok(p) => (Some(p), Sentiment::from_polarity(p)),
        Err(e) => {
            debug!("Scoring failed, defaulting to Neutral: {:#}", e);
            (None, Sentiment::Neutral)
        }
    }
}

/// Labels every review in input order.
pub fn label_reviews<S: PolarityScorer + ?Sized>(
    scorer: &S,
    table: &ReviewTable,
) -> Vec<LabeledReview> {
    table
        .reviews
        .iter()
        .map(|review| {
            let (polarity, sentiment) = classify(scorer, &review.text);
            LabeledReview {
                review: review.clone(),
                polarity,
                sentiment,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingScorer;

    impl PolarityScorer for FailingScorer {
        fn polarity(&self, _text: &str) -> Result<f64> {
            bail!("scorer unavailable")
        }
    }

    struct FixedScorer(f64);

    impl PolarityScorer for FixedScorer {
        fn polarity(&self, _text: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn score(text: &str) -> f64 {
        LexiconScorer::new().polarity(text).unwrap()
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(Sentiment::from_polarity(0.1), Sentiment::Neutral);
        assert_eq!(Sentiment::from_polarity(-0.1), Sentiment::Neutral);
        assert_eq!(Sentiment::from_polarity(0.0), Sentiment::Neutral);
        assert_eq!(Sentiment::from_polarity(0.1001), Sentiment::Positive);
        assert_eq!(Sentiment::from_polarity(-0.1001), Sentiment::Negative);
        assert_eq!(Sentiment::from_polarity(1.0), Sentiment::Positive);
        assert_eq!(Sentiment::from_polarity(-1.0), Sentiment::Negative);
    }

    #[test]
    fn test_positive_review() {
        let text = "This tablet is great and the screen is excellent. I love it!";
        assert!(score(text) > POSITIVE_THRESHOLD);
        assert_eq!(classify(&LexiconScorer::new(), text).1, Sentiment::Positive);
    }

    #[test]
    fn test_negative_review() {
        let text = "Terrible charger, it broke after a week. Total waste of money.";
        assert!(score(text) < NEGATIVE_THRESHOLD);
        assert_eq!(classify(&LexiconScorer::new(), text).1, Sentiment::Negative);
    }

    #[test]
    fn test_neutral_review() {
        let text = "The box arrived on Tuesday with the cable inside.";
        assert_eq!(score(text), 0.0);
        assert_eq!(classify(&LexiconScorer::new(), text).1, Sentiment::Neutral);
    }

    #[test]
    fn test_negation_flips_and_dampens() {
        assert!((score("not bad") - 0.35).abs() < 1e-9);
        assert!(score("this is not a good product") < 0.0);
        assert!(score("doesn't work well and is not reliable") < 0.0);
    }

    #[test]
    fn test_negation_expires_after_window() {
        // "good" is past the negation window of "never"
        assert!(score("never thought the case would be good") > 0.0);
    }

    #[test]
    fn test_intensifier_increases_magnitude() {
        assert!(score("very good") > score("good"));
        assert!(score("extremely bad") < score("bad"));
        assert!(score("slightly annoying") > score("annoying"));
    }

    #[test]
    fn test_polarity_stays_in_range() {
        let p = score("absolutely extremely perfect");
        assert!(p <= 1.0);
        let p = score("totally completely awful horrible");
        assert!(p >= -1.0);
    }

    #[test]
    fn test_scorer_failure_defaults_to_neutral() {
        let (polarity, sentiment) = classify(&FailingScorer, "I love it");
        assert_eq!(polarity, None);
        assert_eq!(sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_classify_uses_thresholds() {
        assert_eq!(classify(&FixedScorer(0.1), "x").1, Sentiment::Neutral);
        assert_eq!(classify(&FixedScorer(0.25), "x").1, Sentiment::Positive);
        assert_eq!(classify(&FixedScorer(-0.25), "x").1, Sentiment::Negative);
    }

    #[test]
    fn test_label_reviews_preserves_order() {
        let table = ReviewTable {
            reviews: vec![
                Review::new("Great speaker", None, None),
                Review::new("Awful battery", None, None),
                Review::new("It is a speaker", None, None),
            ],
            has_ratings: false,
            has_products: false,
            dropped: 0,
        };
        let labels: Vec<Sentiment> = label_reviews(&LexiconScorer::new(), &table)
            .iter()
            .map(|r| r.sentiment)
            .collect();
        assert_eq!(
            labels,
            vec![Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral]
        );
    }
}
