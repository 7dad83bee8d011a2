//! PNG charts for the sentiment report, drawn with plotters.

use anyhow::{bail, Context, Result};
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::aggregate::{ProductSentimentCounts, SentimentCounts};
use crate::sentiment::Sentiment;

const CHART_SIZE: (u32, u32) = (1000, 600);
const WIDE_CHART_SIZE: (u32, u32) = (1500, 800);
const CAPTION_FONT: (&str, u32) = ("sans-serif", 28);
const MAX_LABEL_CHARS: usize = 18;

const GRAY: RGBColor = RGBColor(128, 128, 128);

// Sampled from the viridis colormap
const VIRIDIS: [RGBColor; 6] = [
    RGBColor(68, 1, 84),
    RGBColor(65, 68, 135),
    RGBColor(42, 120, 142),
    RGBColor(34, 168, 132),
    RGBColor(122, 209, 81),
    RGBColor(253, 231, 37),
];

pub fn sentiment_color(sentiment: Sentiment) -> RGBColor {
    match sentiment {
        Sentiment::Positive => GREEN,
        Sentiment::Neutral => GRAY,
        Sentiment::Negative => RED,
    }
}

fn viridis(i: usize, n: usize) -> RGBColor {
    if n <= 1 {
        return VIRIDIS[0];
    }
    VIRIDIS[i * (VIRIDIS.len() - 1) / (n - 1)]
}

fn short_label(name: &str) -> String {
    if name.chars().count() <= MAX_LABEL_CHARS {
        name.to_string()
    } else {
        let head: String = name.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{head}…")
    }
}

fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{:.0}", rating)
    } else {
        format!("{}", rating)
    }
}

/// Headroom above the tallest bar
fn y_ceiling(max: u32) -> u32 {
    max + max / 10 + 1
}

struct Bar {
    label: String,
    value: u32,
    color: RGBColor,
}

fn bar_chart(path: &Path, title: &str, x_desc: &str, y_desc: &str, bars: &[Bar]) -> Result<()> {
    if bars.is_empty() {
        bail!("nothing to plot for '{}'", title);
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let max = bars.iter().map(|b| b.value).max().unwrap_or(0);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..bars.len() as i32).into_segmented(), 0u32..y_ceiling(max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_labels(bars.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => bars
                .get(*i as usize)
                .map(|b| b.label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        let i = i as i32;
        let mut rect = Rectangle::new(
            [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), bar.value)],
            bar.color.filled(),
        );
        rect.set_margin(0, 0, 20, 20);
        rect
    }))?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!("Chart saved to {}", path.display());
    Ok(())
}

/// Review count per sentiment in the fixed Positive, Neutral, Negative order.
pub fn sentiment_distribution(path: &Path, counts: &SentimentCounts) -> Result<()> {
    let bars: Vec<Bar> = Sentiment::ORDER
        .iter()
        .map(|&s| Bar {
            label: s.to_string(),
            value: counts.get(s) as u32,
            color: sentiment_color(s),
        })
        .collect();

    bar_chart(
        path,
        "Sentiment distribution of product reviews",
        "Sentiment",
        "Number of reviews",
        &bars,
    )
}

/// Review count per star rating.
pub fn rating_distribution(path: &Path, distribution: &[(f64, usize)]) -> Result<()> {
    let bars: Vec<Bar> = distribution
        .iter()
        .enumerate()
        .map(|(i, (rating, count))| Bar {
            label: format_rating(*rating),
            value: *count as u32,
            color: viridis(i, distribution.len()),
        })
        .collect();

    bar_chart(
        path,
        "Rating distribution (stars)",
        "Stars",
        "Number of reviews",
        &bars,
    )
}

/// Box plot of star ratings for each sentiment. Labels without any rated
/// review are left out.
pub fn rating_by_sentiment(path: &Path, groups: &[(Sentiment, Vec<f64>)]) -> Result<()> {
    let groups: Vec<(&'static str, Sentiment, Quartiles)> = groups
        .iter()
        .filter(|(_, ratings)| !ratings.is_empty())
        .map(|(s, ratings)| (s.as_str(), *s, Quartiles::new(ratings.as_slice())))
        .collect();
    if groups.is_empty() {
        bail!("no rated reviews to plot");
    }

    let labels: Vec<&'static str> = groups.iter().map(|(label, _, _)| *label).collect();
    let (lo, hi) = groups
        .iter()
        .flat_map(|(_, _, q)| q.values())
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Star rating by sentiment", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(labels[..].into_segmented(), (lo.min(0.0) - 0.5)..(hi + 0.5))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Sentiment")
        .y_desc("Rating (stars)")
        .draw()?;

    chart.draw_series(groups.iter().enumerate().map(|(i, (_, sentiment, quartiles))| {
        Boxplot::new_vertical(SegmentValue::CenterOf(&labels[i]), quartiles)
            .width(60)
            .whisker_width(0.5)
            .style(sentiment_color(*sentiment).stroke_width(2))
    }))?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!("Chart saved to {}", path.display());
    Ok(())
}

/// Stacked Positive/Negative counts for the most-reviewed products.
pub fn top_products(path: &Path, products: &[ProductSentimentCounts]) -> Result<()> {
    if products.is_empty() {
        bail!("no products to plot");
    }

    let max = products
        .iter()
        .map(|p| (p.counts.positive + p.counts.negative) as u32)
        .max()
        .unwrap_or(0);

    let root = BitMapBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Positive and negative reviews per product (top 10 by volume)",
            CAPTION_FONT,
        )
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((0..products.len() as i32).into_segmented(), 0u32..y_ceiling(max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Product")
        .y_desc("Number of reviews")
        .x_labels(products.len())
        .x_label_style(("sans-serif", 13))
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => products
                .get(*i as usize)
                .map(|p| short_label(&p.product))
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    let bar = |i: usize, from: u32, to: u32, color: RGBColor| {
        let i = i as i32;
        let mut rect = Rectangle::new(
            [(SegmentValue::Exact(i), from), (SegmentValue::Exact(i + 1), to)],
            color.filled(),
        );
        rect.set_margin(0, 0, 15, 15);
        rect
    };

    chart
        .draw_series(
            products
                .iter()
                .enumerate()
                .map(|(i, p)| bar(i, 0, p.counts.positive as u32, GREEN)),
        )?
        .label("Positive")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], GREEN.filled()));

    chart
        .draw_series(products.iter().enumerate().map(|(i, p)| {
            let base = p.counts.positive as u32;
            bar(i, base, base + p.counts.negative as u32, RED)
        }))?
        .label("Negative")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], RED.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!("Chart saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_colors() {
        assert_eq!(sentiment_color(Sentiment::Positive), GREEN);
        assert_eq!(sentiment_color(Sentiment::Neutral), GRAY);
        assert_eq!(sentiment_color(Sentiment::Negative), RED);
    }

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("Kindle"), "Kindle");
        let long = "All-New Fire HD 8 Tablet with Alexa";
        let short = short_label(long);
        assert_eq!(short.chars().count(), MAX_LABEL_CHARS);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn test_format_rating() {
        assert_eq!(format_rating(5.0), "5");
        assert_eq!(format_rating(4.5), "4.5");
    }

    #[test]
    fn test_viridis_spans_palette() {
        assert_eq!(viridis(0, 5), VIRIDIS[0]);
        assert_eq!(viridis(4, 5), VIRIDIS[5]);
        assert_eq!(viridis(0, 1), VIRIDIS[0]);
    }

    #[test]
    fn test_sentiment_distribution_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentiment.png");
        let counts = SentimentCounts {
            positive: 12,
            neutral: 3,
            negative: 5,
        };
        sentiment_distribution(&path, &counts).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_empty_inputs_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(top_products(&dir.path().join("top.png"), &[]).is_err());
        let groups = vec![(Sentiment::Positive, vec![]), (Sentiment::Negative, vec![])];
        assert!(rating_by_sentiment(&dir.path().join("box.png"), &groups).is_err());
        assert!(rating_distribution(&dir.path().join("ratings.png"), &[]).is_err());
    }
}
