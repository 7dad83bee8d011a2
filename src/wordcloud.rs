//! Keyword clouds.
//!
//! Words are counted, the most frequent are laid out on an occupancy grid
//! along an Archimedean spiral, and the result is drawn with plotters.
//! Layout is seeded so the same text always produces the same image.

use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::text::{is_stopword, tokenize};

// Red-yellow-blue diverging palette without the pale middle tones
const PALETTE: [RGBColor; 8] = [
    RGBColor(165, 0, 38),
    RGBColor(215, 48, 39),
    RGBColor(244, 109, 67),
    RGBColor(253, 174, 97),
    RGBColor(171, 217, 233),
    RGBColor(116, 173, 209),
    RGBColor(69, 117, 180),
    RGBColor(49, 54, 149),
];

/// Grid resolution in pixels
const CELL: u32 = 4;
const TITLE_FONT: (&str, u32) = ("sans-serif", 26);

#[derive(Error, Debug, PartialEq)]
pub enum WordCloudError {
    #[error("no words left to draw after filtering")]
    NoWords,
}

/// Fixed rendering parameters shared by every cloud.
#[derive(Debug, Clone)]
pub struct WordCloudConfig {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
    pub min_word_length: usize,
    /// Probability that a word is drawn horizontally
    pub prefer_horizontal: f64,
    pub max_font_size: u32,
    pub min_font_size: u32,
    /// Weight of the frequency ratio when sizing the next word, 0..=1
    pub relative_scaling: f64,
    /// Padding around each word, in pixels
    pub margin: u32,
    pub seed: u64,
}

impl Default for WordCloudConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            max_words: 100,
            min_word_length: 3,
            prefer_horizontal: 0.7,
            max_font_size: 160,
            min_font_size: 8,
            relative_scaling: 0.5,
            margin: 2,
            seed: 42,
        }
    }
}

/// Word counts for the cloud, most frequent first (ties alphabetical).
pub fn word_frequencies(text: &str, config: &WordCloudConfig) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in tokenize(text) {
        let word = token.strip_suffix("'s").unwrap_or(&token);
        if word.chars().count() < config.min_word_length
            || is_stopword(word)
            || word.chars().all(|c| c.is_numeric())
        {
            continue;
        }
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }

    let mut words: Vec<(String, usize)> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(config.max_words);
    words
}

/// A word with its final position and size, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub font_size: u32,
    pub x: u32,
    pub y: u32,
    /// Box width as drawn (already swapped for vertical words)
    pub width: u32,
    pub height: u32,
    pub vertical: bool,
    pub color: RGBColor,
}

struct OccupancyGrid {
    cols: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    fn new(width: u32, height: u32) -> Self {
        let cols = width / CELL;
        let rows = height / CELL;
        Self {
            cols,
            rows,
            cells: vec![false; (cols * rows) as usize],
        }
    }

    fn is_free(&self, col: u32, row: u32, w: u32, h: u32) -> bool {
        if col + w > self.cols || row + h > self.rows {
            return false;
        }
        (row..row + h).all(|r| {
            let start = (r * self.cols + col) as usize;
            self.cells[start..start + w as usize].iter().all(|c| !c)
        })
    }

    fn occupy(&mut self, col: u32, row: u32, w: u32, h: u32) {
        for r in row..row + h {
            let start = (r * self.cols + col) as usize;
            self.cells[start..start + w as usize].fill(true);
        }
    }

    /// Walks a spiral out from a jittered center and returns the first
    /// free top-left cell for a `w` x `h` block.
    fn find_spot<R: Rng>(&self, w: u32, h: u32, rng: &mut R) -> Option<(u32, u32)> {
        if w > self.cols || h > self.rows {
            return None;
        }
        let max_col = (self.cols - w) as f64;
        let max_row = (self.rows - h) as f64;
        let cx = max_col / 2.0 + rng.gen_range(-0.1..=0.1) * max_col;
        let cy = max_row / 2.0 + rng.gen_range(-0.1..=0.1) * max_row;
        let max_radius = (max_col * max_col + max_row * max_row).sqrt() + 1.0;

        let mut theta: f64 = 0.0;
        loop {
            // one cell between consecutive rings
            let radius = theta / TAU;
            if radius > max_radius {
                return None;
            }
            let col = (cx + radius * theta.cos()).round();
            let row = (cy + radius * theta.sin()).round();
            if (0.0..=max_col).contains(&col) && (0.0..=max_row).contains(&row) {
                let (col, row) = (col as u32, row as u32);
                if self.is_free(col, row, w, h) {
                    return Some((col, row));
                }
            }
            // roughly one cell of arc per step
            theta += 1.0 / radius.max(1.0);
        }
    }
}

/// Places words on a `width` x `height` canvas.
///
/// `measure` returns the horizontal text extent of a word at a font size.
/// Words that do not fit shrink one step at a time. Once a word does not fit
/// even at `min_font_size`, it and all later (smaller) words are dropped.
pub fn layout<M, R>(
    frequencies: &[(String, usize)],
    config: &WordCloudConfig,
    (width, height): (u32, u32),
    mut measure: M,
    rng: &mut R,
) -> Vec<PlacedWord>
where
    M: FnMut(&str, u32) -> (u32, u32),
    R: Rng,
{
    let mut grid = OccupancyGrid::new(width, height);
    let mut placed = Vec::new();
    let mut font_size = config.max_font_size.min(height);
    let mut last_freq: Option<usize> = None;

    for (word, freq) in frequencies {
        if let Some(last) = last_freq {
            let scale = config.relative_scaling * (*freq as f64 / last as f64)
                + (1.0 - config.relative_scaling);
            font_size = ((scale * font_size as f64).round() as u32).max(config.min_font_size);
        }
        last_freq = Some(*freq);

        let vertical = rng.gen::<f64>() > config.prefer_horizontal;
        let mut spot = None;

        while font_size >= config.min_font_size {
            let (tw, th) = measure(word, font_size);
            let (bw, bh) = if vertical { (th, tw) } else { (tw, th) };
            let cells_w = (bw + 2 * config.margin).div_ceil(CELL);
            let cells_h = (bh + 2 * config.margin).div_ceil(CELL);

            if let Some((col, row)) = grid.find_spot(cells_w, cells_h, rng) {
                grid.occupy(col, row, cells_w, cells_h);
                spot = Some((col * CELL + config.margin, row * CELL + config.margin, bw, bh));
                break;
            }
            font_size = font_size.saturating_sub((font_size / 10).max(1));
        }

        let Some((x, y, bw, bh)) = spot else {
            debug!("Stopping layout at '{}': no room left", word);
            break;
        };

        placed.push(PlacedWord {
            word: word.clone(),
            font_size,
            x,
            y,
            width: bw,
            height: bh,
            vertical,
            color: PALETTE[rng.gen_range(0..PALETTE.len())],
        });
    }

    placed
}

/// Text extent when the font backend cannot measure
fn approx_text_size(word: &str, size: u32) -> (u32, u32) {
    (word.chars().count() as u32 * size * 3 / 5, size)
}

/// Renders a keyword cloud for `text` into a PNG at `path`.
///
/// Returns the number of words drawn.
pub fn render(path: &Path, title: &str, text: &str, config: &WordCloudConfig) -> Result<usize> {
    let frequencies = word_frequencies(text, config);
    if frequencies.is_empty() {
        return Err(WordCloudError::NoWords.into());
    }

    let title_band = TITLE_FONT.1 * 2;
    let root =
        BitMapBackend::new(path, (config.width, config.height + title_band)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(title, TITLE_FONT)?;
    let dims = area.dim_in_pixel();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let measure = |word: &str, size: u32| {
        let style = TextStyle::from(("sans-serif", size as f64).into_font());
        area.estimate_text_size(word, &style)
            .unwrap_or_else(|_| approx_text_size(word, size))
    };
    let words = layout(&frequencies, config, dims, measure, &mut rng);

    for w in &words {
        let font = ("sans-serif", w.font_size as f64).into_font();
        if w.vertical {
            let style = font
                .transform(FontTransform::Rotate270)
                .color(&w.color)
                .pos(Pos::new(HPos::Left, VPos::Top));
            area.draw_text(&w.word, &style, (w.x as i32, (w.y + w.height) as i32))?;
        } else {
            let style = font.color(&w.color).pos(Pos::new(HPos::Left, VPos::Top));
            area.draw_text(&w.word, &style, (w.x as i32, w.y as i32))?;
        }
    }

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!("Drew {} of {} words into {}", words.len(), frequencies.len(), path.display());
    Ok(words.len())
}
