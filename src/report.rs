//! Console output for the analysis run.

use colored::Colorize;
use tabled::{Table, Tabled};

use crate::aggregate::{format_ratio, ProductSummary};
use crate::loader::LoadError;

const SEPARATOR_WIDTH: usize = 80;

pub fn status(message: &str) {
    println!("{}", message.green());
}

pub fn heading(title: &str) {
    println!("\n{}", title.green().bold());
}

pub fn note(message: &str) {
    println!("{}", message.yellow());
}

pub fn failure(message: &str) {
    println!("{}", message.red());
}

pub fn separator() {
    println!("{}", "=".repeat(SEPARATOR_WIDTH).cyan());
}

/// Separator-framed yellow title
pub fn banner(title: &str) {
    separator();
    println!("{}", title.yellow().bold());
    separator();
}

/// Console message and follow-up hint for an error that aborted the run.
pub fn run_error(e: &anyhow::Error) -> (String, &'static str) {
    match e.downcast_ref::<LoadError>() {
        Some(LoadError::NotFound(path)) => (
            format!("Error: input file {} not found", path.display()),
            "Place the file next to the program or pass --input <PATH>.",
        ),
        _ => (
            format!("Unexpected error: {:#}", e),
            "Please check the input data and try again.",
        ),
    }
}

#[derive(Tabled)]
struct RankingRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Negative ratio")]
    negative_ratio: String,
    #[tabled(rename = "Total reviews")]
    total: usize,
}

/// Renders the first `limit` rows of the negative-ratio ranking.
pub fn ranking_table(ranking: &[ProductSummary], limit: usize) -> String {
    let rows: Vec<RankingRow> = ranking
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, p)| RankingRow {
            rank: i + 1,
            product: p.product.clone(),
            negative_ratio: format_ratio(p.negative_ratio),
            total: p.total,
        })
        .collect();

    Table::new(rows).to_string()
}
