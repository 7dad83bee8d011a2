mod aggregate;
mod charts;
mod config;
mod loader;
mod pipeline;
mod report;
mod sentiment;
mod text;
mod wordcloud;

use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::parse();
    let started = chrono::Local::now();
    report::banner(&format!(
        "PRODUCT REVIEW SENTIMENT ANALYSIS - {}",
        started.format("%Y-%m-%d %H:%M:%S")
    ));

    // Every failure ends up on the console; the process itself still exits cleanly
    if let Err(e) = pipeline::run(&settings) {
        let (message, hint) = report::run_error(&e);
        report::failure(&message);
        println!("{}", hint);
    }
}
