use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "pricewatch", version, about = "Track retailer prices and alert on drops")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check every tracked product each CHECK_INTERVAL_SECS until ctrl-c.
    Run,

    /// Run a single check cycle and exit.
    Once,

    /// Scrape the given listings and start tracking them.
    Track {
        #[clap(long)]
        amazon: Option<String>,

        #[clap(long)]
        flipkart: Option<String>,

        #[clap(long)]
        croma: Option<String>,
    },
}
