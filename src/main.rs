mod commands;
mod config;
mod db;
mod models;
mod tally;
mod tasks;

use clap::Parser;
use commands::Opts;
use config::Settings;
use log::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let opts = Opts::parse();
    let settings = Settings::from_env();
    info!("ward-tally {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = commands::run(opts, settings).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
