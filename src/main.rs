use clap::Parser;
use console::style;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod commands;
mod config;
mod core;
mod dispatcher;
mod display;
mod handlers;
mod input;
mod output;
mod providers;
mod router;
mod utils;

#[cfg(test)]
mod testing;

use crate::app::Application;
use crate::cli::Args;
use crate::config::Config;
use crate::core::error::VtaiError;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<(), VtaiError> {
    let mut config = Config::load()?;
    config.prompt_missing_keys()?;

    let mut app = Application::new(args, config)?;
    app.run().await
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!(kind = e.kind(), error = %e, "fatal");
        eprintln!("{} {}", style("Error:").bold().red(), e);
        std::process::exit(1);
    }
}
