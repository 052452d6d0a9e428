use anyhow::Result;
use casetape::cli::{self, Cli};
use casetape::util;
use clap::Parser;
use std::fs::{self, OpenOptions};

#[tokio::main]
async fn main() -> Result<()> {
    util::init_data_dir(None);

    // Logging goes to a file (~/.casetape/logs/casetape.log) so stdout stays
    // clean for command output.
    fs::create_dir_all(util::logs_dir())?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    cli::run(cli).await
}
