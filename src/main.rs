//! Telegram group member exporter - main entry point

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tg_member_export::commands::export_members;
use tg_member_export::{Config, ConsolePrompt, GrammersClient, OutputSink, SessionLock};

#[derive(Parser)]
#[command(name = "tg_member_export")]
#[command(about = "Export members of selected Telegram groups to CSV", long_about = None)]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tg_member_export=info".parse()?),
        )
        .init();

    let _cli = Cli::parse();
    let started_at = Local::now();

    let config = Config::load().context("failed to load configuration")?;
    let _lock = SessionLock::acquire(config.lock_file())?;

    let cwd = std::env::current_dir()?;
    let sink = OutputSink::create(&cwd, started_at).context("failed to create run directory")?;

    let mut client = GrammersClient::new(&config);
    let mut prompt = ConsolePrompt;
    let summary = export_members::run(&mut client, &mut prompt, &config, &sink).await?;

    tracing::info!(
        "Done: {} exported, {} non-group dialogs skipped, {} groups not in the list",
        summary.exported.len(),
        summary.skipped_not_group,
        summary.skipped_not_listed
    );
    Ok(())
}
