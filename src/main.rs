use std::process::ExitCode;

use anyhow::Context as _;
use catalog_ingest::api::CatalogClient;
use catalog_ingest::cli::{Cli, Command};
use catalog_ingest::commands;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    catalog_ingest::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = commands::client_config(cli.api_base_url.as_deref())?;
    tracing::debug!(?config, "resolved config");

    let client = || CatalogClient::from_config(&config);
    match cli.command {
        Command::Convert(args) => commands::convert(args, &config.hosts).context("convert")?,
        Command::Work(args) => commands::work(&client()?, args.id).await.context("work")?,
        Command::Author(args) => commands::author(&client()?, args.id)
            .await
            .context("author")?,
        Command::Edition(args) => commands::edition(&client()?, args.id)
            .await
            .context("edition")?,
        Command::Analogs(args) => commands::analogs(&client()?, args.id)
            .await
            .context("analogs")?,
        Command::Reviews(args) => commands::reviews(&client()?, args)
            .await
            .context("reviews")?,
    }

    Ok(())
}
