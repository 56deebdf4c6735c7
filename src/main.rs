use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
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
    let cli = mangashot::cli::Cli::parse();
    mangashot::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let config_path = PathBuf::from(&cli.config);
    match cli.command {
        mangashot::cli::Command::Download(args) => {
            mangashot::download::run(&config_path, args)
                .await
                .context("download")?;
        }
        mangashot::cli::Command::Chapters => {
            mangashot::chapters::list(&config_path)
                .await
                .context("chapters")?;
        }
    }

    Ok(())
}
