use std::future::Future;
use std::path::Path;

use anyhow::Context as _;

use crate::browser::{self, BrowserPage, ChromeSession};
use crate::cli::DownloadArgs;
use crate::config::Config;
use crate::pipeline;

/// `download` command. The browser connection is released on every path
/// once attached, including interrupts and chapter failures.
pub async fn run(config_path: &Path, args: DownloadArgs) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("load config")?;
    let dry_run = config.dry_run || args.dry_run;

    let (session, mut page) = ChromeSession::connect(
        &config.chrome_ip_address_or_domain,
        config.chrome_debug_port,
        browser::handler_request_timeout(config.navigation_timeout()),
    )
    .await
    .context("attach to chrome")?;

    let outcome = drive(
        &mut page,
        &config,
        dry_run,
        interrupted(tokio::signal::ctrl_c()),
    )
    .await;
    session.disconnect().await;
    outcome
}

/// Runs the pipeline until it finishes or `interrupt` resolves.
///
/// A chapter failure has already been logged by the pipeline and ends the run
/// successfully; only errors before the chapter loop and interrupts are `Err`.
pub async fn drive<P, I>(
    page: &mut P,
    config: &Config,
    dry_run: bool,
    interrupt: I,
) -> anyhow::Result<()>
where
    P: BrowserPage,
    I: Future<Output = ()>,
{
    let report = tokio::select! {
        result = pipeline::run(page, config, dry_run) => result?,
        () = interrupt => {
            tracing::warn!("interrupted; chapters already written are kept");
            anyhow::bail!("interrupted");
        }
    };

    if let Some(failure) = &report.failure {
        tracing::warn!(
            chapter = %failure.chapter.name,
            downloaded = report.completed.len(),
            total = report.chapters.len(),
            "run stopped at the first failed chapter"
        );
    }
    Ok(())
}

/// Resolves once `signal` delivers. If the listener cannot be installed the
/// run continues and only killing the process stops it.
pub async fn interrupted<S>(signal: S)
where
    S: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        tracing::warn!(?err, "cannot listen for ctrl-c; downloading without interrupt support");
        std::future::pending::<()>().await;
    }
}
