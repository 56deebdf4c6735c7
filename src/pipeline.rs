use std::path::Path;

use anyhow::Context as _;
use url::Url;

use crate::browser::BrowserPage;
use crate::capture::{self, ChapterCapture};
use crate::chapters::{self, ChapterInfo};
use crate::config::Config;
use crate::navigator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ListResolved,
    Navigating,
    Capturing,
    Done,
    Failed,
}

#[derive(Debug)]
pub struct CompletedChapter {
    pub chapter: ChapterInfo,
    pub url: Url,
    pub capture: ChapterCapture,
}

#[derive(Debug)]
pub struct ChapterFailure {
    pub chapter: ChapterInfo,
    pub url: Option<Url>,
    /// `Navigating` or `Capturing`.
    pub stage: RunState,
    pub error: anyhow::Error,
}

#[derive(Debug)]
pub struct RunReport {
    pub chapters: Vec<ChapterInfo>,
    pub completed: Vec<CompletedChapter>,
    pub failure: Option<ChapterFailure>,
}

impl RunReport {
    pub fn state(&self) -> RunState {
        if self.failure.is_some() {
            RunState::Failed
        } else {
            RunState::Done
        }
    }
}

/// Resolves the chapter range on the open listing page, then navigates to and
/// captures each chapter in order.
///
/// Errors before the loop (challenge, unmatched range) are returned as `Err`.
/// The first chapter that fails stops the run and is recorded in
/// [`RunReport::failure`]; chapters already written stay on disk.
pub async fn run<P: BrowserPage>(
    page: &mut P,
    config: &Config,
    dry_run: bool,
) -> anyhow::Result<RunReport> {
    let mut state = RunState::Idle;
    tracing::debug!(?state, "pipeline start");

    let chapters = chapters::resolve(page, &config.selectors, &config.chapter_range())
        .await
        .context("resolve chapter list")?;
    state = RunState::ListResolved;

    let book_dir = config.book_dir();
    tracing::info!(
        ?state,
        book_dir = %book_dir.display(),
        chapters = chapters.len(),
        dry_run,
        "starting download"
    );

    let mut completed = Vec::with_capacity(chapters.len());
    let mut failure = None;

    for chapter in &chapters {
        match download_chapter(page, config, &book_dir, chapter, dry_run, &mut state).await {
            Ok((url, capture)) => {
                tracing::info!(
                    chapter = %chapter.number,
                    pages = capture.pages,
                    %url,
                    "chapter downloaded"
                );
                completed.push(CompletedChapter {
                    chapter: chapter.clone(),
                    url,
                    capture,
                });
            }
            Err((url, err)) => {
                tracing::error!(chapter = %chapter.number, ?err, "error downloading chapter");
                failure = Some(ChapterFailure {
                    chapter: chapter.clone(),
                    url,
                    stage: state,
                    error: err,
                });
                break;
            }
        }
    }

    let report = RunReport {
        chapters,
        completed,
        failure,
    };
    tracing::info!(
        state = ?report.state(),
        downloaded = report.completed.len(),
        total = report.chapters.len(),
        "run finished"
    );
    Ok(report)
}

async fn download_chapter<P: BrowserPage>(
    page: &mut P,
    config: &Config,
    book_dir: &Path,
    chapter: &ChapterInfo,
    dry_run: bool,
    state: &mut RunState,
) -> Result<(Url, ChapterCapture), (Option<Url>, anyhow::Error)> {
    *state = RunState::Navigating;
    let url = config
        .chapter_url(&chapter.number)
        .map_err(|err| (None, err))?;

    navigator::navigate_to_chapter(page, &url, config.navigation_timeout(), &config.selectors)
        .await
        .map_err(|err| (Some(url.clone()), err))?;

    *state = RunState::Capturing;
    let capture = capture::capture_chapter_pages(
        page,
        book_dir,
        &chapter.name,
        &config.selectors,
        dry_run,
    )
    .await
    .map_err(|err| (Some(url.clone()), err))?;

    Ok((url, capture))
}
