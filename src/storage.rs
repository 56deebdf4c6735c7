use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio::fs;

/// A filesystem mutation that was performed, or skipped because of a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsAction {
    DirExists(PathBuf),
    CreatedDir(PathBuf),
    SkippedDir(PathBuf),
    WrotePage(PathBuf),
    SkippedPage(PathBuf),
}

impl FsAction {
    pub fn path(&self) -> &Path {
        match self {
            Self::DirExists(path)
            | Self::CreatedDir(path)
            | Self::SkippedDir(path)
            | Self::WrotePage(path)
            | Self::SkippedPage(path) => path,
        }
    }
}

pub fn chapter_dir(book_dir: &Path, chapter_name: &str) -> PathBuf {
    book_dir.join(chapter_name)
}

/// `page-<index>.png`; `index` starts at 1.
pub fn page_path(chapter_dir: &Path, index: usize) -> PathBuf {
    chapter_dir.join(format!("page-{index}.png"))
}

/// Creates `path` (and parents) unless it already exists.
pub async fn ensure_dir(path: &Path, dry_run: bool) -> anyhow::Result<FsAction> {
    if fs::try_exists(path)
        .await
        .with_context(|| format!("check dir: {}", path.display()))?
    {
        return Ok(FsAction::DirExists(path.to_path_buf()));
    }

    if dry_run {
        tracing::info!(path = %path.display(), "dry run: skipping creating dir");
        return Ok(FsAction::SkippedDir(path.to_path_buf()));
    }

    fs::create_dir_all(path)
        .await
        .with_context(|| format!("create dir: {}", path.display()))?;
    tracing::info!(path = %path.display(), "creating dir");
    Ok(FsAction::CreatedDir(path.to_path_buf()))
}

pub async fn write_page(path: &Path, png: &[u8], dry_run: bool) -> anyhow::Result<FsAction> {
    if dry_run {
        tracing::info!(path = %path.display(), "dry run: skipping page save");
        return Ok(FsAction::SkippedPage(path.to_path_buf()));
    }

    fs::write(path, png)
        .await
        .with_context(|| format!("write page: {}", path.display()))?;
    tracing::info!(path = %path.display(), "page saved");
    Ok(FsAction::WrotePage(path.to_path_buf()))
}
