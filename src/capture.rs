use std::path::Path;

use anyhow::Context as _;

use crate::browser::BrowserPage;
use crate::config::Selectors;
use crate::storage::{self, FsAction};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterCapture {
    pub pages: usize,
    /// Filesystem actions in the order they were issued.
    pub actions: Vec<FsAction>,
}

/// Screenshots every page container of the loaded chapter into
/// `<book_dir>/<chapter_name>/page-<n>.png`.
///
/// Pages are captured and written one at a time; a failure leaves the pages
/// written so far on disk.
pub async fn capture_chapter_pages<P: BrowserPage>(
    page: &mut P,
    book_dir: &Path,
    chapter_name: &str,
    selectors: &Selectors,
    dry_run: bool,
) -> anyhow::Result<ChapterCapture> {
    let chapter_dir = storage::chapter_dir(book_dir, chapter_name);
    let mut actions = vec![storage::ensure_dir(&chapter_dir, dry_run).await?];

    let containers = page
        .find_elements(&selectors.page_containers)
        .await
        .with_context(|| format!("find page containers: {}", selectors.page_containers))?;
    if containers.is_empty() {
        tracing::warn!(
            chapter = chapter_name,
            selector = %selectors.page_containers,
            "no page containers found"
        );
    }

    for (offset, container) in containers.iter().enumerate() {
        let index = offset + 1;
        let png = page
            .screenshot_png(container)
            .await
            .with_context(|| format!("screenshot page {index}"))?;
        let path = storage::page_path(&chapter_dir, index);
        actions.push(storage::write_page(&path, &png, dry_run).await?);
    }

    Ok(ChapterCapture {
        pages: containers.len(),
        actions,
    })
}
