use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::browser::{self, BrowserPage, ChromeSession};
use crate::config::{ChapterMatch, Config, Selectors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInfo {
    /// Sanitized label, used as the chapter directory name.
    pub name: String,
    /// Digits of the label, substituted into `patternChapterUrl`.
    pub number: String,
}

impl ChapterInfo {
    pub fn from_label(label: &str) -> Self {
        Self {
            name: sanitize_chapter_name(label),
            number: extract_chapter_number(label),
        }
    }
}

/// Replaces every non-word character with a space, then collapses and trims whitespace.
pub fn sanitize_chapter_name(label: &str) -> String {
    let spaced = label
        .chars()
        .map(|ch| if is_word_char(ch) { ch } else { ' ' })
        .collect::<String>();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn extract_chapter_number(label: &str) -> String {
    label.chars().filter(char::is_ascii_digit).collect()
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// The listing shows newest first; the result is in reading order.
pub fn chapters_from_labels<S: AsRef<str>>(labels: &[S]) -> Vec<ChapterInfo> {
    labels
        .iter()
        .rev()
        .map(|label| ChapterInfo::from_label(label.as_ref()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterRange {
    pub start: Option<String>,
    pub end: Option<String>,
    pub match_by: ChapterMatch,
}

impl ChapterRange {
    /// Slices `chapters` (ascending) to `[start, end]`, both inclusive.
    ///
    /// `end` is searched only after `start`, so an end title that precedes the
    /// start title is reported as not found.
    pub fn select(&self, mut chapters: Vec<ChapterInfo>) -> anyhow::Result<Vec<ChapterInfo>> {
        if let Some(start) = &self.start {
            let Some(index) = self.position(&chapters, start) else {
                anyhow::bail!(
                    "startAtChapter title given in config not found: {start:?}{}",
                    self.spelling_hint(&chapters, start)
                );
            };
            chapters.drain(..index);
        }

        if let Some(end) = &self.end {
            let Some(index) = self.position(&chapters, end) else {
                anyhow::bail!(
                    "endAtChapter title given in config not found: {end:?}{}",
                    self.spelling_hint(&chapters, end)
                );
            };
            chapters.truncate(index + 1);
        }

        Ok(chapters)
    }

    fn position(&self, chapters: &[ChapterInfo], wanted: &str) -> Option<usize> {
        match self.match_by {
            ChapterMatch::Name => chapters.iter().position(|chapter| chapter.name == wanted),
            ChapterMatch::Number => {
                let wanted = extract_chapter_number(wanted);
                chapters.iter().position(|chapter| chapter.number == wanted)
            }
        }
    }

    fn spelling_hint(&self, chapters: &[ChapterInfo], wanted: &str) -> String {
        if self.match_by != ChapterMatch::Name {
            return String::new();
        }
        let sanitized = sanitize_chapter_name(wanted);
        if sanitized != wanted && chapters.iter().any(|chapter| chapter.name == sanitized) {
            format!(" (chapter names are matched after cleanup; try {sanitized:?})")
        } else {
            String::new()
        }
    }
}

/// Reads the chapter links of the currently loaded listing page and narrows
/// them to `range`.
pub async fn resolve<P: BrowserPage>(
    page: &mut P,
    selectors: &Selectors,
    range: &ChapterRange,
) -> anyhow::Result<Vec<ChapterInfo>> {
    crate::navigator::ensure_not_challenged(page, &selectors.cloudflare_marker)
        .await
        .context("check listing page")?;

    let links = page
        .find_elements(&selectors.chapter_links)
        .await
        .with_context(|| format!("find chapter links: {}", selectors.chapter_links))?;
    if links.is_empty() {
        tracing::warn!(
            selector = %selectors.chapter_links,
            "no chapter links found; is the chapter listing page open?"
        );
    }

    let mut labels = Vec::with_capacity(links.len());
    for link in &links {
        let label = page
            .inner_text(link)
            .await
            .context("read chapter link text")?;
        labels.push(label);
    }

    let chapters = chapters_from_labels(&labels);
    for (label, chapter) in labels.iter().rev().zip(&chapters) {
        if chapter.name.is_empty() {
            tracing::warn!(
                label = label.as_str(),
                "chapter label has no word characters; its pages go straight into the book directory"
            );
        }
        if chapter.number.is_empty() {
            tracing::warn!(chapter = %chapter.name, "chapter label has no digits; its url will lack a number");
        }
    }

    let selected = range.select(chapters)?;
    tracing::info!(
        found = labels.len(),
        selected = selected.len(),
        first = selected.first().map(|c| c.name.as_str()).unwrap_or_default(),
        last = selected.last().map(|c| c.name.as_str()).unwrap_or_default(),
        "chapter range resolved"
    );
    Ok(selected)
}

/// `chapters` command: prints the resolved range as `number\tname\turl`.
pub async fn list(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("load config")?;
    let (session, mut page) = ChromeSession::connect(
        &config.chrome_ip_address_or_domain,
        config.chrome_debug_port,
        browser::handler_request_timeout(config.navigation_timeout()),
    )
    .await
    .context("attach to chrome")?;

    let resolved = resolve(&mut page, &config.selectors, &config.chapter_range()).await;
    session.disconnect().await;

    let mut stdout = std::io::stdout().lock();
    for chapter in resolved? {
        let url = config.chapter_url(&chapter.number)?;
        writeln!(stdout, "{}\t{}\t{url}", chapter.number, chapter.name)
            .context("write chapter line")?;
    }
    stdout.flush().context("flush stdout")?;
    Ok(())
}
