use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::chapters::ChapterRange;

pub const CHAPTER_NUMBER_PLACEHOLDER: &str = "<chapterNumber>";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub chrome_ip_address_or_domain: String,
    pub chrome_debug_port: u16,
    pub output_path: PathBuf,
    pub book_name: String,
    #[serde(default, deserialize_with = "deserialize_chapter_title")]
    pub start_at_chapter: Option<String>,
    #[serde(default, deserialize_with = "deserialize_chapter_title")]
    pub end_at_chapter: Option<String>,
    pub pattern_chapter_url: String,
    /// Milliseconds.
    pub navigation_timeout: u64,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub chapter_match: ChapterMatch,
    #[serde(default)]
    pub selectors: Selectors,
}

/// How `startAtChapter` / `endAtChapter` are compared against the chapter list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterMatch {
    /// Exact equality with the sanitized chapter name.
    #[default]
    Name,
    /// Exact equality with the digits of the chapter label.
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selectors {
    pub chapter_links: String,
    pub page_containers: String,
    pub overlays: String,
    pub cloudflare_marker: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            chapter_links: ".chapters_list > a".to_owned(),
            page_containers: r#"div[id^="d-img-"]"#.to_owned(),
            overlays: ".sticky-top".to_owned(),
            cloudflare_marker: ".ray-id".to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = match std::fs::read_to_string(path) {
            Ok(yaml) => yaml,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => anyhow::bail!(
                "{} not found; please create it following the example_config.yml structure",
                path.display()
            ),
            Err(err) => {
                return Err(err).with_context(|| format!("read config: {}", path.display()));
            }
        };

        let config =
            Self::parse(&yaml).with_context(|| format!("parse config: {}", path.display()))?;

        if !config
            .pattern_chapter_url
            .contains(CHAPTER_NUMBER_PLACEHOLDER)
        {
            tracing::warn!(
                pattern = %config.pattern_chapter_url,
                "patternChapterUrl has no <chapterNumber> placeholder; every chapter resolves to the same url"
            );
        }

        Ok(config)
    }

    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("deserialize config yaml")?;
        if config.navigation_timeout == 0 {
            anyhow::bail!("navigationTimeout must be greater than 0");
        }
        Ok(config)
    }

    pub fn book_dir(&self) -> PathBuf {
        self.output_path.join(&self.book_name)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout)
    }

    pub fn chapter_range(&self) -> ChapterRange {
        ChapterRange {
            start: self.start_at_chapter.clone(),
            end: self.end_at_chapter.clone(),
            match_by: self.chapter_match,
        }
    }

    /// Substitutes the first `<chapterNumber>` placeholder of `patternChapterUrl`.
    pub fn chapter_url(&self, chapter_number: &str) -> anyhow::Result<Url> {
        let url = self
            .pattern_chapter_url
            .replacen(CHAPTER_NUMBER_PLACEHOLDER, chapter_number, 1);
        Url::parse(&url).with_context(|| format!("parse chapter url: {url}"))
    }
}

/// Accepts `null`, a string, or a bare YAML number (`startAtChapter: 12`).
fn deserialize_chapter_title<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Title {
        Text(String),
        Integer(u64),
        Float(f64),
    }

    let title: Option<Title> = Option::deserialize(deserializer)?;
    Ok(title.map(|title| match title {
        Title::Text(text) => text,
        Title::Integer(number) => number.to_string(),
        Title::Float(number) => number.to_string(),
    }))
}
