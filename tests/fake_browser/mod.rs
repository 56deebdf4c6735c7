use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use mangashot::browser::BrowserPage;
use mangashot::config::Selectors;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeElement {
    Link(String),
    Container { url: String, index: usize },
    Marker,
}

/// Scripted tab: a chapter listing plus chapter pages keyed by url.
#[derive(Debug, Default)]
pub struct FakePage {
    selectors: Selectors,
    listing: Vec<String>,
    listing_challenged: bool,
    chapters: HashMap<String, usize>,
    challenged: HashSet<String>,
    failing_navigations: HashMap<String, String>,
    failing_screenshots: HashSet<(String, usize)>,
    current: Option<String>,
    pub navigations: Vec<String>,
    pub overlay_removals: Vec<String>,
}

#[allow(dead_code)]
impl FakePage {
    /// `labels` in listing (newest first) order.
    pub fn listing(labels: &[&str]) -> Self {
        Self {
            listing: labels.iter().map(|label| (*label).to_owned()).collect(),
            ..Self::default()
        }
    }

    pub fn with_chapter(mut self, url: &str, pages: usize) -> Self {
        self.chapters.insert(url.to_owned(), pages);
        self
    }

    pub fn failing_navigation(mut self, url: &str, message: &str) -> Self {
        self.failing_navigations
            .insert(url.to_owned(), message.to_owned());
        self
    }

    pub fn failing_screenshot(mut self, url: &str, index: usize) -> Self {
        self.failing_screenshots.insert((url.to_owned(), index));
        self
    }

    pub fn challenged_listing(mut self) -> Self {
        self.listing_challenged = true;
        self
    }

    pub fn challenged_chapter(mut self, url: &str) -> Self {
        self.challenged.insert(url.to_owned());
        self
    }
}

pub fn fake_png(url: &str, index: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(format!("{url}#{index}").as_bytes());
    bytes
}

#[async_trait]
impl BrowserPage for FakePage {
    type Element = FakeElement;

    async fn find_elements(&mut self, selector: &str) -> anyhow::Result<Vec<FakeElement>> {
        if selector == self.selectors.cloudflare_marker {
            let challenged = match &self.current {
                None => self.listing_challenged,
                Some(url) => self.challenged.contains(url),
            };
            return Ok(if challenged {
                vec![FakeElement::Marker]
            } else {
                Vec::new()
            });
        }

        if selector == self.selectors.chapter_links {
            return Ok(match &self.current {
                None => self.listing.iter().cloned().map(FakeElement::Link).collect(),
                Some(_) => Vec::new(),
            });
        }

        if selector == self.selectors.page_containers {
            let Some(url) = &self.current else {
                return Ok(Vec::new());
            };
            let pages = self.chapters.get(url).copied().unwrap_or_default();
            return Ok((1..=pages)
                .map(|index| FakeElement::Container {
                    url: url.clone(),
                    index,
                })
                .collect());
        }

        anyhow::bail!("unexpected selector: {selector}")
    }

    async fn inner_text(&mut self, element: &FakeElement) -> anyhow::Result<String> {
        match element {
            FakeElement::Link(text) => Ok(text.clone()),
            other => anyhow::bail!("no text for {other:?}"),
        }
    }

    async fn screenshot_png(&mut self, element: &FakeElement) -> anyhow::Result<Vec<u8>> {
        match element {
            FakeElement::Container { url, index } => {
                if self.failing_screenshots.contains(&(url.clone(), *index)) {
                    anyhow::bail!("screenshot failed: {url} page {index}");
                }
                Ok(fake_png(url, *index))
            }
            other => anyhow::bail!("cannot screenshot {other:?}"),
        }
    }

    async fn navigate(&mut self, url: &Url, _timeout: Duration) -> anyhow::Result<()> {
        let url = url.as_str().to_owned();
        self.navigations.push(url.clone());
        if let Some(message) = self.failing_navigations.get(&url) {
            anyhow::bail!("{message}");
        }
        self.current = Some(url);
        Ok(())
    }

    async fn remove_elements(&mut self, selector: &str) -> anyhow::Result<usize> {
        if selector != self.selectors.overlays {
            anyhow::bail!("unexpected overlay selector: {selector}");
        }
        let current = self.current.clone().unwrap_or_default();
        self.overlay_removals.push(current);
        Ok(1)
    }
}
