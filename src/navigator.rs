use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::browser::BrowserPage;
use crate::config::Selectors;

/// Fails when the page shows a cloudflare challenge instead of content.
pub async fn ensure_not_challenged<P: BrowserPage>(page: &mut P, marker: &str) -> anyhow::Result<()> {
    let found = page
        .find_elements(marker)
        .await
        .context("look for cloudflare challenge")?;
    if !found.is_empty() {
        anyhow::bail!(
            "cloudflare challenge detected (found `{marker}`); solve it in the browser and rerun"
        );
    }
    Ok(())
}

/// Loads a chapter page and strips the floating overlays that would end up in screenshots.
pub async fn navigate_to_chapter<P: BrowserPage>(
    page: &mut P,
    url: &Url,
    timeout: Duration,
    selectors: &Selectors,
) -> anyhow::Result<()> {
    tracing::debug!(%url, timeout_ms = timeout.as_millis() as u64, "navigating to chapter");
    page.navigate(url, timeout).await?;

    ensure_not_challenged(page, &selectors.cloudflare_marker).await?;

    let removed = page
        .remove_elements(&selectors.overlays)
        .await
        .context("remove overlays")?;
    tracing::debug!(removed, selector = %selectors.overlays, "removed overlay elements");
    Ok(())
}
