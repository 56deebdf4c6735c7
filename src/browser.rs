use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chromiumoxide::Browser;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt as _};
use serde::Deserialize;
use tokio::task::JoinHandle;
use url::Url;

const DEBUG_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(5);
const TAB_POLL_ATTEMPTS: usize = 20;
const TAB_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// chromiumoxide's own per-request default.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// A single browser tab, driven by one caller at a time.
#[async_trait]
pub trait BrowserPage: Send {
    type Element: Send + Sync;

    /// All elements matching `selector`, in document order. No match is not an error.
    async fn find_elements(&mut self, selector: &str) -> anyhow::Result<Vec<Self::Element>>;

    async fn inner_text(&mut self, element: &Self::Element) -> anyhow::Result<String>;

    async fn screenshot_png(&mut self, element: &Self::Element) -> anyhow::Result<Vec<u8>>;

    /// Loads `url` and returns once it settled; exceeding `timeout` is an error.
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> anyhow::Result<()>;

    /// Removes every element matching `selector` from the live DOM and returns how many.
    async fn remove_elements(&mut self, selector: &str) -> anyhow::Result<usize>;
}

#[derive(Debug, Deserialize)]
struct JsonVersion {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

pub fn debug_endpoint(host: &str, port: u16) -> String {
    format!("http://{host}:{port}/json/version")
}

/// Asks an already running chrome for its browser websocket url.
pub async fn debug_ws_url(host: &str, port: u16) -> anyhow::Result<String> {
    let endpoint = debug_endpoint(host, port);
    let client = reqwest::Client::builder()
        .timeout(DEBUG_ENDPOINT_TIMEOUT)
        .build()
        .context("build debug endpoint http client")?;

    let response = client.get(&endpoint).send().await.with_context(|| {
        format!(
            "GET {endpoint}; is chrome running with --remote-debugging-port={port}?"
        )
    })?;
    if !response.status().is_success() {
        anyhow::bail!(
            "GET {endpoint} returned {}; is chrome running with --remote-debugging-port={port}?",
            response.status()
        );
    }

    let version: JsonVersion = response
        .json()
        .await
        .with_context(|| format!("parse {endpoint} response"))?;
    Ok(version.web_socket_debugger_url)
}

/// CDP request timeout for a session whose navigations may take `navigation`.
///
/// Must outlast the navigation timeout so that a slow `goto` is cut off by our
/// own deadline, not by the handler.
pub fn handler_request_timeout(navigation: Duration) -> Duration {
    DEFAULT_REQUEST_TIMEOUT.max(navigation + REQUEST_TIMEOUT_MARGIN)
}

/// Connection to a user-launched chrome. Disconnecting leaves the browser running.
pub struct ChromeSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromeSession {
    /// Attaches to the browser and returns its first open tab.
    pub async fn connect(
        host: &str,
        port: u16,
        request_timeout: Duration,
    ) -> anyhow::Result<(Self, ChromePage)> {
        let ws_url = debug_ws_url(host, port).await?;
        tracing::debug!(%ws_url, ?request_timeout, "resolved browser websocket");

        let handler_config = HandlerConfig {
            request_timeout,
            ..HandlerConfig::default()
        };
        let (mut browser, mut handler) =
            Browser::connect_with_config(ws_url.clone(), handler_config)
                .await
                .with_context(|| format!("connect to {ws_url}"))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(?err, "cdp handler event error");
                }
            }
        });

        let page = match first_tab(&mut browser).await {
            Ok(page) => page,
            Err(err) => {
                Self {
                    browser,
                    handler_task,
                }
                .disconnect()
                .await;
                return Err(err);
            }
        };

        tracing::info!("connected to browser");
        tracing::info!("keep the chrome window focused while downloading, or captures may stall");

        Ok((
            Self {
                browser,
                handler_task,
            },
            ChromePage { page },
        ))
    }

    pub async fn disconnect(self) {
        let Self {
            browser,
            handler_task,
        } = self;
        drop(browser);
        handler_task.abort();
        let _ = handler_task.await;
        tracing::info!("disconnected from browser");
    }
}

async fn first_tab(browser: &mut Browser) -> anyhow::Result<Page> {
    browser
        .fetch_targets()
        .await
        .context("fetch browser targets")?;

    for _ in 0..TAB_POLL_ATTEMPTS {
        let pages = browser.pages().await.context("list open tabs")?;
        if let Some(page) = pages.into_iter().next() {
            return Ok(page);
        }
        tokio::time::sleep(TAB_POLL_INTERVAL).await;
    }

    anyhow::bail!("no open tab found; open the chapter listing page in chrome first")
}

pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromePage {
    type Element = Element;

    async fn find_elements(&mut self, selector: &str) -> anyhow::Result<Vec<Element>> {
        self.page
            .find_elements(selector)
            .await
            .with_context(|| format!("query selector: {selector}"))
    }

    async fn inner_text(&mut self, element: &Element) -> anyhow::Result<String> {
        let text = element.inner_text().await.context("read innerText")?;
        Ok(text.unwrap_or_default())
    }

    async fn screenshot_png(&mut self, element: &Element) -> anyhow::Result<Vec<u8>> {
        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .context("capture element screenshot")
    }

    async fn navigate(&mut self, url: &Url, timeout: Duration) -> anyhow::Result<()> {
        let page = &self.page;
        let settle = async {
            page.execute(SetLifecycleEventsEnabledParams::new(true))
                .await
                .context("enable lifecycle events")?;
            let main_frame = page.mainframe().await.context("resolve main frame")?;
            let events = page
                .event_listener::<EventLifecycleEvent>()
                .await
                .context("subscribe to lifecycle events")?;

            page.goto(url.as_str())
                .await
                .with_context(|| format!("navigate to {url}"))?;

            let names = events
                .filter(move |event| {
                    let own_frame = main_frame
                        .as_ref()
                        .is_none_or(|frame| *frame == event.frame_id);
                    futures::future::ready(own_frame)
                })
                .map(|event| event.name.clone());
            if !wait_for_network_idle(names).await {
                anyhow::bail!("lifecycle events stopped before {url} settled");
            }
            anyhow::Ok(())
        };

        match tokio::time::timeout(timeout, settle).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!(
                "navigation timed out after {}ms: {url}",
                timeout.as_millis()
            ),
        }
    }

    async fn remove_elements(&mut self, selector: &str) -> anyhow::Result<usize> {
        let selector_js = serde_json::to_string(selector).context("encode selector")?;
        let script = format!(
            "(() => {{ const found = document.querySelectorAll({selector_js}); found.forEach((el) => el.remove()); return found.length; }})()"
        );

        let removed = self
            .page
            .evaluate(script.as_str())
            .await
            .with_context(|| format!("remove elements: {selector}"))?
            .into_value::<usize>()
            .context("decode removed element count")?;
        Ok(removed)
    }
}

/// Consumes main-frame lifecycle event names until the document committed
/// after the wait started reports `networkIdle`. Events before its `init`
/// belong to the previous document. Returns false if the stream ends first.
async fn wait_for_network_idle<S: Stream<Item = String>>(names: S) -> bool {
    let mut names = std::pin::pin!(names);
    let mut committed = false;
    while let Some(name) = names.next().await {
        match name.as_str() {
            "init" => committed = true,
            "networkIdle" if committed => return true,
            _ => {}
        }
    }
    false
}
