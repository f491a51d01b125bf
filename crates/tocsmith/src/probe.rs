//! Probes observe the content container once per readiness tick.
//!
//! [`FileProbe`] re-reads a local HTML file on every tick, so a file that is
//! still being written settles the same way a page does. [`ChromeProbe`]
//! drives a headless Chrome tab and reports live layout and image state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, Tab};
use serde::Deserialize;
use tocsmith_core::readiness::{ContainerSnapshot, ImageLoad};

use crate::error::Error;

/// A source of container snapshots.
#[allow(async_fn_in_trait)]
pub trait ContentProbe {
    async fn probe(&mut self) -> Result<ContainerSnapshot, Error>;
}

/// Reads a local HTML file.
#[derive(Debug, Clone)]
pub struct FileProbe {
    path: PathBuf,
    selector: Option<String>,
}

impl FileProbe {
    pub fn new(path: impl Into<PathBuf>, selector: Option<String>) -> Self {
        Self {
            path: path.into(),
            selector,
        }
    }
}

impl ContentProbe for FileProbe {
    async fn probe(&mut self) -> Result<ContainerSnapshot, Error> {
        let html = match tokio::fs::read_to_string(&self.path).await {
            Ok(html) => html,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} does not exist yet", self.path.display());
                return Ok(ContainerSnapshot::default());
            }
            Err(err) => {
                return Err(Error::Probe(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };

        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        snapshot_from_html(&html, self.selector.as_deref(), base_dir)
    }
}

/// Build a snapshot of the selected container in a static document.
///
/// The snapshot carries the container's outer HTML.
/// A static file has no layout, so an attached container is also visible.
/// Images resolve against `base_dir`; remote and inline images count as loaded.
pub fn snapshot_from_html(
    html: &str,
    selector: Option<&str>,
    base_dir: &Path,
) -> Result<ContainerSnapshot, Error> {
    let document = scraper::Html::parse_document(html);

    let container = match selector {
        Some(selector) => {
            let parsed = scraper::Selector::parse(selector)
                .map_err(|e| Error::Probe(format!("invalid selector '{selector}': {e}")))?;
            document.select(&parsed).next()
        }
        None => {
            let body = scraper::Selector::parse("body")
                .map_err(|e| Error::Probe(format!("invalid selector 'body': {e}")))?;
            document.select(&body).next()
        }
    };

    let Some(container) = container else {
        return Ok(ContainerSnapshot::default());
    };

    let img = scraper::Selector::parse("img")
        .map_err(|e| Error::Probe(format!("invalid selector 'img': {e}")))?;
    let images = container
        .select(&img)
        .map(|image| image_status(image.value().attr("src"), base_dir))
        .collect();

    // The container itself is scanned too, so keep its own tag, id and text.
    // An empty container serializes to nothing.
    let html = if container.inner_html().is_empty() {
        String::new()
    } else {
        container.html()
    };

    Ok(ContainerSnapshot {
        html: Some(html),
        attached: true,
        visible: true,
        text: container.text().collect::<Vec<_>>().join(" "),
        images,
    })
}

fn image_status(src: Option<&str>, base_dir: &Path) -> ImageLoad {
    let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) else {
        return ImageLoad::Errored;
    };

    if src.starts_with("http://") || src.starts_with("https://") || src.starts_with("data:") {
        return ImageLoad::Loaded;
    }

    let local = src.strip_prefix("file://").unwrap_or(src);
    if base_dir.join(local).is_file() {
        ImageLoad::Loaded
    } else {
        ImageLoad::Errored
    }
}

/// What the in-page probe script reports back.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChromeReport {
    present: bool,
    html: String,
    attached: bool,
    visible: bool,
    text: String,
    images: Vec<ImageLoad>,
}

impl From<ChromeReport> for ContainerSnapshot {
    fn from(report: ChromeReport) -> Self {
        if !report.present {
            return ContainerSnapshot::default();
        }
        ContainerSnapshot {
            html: Some(report.html),
            attached: report.attached,
            visible: report.visible,
            text: report.text,
            images: report.images,
        }
    }
}

/// Drives a page in headless Chrome.
pub struct ChromeProbe {
    // The tab dies with the browser process.
    _browser: Browser,
    tab: Arc<Tab>,
    script: String,
}

impl ChromeProbe {
    /// Launch Chrome and navigate to `url`.
    pub async fn launch(
        url: String,
        selector: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        // headless_chrome is synchronous
        tokio::task::spawn_blocking(move || {
            let browser = Browser::default().map_err(|e| {
                Error::Browser(format!(
                    "failed to launch browser: {e}. Make sure Chrome or Chromium is installed."
                ))
            })?;

            let tab = browser
                .new_tab()
                .map_err(|e| Error::Browser(format!("failed to create new tab: {e}")))?;

            tab.set_default_timeout(timeout);

            tab.navigate_to(&url)
                .map_err(|e| Error::Browser(format!("failed to navigate to {url}: {e}")))?
                .wait_until_navigated()
                .map_err(|e| Error::Browser(format!("failed to wait for navigation: {e}")))?;

            Ok(Self {
                _browser: browser,
                tab,
                script: probe_script(selector.as_deref()),
            })
        })
        .await
        .map_err(|e| Error::Browser(format!("browser task failed: {e}")))?
    }
}

impl ContentProbe for ChromeProbe {
    async fn probe(&mut self) -> Result<ContainerSnapshot, Error> {
        let tab = self.tab.clone();
        let script = self.script.clone();

        let result = tokio::task::spawn_blocking(move || tab.evaluate(&script, false))
            .await
            .map_err(|e| Error::Browser(format!("browser task failed: {e}")))?
            .map_err(|e| Error::Browser(format!("probe script failed: {e}")))?;

        let Some(serde_json::Value::String(json)) = result.value else {
            return Err(Error::Probe("probe script returned no report".to_string()));
        };

        let report: ChromeReport = serde_json::from_str(&json)
            .map_err(|e| Error::Probe(format!("malformed probe report: {e}")))?;

        Ok(report.into())
    }
}

/// The in-page script. Evaluates to a JSON string describing the container.
fn probe_script(selector: Option<&str>) -> String {
    let query = match selector {
        // Debug formatting yields a double-quoted, escaped JS string literal.
        Some(selector) => format!("document.querySelector({selector:?})"),
        None => "document.body".to_string(),
    };

    format!(
        r#"(() => {{
    const el = {query};
    if (!el) {{ return JSON.stringify({{ present: false }}); }}
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    const visible = style.display !== "none"
        && style.visibility !== "hidden"
        && rect.width > 0 && rect.height > 0;
    const images = Array.from(el.querySelectorAll("img")).map((img) => {{
        if (!img.complete) {{ return "pending"; }}
        return img.naturalWidth > 0 ? "loaded" : "errored";
    }});
    return JSON.stringify({{
        present: true,
        html: el.innerHTML.length > 0 ? el.outerHTML : "",
        attached: el.isConnected,
        visible: visible,
        text: el.innerText || "",
        images: images,
    }});
}})()"#
    )
}
