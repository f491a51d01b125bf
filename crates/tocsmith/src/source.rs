//! Waits for a document source to be ready and returns its container HTML.

use std::path::Path;

use tocsmith_core::{Diagnostic, TocConfig};

use crate::gate::{GateOutcome, ReadinessGate};
use crate::prelude::*;
use crate::probe::{ChromeProbe, ContentProbe, FileProbe};

/// Container content that passed (or timed out of) the readiness gate.
#[derive(Debug)]
pub struct Acquired {
    /// Outer HTML of the container, already narrowed by the selector.
    pub html: String,
    pub diagnostic: Option<Diagnostic>,
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Probe `source` until ready. `Ok(None)` means the user cancelled.
pub async fn acquire(source: &str, config: &TocConfig) -> Result<Option<Acquired>> {
    let selector = config.scan.selector.clone();

    if let Some(selector) = &selector {
        scraper::Selector::parse(selector)
            .map_err(|e| eyre!("Invalid selector '{}': {}", selector, e))?;
    }

    if is_url(source) {
        log::info!("opening {source} in headless Chrome");
        let mut probe =
            ChromeProbe::launch(source.to_string(), selector, config.readiness.timeout())
                .await?;
        wait_for(&mut probe, config).await
    } else {
        let path = Path::new(source);
        if !path.exists() {
            log::warn!("{} does not exist yet, waiting for it", path.display());
        }
        let mut probe = FileProbe::new(path, selector);
        wait_for(&mut probe, config).await
    }
}

async fn wait_for<P: ContentProbe>(probe: &mut P, config: &TocConfig) -> Result<Option<Acquired>> {
    let (mut gate, handle) = ReadinessGate::new(config.readiness.clone());

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let outcome = gate.wait(probe).await;
    ctrl_c.abort();

    if let GateOutcome::Ready { ticks, elapsed, .. } = &outcome {
        log::info!("content ready after {ticks} tick(s) in {elapsed:?}");
    }

    Ok(outcome.into_content().map(|(snapshot, diagnostic)| Acquired {
        html: snapshot.html.unwrap_or_default(),
        diagnostic,
    }))
}

/// The config to run synthesis with on acquired content.
///
/// The probe already narrowed the document to the container, and the
/// container element is part of that HTML.
pub fn container_config(config: &TocConfig) -> TocConfig {
    let mut config = config.clone();
    config.scan.selector = None;
    config
}
