/// Failures while observing a document.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Browser error: {0}")]
    Browser(String),
}
