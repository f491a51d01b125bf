//! Pure evaluation of the readiness checks.
//!
//! The async poll loop lives in the shell crate; this module only answers
//! "given what the container looks like right now, and what it looked like
//! on the previous tick, how far along is it?".

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ReadinessConfig;
use crate::element::normalize_text;

/// Progress of a container towards being safe to scan.
///
/// States are ordered: a container that reached `Visible` has passed every
/// earlier check in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    Unchecked,
    ContentPresent,
    DomAttached,
    Visible,
    TextMeaningful,
    ImagesSettled,
    DynamicSettled,
    Ready,
    TimedOut,
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadinessState::Unchecked => "unchecked",
            ReadinessState::ContentPresent => "content_present",
            ReadinessState::DomAttached => "dom_attached",
            ReadinessState::Visible => "visible",
            ReadinessState::TextMeaningful => "text_meaningful",
            ReadinessState::ImagesSettled => "images_settled",
            ReadinessState::DynamicSettled => "dynamic_settled",
            ReadinessState::Ready => "ready",
            ReadinessState::TimedOut => "timed_out",
        };
        write!(f, "{name}")
    }
}

/// Load status of one embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLoad {
    Pending,
    Loaded,
    Errored,
}

impl ImageLoad {
    /// Errored images count as settled; only pending ones block.
    pub fn is_settled(self) -> bool {
        !matches!(self, ImageLoad::Pending)
    }
}

/// What a probe observed about the container on one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Serialized container content. `None` when the container is missing.
    pub html: Option<String>,
    pub attached: bool,
    pub visible: bool,
    /// Rendered text content.
    pub text: String,
    pub images: Vec<ImageLoad>,
}

impl ContainerSnapshot {
    /// Fingerprint used to detect content mutation between ticks.
    pub fn fingerprint(&self) -> Option<[u8; 16]> {
        self.html.as_ref().map(|html| md5::compute(html.as_bytes()).0)
    }

    pub fn pending_images(&self) -> usize {
        self.images.iter().filter(|image| !image.is_settled()).count()
    }
}

/// Why the gate is still waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitReason {
    NoContent,
    Detached,
    Hidden,
    TextTooShort { chars: usize, required: usize },
    PlaceholderOnly(String),
    ImagesPending { pending: usize, total: usize },
    ContentChanging,
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitReason::NoContent => write!(f, "container missing or empty"),
            WaitReason::Detached => write!(f, "container not attached"),
            WaitReason::Hidden => write!(f, "container hidden or zero-size"),
            WaitReason::TextTooShort { chars, required } => {
                write!(f, "text too short ({chars} < {required} chars)")
            }
            WaitReason::PlaceholderOnly(text) => write!(f, "placeholder text only: '{text}'"),
            WaitReason::ImagesPending { pending, total } => {
                write!(f, "{pending} of {total} image(s) still loading")
            }
            WaitReason::ContentChanging => write!(f, "content changed since previous tick"),
        }
    }
}

/// Result of evaluating one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Furthest state reached this tick.
    pub state: ReadinessState,
    /// First failing check, `None` when `state` is `Ready`.
    pub waiting_on: Option<WaitReason>,
}

impl Evaluation {
    pub fn is_ready(&self) -> bool {
        self.state == ReadinessState::Ready
    }

    fn blocked(state: ReadinessState, reason: WaitReason) -> Self {
        Self {
            state,
            waiting_on: Some(reason),
        }
    }
}

/// Run the six checks in order against `snapshot`.
///
/// `previous` is the fingerprint seen on the previous tick; the content is
/// only considered settled when it is unchanged across two ticks.
pub fn evaluate(
    snapshot: &ContainerSnapshot,
    previous: Option<&[u8; 16]>,
    config: &ReadinessConfig,
) -> Evaluation {
    let html = match snapshot.html.as_deref() {
        Some(html) if !html.is_empty() => html,
        _ => return Evaluation::blocked(ReadinessState::Unchecked, WaitReason::NoContent),
    };

    if !snapshot.attached {
        return Evaluation::blocked(ReadinessState::ContentPresent, WaitReason::Detached);
    }

    if !snapshot.visible {
        return Evaluation::blocked(ReadinessState::DomAttached, WaitReason::Hidden);
    }

    let text = normalize_text(&snapshot.text);
    let chars = text.chars().count();
    if chars < config.min_text_chars {
        return Evaluation::blocked(
            ReadinessState::Visible,
            WaitReason::TextTooShort {
                chars,
                required: config.min_text_chars,
            },
        );
    }
    if is_placeholder(&text, &config.placeholders) {
        return Evaluation::blocked(ReadinessState::Visible, WaitReason::PlaceholderOnly(text));
    }

    let pending = snapshot.pending_images();
    if pending > 0 {
        return Evaluation::blocked(
            ReadinessState::TextMeaningful,
            WaitReason::ImagesPending {
                pending,
                total: snapshot.images.len(),
            },
        );
    }

    let current = md5::compute(html.as_bytes()).0;
    if previous != Some(&current) {
        return Evaluation::blocked(ReadinessState::ImagesSettled, WaitReason::ContentChanging);
    }

    Evaluation {
        state: ReadinessState::Ready,
        waiting_on: None,
    }
}

fn is_placeholder(text: &str, placeholders: &[String]) -> bool {
    let lowered = text.to_lowercase();
    placeholders
        .iter()
        .any(|placeholder| normalize_text(placeholder).to_lowercase() == lowered)
}
