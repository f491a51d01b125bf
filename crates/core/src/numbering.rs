//! Numbering classifier: recognizes the leading outline token of each element.
//!
//! Families are tried in priority order (decimal, Roman, letter) and the
//! first match wins. Single characters that are both a letter marker and a
//! Roman numeral ("I.", "C)") are settled by an [`AmbiguityPolicy`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::NumberingConfig;
use crate::diagnostics::Diagnostic;
use crate::element::ContentElement;

static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*)(?:[.:)\-–—]+\s*|\s+|$)").expect("decimal pattern is valid")
});

static MARKER_STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)(?:\.(?:\s+|$)|[):]\s*|\s+[-–—]\s*)")
        .expect("marker pattern is valid")
});

static MARKER_LENIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)(?:\.(?:\s+|$)|[):]\s*|\s+[-–—]\s*|\s+)")
        .expect("marker pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingFamily {
    DecimalMultiLevel,
    Roman,
    LetterOutline,
    None,
}

impl fmt::Display for NumberingFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberingFamily::DecimalMultiLevel => write!(f, "decimal"),
            NumberingFamily::Roman => write!(f, "roman"),
            NumberingFamily::LetterOutline => write!(f, "letter"),
            NumberingFamily::None => write!(f, "none"),
        }
    }
}

/// How to read a single character that is both a letter and a Roman numeral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// Decide from the surrounding markers.
    #[default]
    Contextual,
    PreferRoman,
    PreferLetter,
}

/// The numbering recognized at the start of an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingToken {
    pub family: NumberingFamily,
    /// Path length for decimals, nesting depth for markers, heading level
    /// for unnumbered headings, 0 otherwise.
    pub depth: u8,
    pub ordinal_path: Vec<u32>,
    /// The marker as written, e.g. `1.2` or `IV`. Empty when unnumbered.
    pub marker: String,
    /// Text after the marker and its separator.
    pub label: String,
}

impl NumberingToken {
    fn unnumbered(element: &ContentElement) -> Self {
        Self {
            family: NumberingFamily::None,
            depth: element.tag_kind.heading_level().unwrap_or(0),
            ordinal_path: Vec::new(),
            marker: String::new(),
            label: element.raw_text.clone(),
        }
    }

    pub fn is_numbered(&self) -> bool {
        self.family != NumberingFamily::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedElement {
    pub element: ContentElement,
    pub token: NumberingToken,
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub elements: Vec<ClassifiedElement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Classification {
    pub fn numbered_count(&self) -> usize {
        self.elements.iter().filter(|c| c.token.is_numbered()).count()
    }
}

/// Syntactic match before context is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    Decimal { path: Vec<u32> },
    Roman { value: u32 },
    Letter { ordinal: u32 },
    Ambiguous { value: u32, ordinal: u32 },
    Unnumbered,
}

struct Recognized {
    candidate: Candidate,
    marker: String,
    label: String,
}

/// Classify every element. Output order and length equal the input's.
pub fn classify(elements: Vec<ContentElement>, config: &NumberingConfig) -> Classification {
    let recognized: Vec<Recognized> = elements
        .iter()
        .map(|element| recognize(&element.raw_text, config))
        .collect();

    // Family of the next unambiguous marker at or after each position.
    let mut next_marker: Vec<Option<NumberingFamily>> = vec![None; recognized.len() + 1];
    for i in (0..recognized.len()).rev() {
        next_marker[i] = match recognized[i].candidate {
            Candidate::Roman { .. } => Some(NumberingFamily::Roman),
            Candidate::Letter { .. } => Some(NumberingFamily::LetterOutline),
            _ => next_marker[i + 1],
        };
    }

    let mut classification = Classification::default();
    let mut decimal_depth: Option<u8> = None;
    let mut roman_seen = false;
    let mut last_letter: Option<u32> = None;

    for (i, (element, recognized)) in elements.into_iter().zip(recognized).enumerate() {
        let Recognized {
            candidate,
            marker,
            label,
        } = recognized;

        let nested_depth = decimal_depth.map_or(1, |depth| depth.saturating_add(1));

        let token = match candidate {
            Candidate::Unnumbered => NumberingToken::unnumbered(&element),
            Candidate::Decimal { path } => {
                let depth = path.len() as u8;
                decimal_depth = Some(depth);
                NumberingToken {
                    family: NumberingFamily::DecimalMultiLevel,
                    depth,
                    ordinal_path: path,
                    marker,
                    label,
                }
            }
            Candidate::Roman { value } => {
                roman_seen = true;
                last_letter = None;
                marker_token(NumberingFamily::Roman, nested_depth, value, marker, label)
            }
            Candidate::Letter { ordinal } => {
                last_letter = Some(ordinal);
                marker_token(
                    NumberingFamily::LetterOutline,
                    nested_depth,
                    ordinal,
                    marker,
                    label,
                )
            }
            Candidate::Ambiguous { value, ordinal } => {
                let family = match config.ambiguity {
                    AmbiguityPolicy::PreferRoman => NumberingFamily::Roman,
                    AmbiguityPolicy::PreferLetter => NumberingFamily::LetterOutline,
                    AmbiguityPolicy::Contextual => {
                        if last_letter.is_some_and(|previous| previous + 1 == ordinal) {
                            NumberingFamily::LetterOutline
                        } else if roman_seen
                            || next_marker[i + 1] == Some(NumberingFamily::Roman)
                        {
                            NumberingFamily::Roman
                        } else {
                            NumberingFamily::LetterOutline
                        }
                    }
                };

                let diagnostic = Diagnostic::AmbiguousNumbering {
                    sequence_index: element.sequence_index,
                    token: marker.clone(),
                    resolved: family,
                };
                diagnostic.log();
                classification.diagnostics.push(diagnostic);

                if family == NumberingFamily::Roman {
                    roman_seen = true;
                    last_letter = None;
                    marker_token(family, nested_depth, value, marker, label)
                } else {
                    last_letter = Some(ordinal);
                    marker_token(family, nested_depth, ordinal, marker, label)
                }
            }
        };

        if token.is_numbered() {
            log::trace!(
                "element #{}: {} marker '{}' at depth {}",
                element.sequence_index,
                token.family,
                token.marker,
                token.depth
            );
        }

        classification
            .elements
            .push(ClassifiedElement { element, token });
    }

    log::debug!(
        "classified {} element(s), {} numbered",
        classification.elements.len(),
        classification.numbered_count()
    );

    classification
}

fn marker_token(
    family: NumberingFamily,
    depth: u8,
    ordinal: u32,
    marker: String,
    label: String,
) -> NumberingToken {
    NumberingToken {
        family,
        depth,
        ordinal_path: vec![ordinal],
        marker,
        label,
    }
}

fn recognize(text: &str, config: &NumberingConfig) -> Recognized {
    if let Some(recognized) = recognize_decimal(text, config) {
        return recognized;
    }
    if let Some(recognized) = recognize_marker(text, config) {
        return recognized;
    }
    Recognized {
        candidate: Candidate::Unnumbered,
        marker: String::new(),
        label: text.to_string(),
    }
}

fn recognize_decimal(text: &str, config: &NumberingConfig) -> Option<Recognized> {
    let caps = DECIMAL_RE.captures(text)?;
    let marker = caps.get(1)?.as_str();

    let path = marker
        .split('.')
        .map(|segment| segment.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    if path.len() > config.max_decimal_segments
        || path.first().is_some_and(|first| *first == 0)
        || path.iter().any(|segment| *segment > config.max_ordinal)
    {
        return None;
    }

    Some(Recognized {
        candidate: Candidate::Decimal { path },
        marker: marker.to_string(),
        label: text[caps.get(0)?.end()..].trim().to_string(),
    })
}

fn recognize_marker(text: &str, config: &NumberingConfig) -> Option<Recognized> {
    let pattern = if config.marker_whitespace_separator {
        &*MARKER_LENIENT_RE
    } else {
        &*MARKER_STRICT_RE
    };

    let caps = pattern.captures(text)?;
    let marker = caps.get(1)?.as_str();
    let label = text[caps.get(0)?.end()..].trim().to_string();

    let roman = parse_roman(marker).filter(|value| *value <= config.max_roman);
    let letter = letter_ordinal(marker);

    let candidate = match (roman, letter) {
        (Some(value), Some(ordinal)) => Candidate::Ambiguous { value, ordinal },
        (Some(value), None) => Candidate::Roman { value },
        (None, Some(ordinal)) => Candidate::Letter { ordinal },
        (None, None) => return None,
    };

    Some(Recognized {
        candidate,
        marker: marker.to_string(),
        label,
    })
}

fn letter_ordinal(marker: &str) -> Option<u32> {
    let mut chars = marker.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some(u32::from(c.to_ascii_lowercase() as u8 - b'a') + 1)
        }
        _ => None,
    }
}

const ROMAN_DIGITS: &[(u32, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Parse a canonical Roman numeral written in a single case.
///
/// Non-canonical spellings ("IIII", "VX") and mixed case ("Mix") are rejected.
pub fn parse_roman(numeral: &str) -> Option<u32> {
    if numeral.is_empty() {
        return None;
    }
    let all_upper = numeral.chars().all(|c| c.is_ascii_uppercase());
    let all_lower = numeral.chars().all(|c| c.is_ascii_lowercase());
    if !all_upper && !all_lower {
        return None;
    }

    let upper = numeral.to_ascii_uppercase();
    let mut rest = upper.as_str();
    let mut value = 0;
    for (digit_value, digit) in ROMAN_DIGITS {
        while let Some(stripped) = rest.strip_prefix(digit) {
            value += digit_value;
            rest = stripped;
        }
    }

    if !rest.is_empty() || value == 0 || to_roman(value) != upper {
        return None;
    }
    Some(value)
}

fn to_roman(mut value: u32) -> String {
    let mut out = String::new();
    for (digit_value, digit) in ROMAN_DIGITS {
        while value >= *digit_value {
            out.push_str(digit);
            value -= digit_value;
        }
    }
    out
}
