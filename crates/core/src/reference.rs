//! Reference-image modes and their field groups.
//!
//! A video generation request may supply reference imagery in one of four
//! shapes. [`resolve_reference`] normalises the raw request fields into a
//! [`ResolvedReference`] in which only the field group matching the mode is
//! populated. The multi-image list crosses the storage boundary as a JSON
//! array string; see [`encode_reference_urls`] and [`decode_reference_urls`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Single source image.
pub const MODE_SINGLE: &str = "single";
/// First-frame / last-frame pair.
pub const MODE_FIRST_LAST: &str = "first_last";
/// Ordered list of reference images.
pub const MODE_MULTIPLE: &str = "multiple";
/// Text-only generation.
pub const MODE_NONE: &str = "none";

/// All valid reference mode strings.
pub const VALID_REFERENCE_MODES: &[&str] = &[MODE_SINGLE, MODE_FIRST_LAST, MODE_MULTIPLE, MODE_NONE];

/// Which reference-image field group a job supplies to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    Single,
    FirstLast,
    Multiple,
    None,
}

impl ReferenceMode {
    /// The persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => MODE_SINGLE,
            Self::FirstLast => MODE_FIRST_LAST,
            Self::Multiple => MODE_MULTIPLE,
            Self::None => MODE_NONE,
        }
    }
}

impl fmt::Display for ReferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            MODE_SINGLE => Ok(Self::Single),
            MODE_FIRST_LAST => Ok(Self::FirstLast),
            MODE_MULTIPLE => Ok(Self::Multiple),
            MODE_NONE => Ok(Self::None),
            other => Err(CoreError::Validation(format!(
                "Unknown reference mode: '{other}'. Valid modes: {}",
                VALID_REFERENCE_MODES.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Raw reference fields as they arrive on a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceInput<'a> {
    pub mode: Option<ReferenceMode>,
    pub image_url: Option<&'a str>,
    pub first_frame_url: Option<&'a str>,
    pub last_frame_url: Option<&'a str>,
    pub reference_image_urls: &'a [String],
}

/// A reference field group consistent with its mode.
///
/// Exactly the fields belonging to `mode` may be `Some`/non-empty; every
/// other field is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub mode: ReferenceMode,
    pub image_url: Option<String>,
    pub first_frame_url: Option<String>,
    pub last_frame_url: Option<String>,
    pub reference_image_urls: Vec<String>,
}

impl ResolvedReference {
    fn empty(mode: ReferenceMode) -> Self {
        Self {
            mode,
            image_url: None,
            first_frame_url: None,
            last_frame_url: None,
            reference_image_urls: Vec::new(),
        }
    }
}

/// Normalise the request's reference fields.
///
/// With an explicit mode, only that mode's fields are kept and at least one
/// of them must be present (`none` keeps nothing). Without a mode, the mode
/// is inferred from the first non-empty group in priority order: single
/// image, then first/last frame, then multiple images; `none` if nothing was
/// supplied. Blank strings count as absent.
pub fn resolve_reference(input: ReferenceInput<'_>) -> Result<ResolvedReference, CoreError> {
    let image_url = non_blank(input.image_url);
    let first = non_blank(input.first_frame_url);
    let last = non_blank(input.last_frame_url);
    let refs: Vec<String> = input
        .reference_image_urls
        .iter()
        .filter(|u| !u.trim().is_empty())
        .cloned()
        .collect();

    let mode = match input.mode {
        Some(mode) => mode,
        None if image_url.is_some() => ReferenceMode::Single,
        None if first.is_some() || last.is_some() => ReferenceMode::FirstLast,
        None if !refs.is_empty() => ReferenceMode::Multiple,
        None => ReferenceMode::None,
    };

    let mut resolved = ResolvedReference::empty(mode);
    match mode {
        ReferenceMode::Single => {
            resolved.image_url = Some(image_url.ok_or_else(|| {
                CoreError::Validation("reference mode 'single' requires image_url".to_string())
            })?);
        }
        ReferenceMode::FirstLast => {
            if first.is_none() && last.is_none() {
                return Err(CoreError::Validation(
                    "reference mode 'first_last' requires first_frame_url or last_frame_url"
                        .to_string(),
                ));
            }
            resolved.first_frame_url = first;
            resolved.last_frame_url = last;
        }
        ReferenceMode::Multiple => {
            if refs.is_empty() {
                return Err(CoreError::Validation(
                    "reference mode 'multiple' requires at least one reference_image_url"
                        .to_string(),
                ));
            }
            resolved.reference_image_urls = refs;
        }
        ReferenceMode::None => {}
    }

    Ok(resolved)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Storage boundary
// ---------------------------------------------------------------------------

/// Serialize the ordered reference URL list for storage.
pub fn encode_reference_urls(urls: &[String]) -> Result<String, CoreError> {
    serde_json::to_string(urls)
        .map_err(|e| CoreError::Internal(format!("failed to encode reference image urls: {e}")))
}

/// Deserialize a stored reference URL blob.
///
/// Anything other than a JSON array of strings is a configuration-class
/// failure for the job that owns the blob.
pub fn decode_reference_urls(blob: &str) -> Result<Vec<String>, CoreError> {
    serde_json::from_str::<Vec<String>>(blob).map_err(|e| {
        CoreError::Configuration(format!("malformed reference_image_urls blob: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mode_round_trips_through_str() {
        for s in VALID_REFERENCE_MODES {
            let mode: ReferenceMode = s.parse().unwrap();
            assert_eq!(mode.as_str(), *s);
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert_matches!("sequence".parse::<ReferenceMode>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn explicit_single_drops_other_groups() {
        let refs = urls(&["http://x/a.png"]);
        let resolved = resolve_reference(ReferenceInput {
            mode: Some(ReferenceMode::Single),
            image_url: Some("http://x/img.png"),
            first_frame_url: Some("http://x/first.png"),
            last_frame_url: None,
            reference_image_urls: &refs,
        })
        .unwrap();

        assert_eq!(resolved.mode, ReferenceMode::Single);
        assert_eq!(resolved.image_url.as_deref(), Some("http://x/img.png"));
        assert!(resolved.first_frame_url.is_none());
        assert!(resolved.reference_image_urls.is_empty());
    }

    #[test]
    fn explicit_none_keeps_nothing() {
        let resolved = resolve_reference(ReferenceInput {
            mode: Some(ReferenceMode::None),
            image_url: Some("http://x/img.png"),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(resolved, ResolvedReference::empty(ReferenceMode::None));
    }

    #[test]
    fn explicit_mode_without_fields_is_invalid() {
        let result = resolve_reference(ReferenceInput {
            mode: Some(ReferenceMode::Multiple),
            ..Default::default()
        });
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn infers_single_before_first_last() {
        let resolved = resolve_reference(ReferenceInput {
            image_url: Some("http://x/img.png"),
            last_frame_url: Some("http://x/last.png"),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(resolved.mode, ReferenceMode::Single);
        assert!(resolved.last_frame_url.is_none());
    }

    #[test]
    fn infers_first_last_from_last_frame_only() {
        let resolved = resolve_reference(ReferenceInput {
            image_url: Some("   "),
            last_frame_url: Some("http://x/last.png"),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(resolved.mode, ReferenceMode::FirstLast);
        assert!(resolved.first_frame_url.is_none());
        assert_eq!(resolved.last_frame_url.as_deref(), Some("http://x/last.png"));
    }

    #[test]
    fn infers_multiple_and_skips_blank_entries() {
        let refs = urls(&["http://x/a.png", "", "http://x/b.png"]);
        let resolved = resolve_reference(ReferenceInput {
            reference_image_urls: &refs,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(resolved.mode, ReferenceMode::Multiple);
        assert_eq!(resolved.reference_image_urls, urls(&["http://x/a.png", "http://x/b.png"]));
    }

    #[test]
    fn infers_none_when_nothing_supplied() {
        let resolved = resolve_reference(ReferenceInput::default()).unwrap();
        assert_eq!(resolved.mode, ReferenceMode::None);
    }

    #[test]
    fn reference_blob_preserves_order() {
        let list = urls(&["http://x/2.png", "http://x/1.png"]);
        let blob = encode_reference_urls(&list).unwrap();
        assert_eq!(decode_reference_urls(&blob).unwrap(), list);
    }

    #[test]
    fn malformed_blob_is_configuration_error() {
        assert_matches!(decode_reference_urls("not json"), Err(CoreError::Configuration(_)));
        assert_matches!(decode_reference_urls("[1, 2]"), Err(CoreError::Configuration(_)));
    }
}
