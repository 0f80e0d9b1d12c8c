//! Chapter markup rewriting
//!
//! Post-processes a chapter resource's raw markup: body extraction,
//! script/style stripping, inline-event-handler neutralization, and
//! rewriting of `src`/`href` attributes against the manifest so they
//! point at externally-addressable URLs. This is pure pattern
//! substitution over the whole document string; no structural markup
//! model is built. Newlines are swapped for a placeholder up front so
//! the patterns can span lines, and restored at the end.
//!
//! The two URL policies are deliberately asymmetric: an unmatched `src`
//! is dropped from the tag, an unmatched `href` is left byte-for-byte
//! unchanged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::book::package::resolve_path;
use crate::book::types::Manifest;

/// Media types eligible for chapter retrieval and rewriting
pub(crate) const CHAPTER_MEDIA_TYPES: [&str; 2] = ["application/xhtml+xml", "image/svg+xml"];

const NEWLINE_PLACEHOLDER: char = '\u{0}';

static BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<body[^>]*>(.*)</body[^>]*>").unwrap());
static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<script.*?</script[^>]*>").unwrap());
static STYLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<style.*?</style[^>]*>").unwrap());
static HANDLER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bon\w+\s*=").unwrap());
static SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

pub(crate) fn is_chapter_media_type(media_type: &str) -> bool {
    CHAPTER_MEDIA_TYPES.contains(&media_type)
}

/// Rewrite one chapter's markup against the manifest.
pub(crate) fn rewrite(
    raw: &str,
    resource_dir: &[String],
    manifest: &Manifest,
    image_root: &str,
    link_root: &str,
) -> String {
    let text = raw.replace('\n', "\u{0}");

    let text = match BODY_RE.captures(&text) {
        Some(caps) => caps[1].to_string(),
        None => text,
    };

    let text = SCRIPT_RE.replace_all(&text, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = HANDLER_RE.replace_all(&text, "x-$0");

    let text = SRC_RE.replace_all(&text, |caps: &Captures| {
        let value = quoted_value(caps);
        let resolved = resolve_path(value.trim(), resource_dir);
        match manifest.index_by_href(&resolved).and_then(|i| manifest.get(i)) {
            Some(item) => format!(r#"src="{image_root}{}/{resolved}""#, item.id),
            None => {
                tracing::debug!(src = value, "image source not in manifest; dropped");
                String::new()
            }
        }
    });

    let text = HREF_RE.replace_all(&text, |caps: &Captures| {
        let value = quoted_value(caps);
        let (path, fragment) = match value.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (value, None),
        };
        let resolved = resolve_path(path.trim(), resource_dir);
        match manifest
            .index_by_href_ignoring_fragment(&resolved)
            .and_then(|i| manifest.get(i))
        {
            Some(item) => {
                let fragment = fragment.map(|f| format!("#{f}")).unwrap_or_default();
                format!(r#"href="{link_root}{}/{resolved}{fragment}""#, item.id)
            }
            None => caps[0].to_string(),
        }
    });

    text.replace(NEWLINE_PLACEHOLDER, "\n").trim().to_string()
}

fn quoted_value<'a>(caps: &'a Captures) -> &'a str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str())
}
