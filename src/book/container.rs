//! Container locator
//!
//! Finds the package-document path(s) declared by the container
//! descriptor. The descriptor entry itself is matched case-insensitively
//! (`meta-inf/container.xml`); declared rootfile paths are then checked
//! against the archive's entry names exactly.

use crate::error::BookError;
use crate::xml::{Children, XmlNode};

const CONTAINER_PATH: &str = "meta-inf/container.xml";
const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// The archive entry holding the container descriptor, if any.
pub(crate) fn container_entry(entry_names: &[String]) -> Option<&str> {
    entry_names
        .iter()
        .find(|name| name.to_lowercase() == CONTAINER_PATH)
        .map(String::as_str)
}

/// Extract the declared package-document paths from a parsed container
/// descriptor and keep the ones present in the archive, in order.
pub(crate) fn rootfile_paths(
    container: &XmlNode,
    entry_names: &[String],
) -> Result<Vec<String>, BookError> {
    let rootfiles = container
        .first_child("rootfiles")
        .and_then(|node| node.child("rootfile"))
        .ok_or(BookError::NoRootfiles)?;

    let mut candidates = Vec::new();
    match rootfiles {
        Children::Single(node) => match candidate_path(node) {
            Some(path) => candidates.push(path),
            // A sole rootfile must be well-formed; a list may contain duds.
            None => return Err(BookError::RootfileFormatInvalid),
        },
        Children::Many(nodes) => {
            for node in nodes {
                if let Some(path) = candidate_path(node) {
                    candidates.push(path);
                }
            }
        }
    }

    if candidates.is_empty() {
        return Err(BookError::EmptyRootfileList);
    }

    let found: Vec<String> = candidates
        .iter()
        .filter(|path| entry_names.iter().any(|name| name == *path))
        .cloned()
        .collect();

    if found.is_empty() {
        return Err(BookError::RootfileNotFound(candidates.join(", ")));
    }

    Ok(found)
}

fn candidate_path(node: &XmlNode) -> Option<String> {
    if node.attr("media-type") != Some(PACKAGE_MEDIA_TYPE) {
        return None;
    }
    node.attr("full-path").map(|path| path.trim().to_string())
}
