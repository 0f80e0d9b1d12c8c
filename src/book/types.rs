//! Parsed book model
//!
//! The aggregate produced by one successful parse: metadata, manifest,
//! spine, flow and table of contents. Manifest items live in an arena and
//! are referenced by index from the spine and the TOC, so the navigation
//! walker's in-place merge of title/order/level is observable through
//! every path that reaches the item.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// Bibliographic metadata from the package document
///
/// Fixed fields are populated by their dedicated extraction rules; any
/// generic `<meta>` declaration lands in `extra` unless its property name
/// collides with a fixed field, in which case it overwrites the fixed
/// value (last write wins across document order).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_file_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "ISBN", skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(rename = "UUID", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Generic property-name to value pairs from `<meta>` declarations
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl PackageMetadata {
    /// Store a generic property. Names matching a fixed field (by its
    /// serialized name) overwrite that field; everything else goes to
    /// `extra`.
    pub(crate) fn set_property(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = Some(value),
            "creator" => self.creator = Some(value),
            "creatorFileAs" => self.creator_file_as = Some(value),
            "publisher" => self.publisher = Some(value),
            "language" => self.language = Some(value),
            "subject" => self.subject = Some(value),
            "description" => self.description = Some(value),
            "date" => self.date = Some(value),
            "ISBN" => self.isbn = Some(value),
            "UUID" => self.uuid = Some(value),
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
    }
}

/// One resource declared by the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    pub id: String,
    /// Archive-absolute path, resolved against the package directory
    pub href: String,
    pub media_type: String,
    /// Any other attributes declared on the item, verbatim
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Attached by the navigation walker when a TOC entry resolves here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
}

/// The id-keyed resource index
///
/// Items are stored in insertion order; `by_id`/`by_href` look-ups resolve
/// to arena indices. A duplicated id replaces the earlier item in place.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    items: Vec<ManifestItem>,
    #[serde(skip)]
    by_id: HashMap<String, usize>,
    #[serde(skip)]
    by_href: HashMap<String, usize>,
}

impl Manifest {
    /// Insert an item, replacing any earlier item with the same id.
    pub(crate) fn insert(&mut self, item: ManifestItem) -> usize {
        match self.by_id.get(&item.id).copied() {
            Some(index) => {
                self.by_href.remove(&self.items[index].href);
                self.by_href.insert(item.href.clone(), index);
                self.items[index] = item;
                index
            }
            None => {
                let index = self.items.len();
                self.by_id.insert(item.id.clone(), index);
                self.by_href.insert(item.href.clone(), index);
                self.items.push(item);
                index
            }
        }
    }

    /// All items, in insertion order
    pub fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.index_of(id).map(|i| &self.items[i])
    }

    pub fn by_href(&self, href: &str) -> Option<&ManifestItem> {
        self.index_by_href(href).map(|i| &self.items[i])
    }

    pub fn get(&self, index: usize) -> Option<&ManifestItem> {
        self.items.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut ManifestItem> {
        self.items.get_mut(index)
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn index_by_href(&self, href: &str) -> Option<usize> {
        self.by_href.get(href).copied()
    }

    /// Look up by href comparing with any `#fragment` stripped from the
    /// manifest side. Used by link rewriting, where the requested path has
    /// already had its own fragment split off.
    pub(crate) fn index_by_href_ignoring_fragment(&self, href: &str) -> Option<usize> {
        if let Some(index) = self.index_by_href(href) {
            return Some(index);
        }
        self.items
            .iter()
            .position(|item| item.href.split('#').next().unwrap_or(&item.href) == href)
    }
}

/// The ordered reading sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spine {
    /// Arena index of the navigation resource, when declared and resolvable
    pub toc: Option<usize>,
    /// Manifest arena indices, in document order
    pub contents: Vec<usize>,
}

/// One flattened table-of-contents entry
///
/// A TOC node whose resolved href matches a manifest item *is* that item
/// (by arena index); anything else is a standalone record carrying the
/// navigation point's own id and an empty media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TocEntry {
    Item(usize),
    Standalone(ManifestItem),
}

impl TocEntry {
    /// Resolve against the manifest arena.
    pub fn item<'a>(&'a self, manifest: &'a Manifest) -> Option<&'a ManifestItem> {
        match self {
            TocEntry::Item(index) => manifest.get(*index),
            TocEntry::Standalone(item) => Some(item),
        }
    }
}

/// Aggregate result of one successful parse
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBook {
    /// Canonical package-document path (first valid rootfile)
    pub rootfile_path: String,
    /// All valid rootfile paths, in container order
    pub rootfiles: Vec<String>,
    /// Package version attribute, `"2.0"` when absent
    pub version: String,
    pub metadata: PackageMetadata,
    pub manifest: Manifest,
    pub spine: Spine,
    pub toc: Vec<TocEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, href: &str) -> ManifestItem {
        ManifestItem {
            id: id.to_string(),
            href: href.to_string(),
            ..ManifestItem::default()
        }
    }

    #[test]
    fn duplicate_id_replaces_in_place() {
        let mut manifest = Manifest::default();
        let first = manifest.insert(item("c1", "OEBPS/old.xhtml"));
        let second = manifest.insert(item("c1", "OEBPS/new.xhtml"));
        assert_eq!(first, second);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.by_id("c1").unwrap().href, "OEBPS/new.xhtml");
        assert!(manifest.by_href("OEBPS/old.xhtml").is_none());
    }

    #[test]
    fn href_lookup_ignores_manifest_side_fragment() {
        let mut manifest = Manifest::default();
        manifest.insert(item("c1", "OEBPS/ch1.xhtml#top"));
        assert_eq!(manifest.index_by_href_ignoring_fragment("OEBPS/ch1.xhtml"), Some(0));
    }

    #[test]
    fn meta_collision_overwrites_fixed_field() {
        let mut metadata = PackageMetadata::default();
        metadata.title = Some("From dc:title".to_string());
        metadata.set_property("title", "From meta".to_string());
        metadata.set_property("calibre:series", "S".to_string());
        assert_eq!(metadata.title.as_deref(), Some("From meta"));
        assert_eq!(metadata.extra.get("calibre:series").map(String::as_str), Some("S"));
    }
}
