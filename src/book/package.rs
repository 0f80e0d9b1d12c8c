//! Package-document extraction
//!
//! Metadata, manifest and spine resolution against the parsed package
//! document, plus the path resolver every href runs through. Extraction
//! is deliberately lenient: elements may be single or repeated, prefixed
//! or not, and anything that does not resolve is skipped rather than
//! rejected.

use std::collections::BTreeMap;

use crate::book::types::{Manifest, ManifestItem, PackageMetadata, Spine};
use crate::xml::{local_name, XmlNode};

/// Resolve a reference against a base directory inside the archive's flat
/// name-space.
///
/// A reference that already starts with the joined base prefix is
/// returned unchanged; everything else is joined with `/`. No `.`/`..`
/// normalization is performed.
pub(crate) fn resolve_path(reference: &str, base: &[String]) -> String {
    let prefix = base.join("/");
    if reference.starts_with(&prefix) {
        return reference.to_string();
    }
    format!("{prefix}/{reference}")
}

/// Directory of an archive path, as segments. Root-level paths yield an
/// empty sequence.
pub(crate) fn dir_of(path: &str) -> Vec<String> {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// Normalize bibliographic fields from the metadata subtree.
pub(crate) fn extract_metadata(metadata_node: &XmlNode) -> PackageMetadata {
    let mut out = PackageMetadata::default();
    let mut metas: Vec<&XmlNode> = Vec::new();

    for (raw_name, children) in &metadata_node.children {
        let key = local_name(raw_name).to_ascii_lowercase();
        let nodes = children.nodes();

        match key.as_str() {
            "title" => {
                if out.title.is_none() {
                    out.title = first_text(&nodes);
                }
            }
            "publisher" => {
                if out.publisher.is_none() {
                    out.publisher = first_text(&nodes);
                }
            }
            "language" => {
                if out.language.is_none() {
                    out.language = first_text(&nodes).map(|s| s.to_lowercase());
                }
            }
            "subject" => {
                if out.subject.is_none() {
                    out.subject = first_text(&nodes);
                }
            }
            "description" => {
                if out.description.is_none() {
                    out.description = first_text(&nodes);
                }
            }
            "date" => {
                if out.date.is_none() {
                    out.date = first_text(&nodes);
                }
            }
            "creator" => {
                if out.creator.is_none() {
                    if let Some(node) = nodes.first() {
                        let name = node.text.trim().to_string();
                        let file_as = node
                            .attr("file-as")
                            .map(|v| v.trim().to_string())
                            .unwrap_or_else(|| name.clone());
                        out.creator = Some(name);
                        out.creator_file_as = Some(file_as);
                    }
                }
            }
            "identifier" => {
                for node in &nodes {
                    let text = node.text.trim();
                    if node.attr("scheme") == Some("ISBN") {
                        out.isbn = Some(text.to_string());
                    }
                    if let Some(id_attr) = node.attr("id") {
                        if id_attr.to_lowercase().contains("uuid") {
                            let bare = text.strip_prefix("urn:uuid:").unwrap_or(text);
                            out.uuid = Some(bare.to_uppercase());
                        }
                    }
                }
            }
            "meta" => metas.extend(nodes),
            _ => {}
        }
    }

    // Generic <meta> declarations merge last and may overwrite fixed
    // fields on name collision.
    for node in metas {
        if let (Some(name), Some(content)) = (node.attr("name"), node.attr("content")) {
            out.set_property(name, content.to_string());
        }
        let text = node.text.trim();
        if !text.is_empty() {
            if let Some(property) = node.attr("property") {
                out.set_property(property, text.to_string());
            }
        }
    }

    out
}

fn first_text(nodes: &[&XmlNode]) -> Option<String> {
    nodes.first().map(|node| node.text.trim().to_string())
}

/// Build the id-keyed resource index from the manifest subtree.
pub(crate) fn extract_manifest(manifest_node: &XmlNode, package_dir: &[String]) -> Manifest {
    let mut manifest = Manifest::default();

    for node in manifest_node.child_nodes("item") {
        if node.attributes.is_empty() {
            continue;
        }

        let mut id = String::new();
        let mut href = String::new();
        let mut media_type = String::new();
        let mut attributes = BTreeMap::new();
        for (name, value) in &node.attributes {
            match local_name(name).to_ascii_lowercase().as_str() {
                "id" => id = value.clone(),
                "href" => href = value.clone(),
                "media-type" => media_type = value.clone(),
                _ => {
                    attributes.insert(name.clone(), value.clone());
                }
            }
        }

        if id.is_empty() {
            tracing::debug!("manifest item without an id attribute; skipped");
            continue;
        }
        if !href.is_empty() {
            href = resolve_path(&href, package_dir);
        }

        manifest.insert(ManifestItem {
            id,
            href,
            media_type,
            attributes,
            ..ManifestItem::default()
        });
    }

    manifest
}

/// Build the ordered reading sequence and locate the navigation resource.
pub(crate) fn extract_spine(spine_node: &XmlNode, manifest: &Manifest) -> Spine {
    let toc = spine_node.attr("toc").and_then(|id| manifest.index_of(id));

    let mut contents = Vec::new();
    for node in spine_node.child_nodes("itemref") {
        let Some(idref) = node.attr("idref") else {
            continue;
        };
        match manifest.index_of(idref) {
            Some(index) => contents.push(index),
            None => tracing::debug!(idref, "spine itemref does not resolve; dropped"),
        }
    }

    Spine { toc, contents }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    fn segments(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_keeps_prefixed_references_unchanged() {
        let base = segments(&["OEBPS"]);
        assert_eq!(resolve_path("OEBPS/ch1.xhtml", &base), "OEBPS/ch1.xhtml");
        assert_eq!(resolve_path("ch1.xhtml", &base), "OEBPS/ch1.xhtml");
        assert_eq!(resolve_path("ch1.xhtml", &[]), "ch1.xhtml");
    }

    #[test]
    fn resolve_does_not_normalize_dot_segments() {
        let base = segments(&["OEBPS", "text"]);
        assert_eq!(resolve_path("../img/p.png", &base), "OEBPS/text/../img/p.png");
    }

    #[test]
    fn dir_of_splits_segments() {
        assert_eq!(dir_of("OEBPS/text/ch1.xhtml"), segments(&["OEBPS", "text"]));
        assert_eq!(dir_of("content.opf"), Vec::<String>::new());
    }

    #[test]
    fn singular_fields_use_first_occurrence() {
        let node = xml::parse(
            r#"<metadata>
                 <dc:title> First </dc:title>
                 <dc:language>EN-us</dc:language>
                 <dc:publisher>House</dc:publisher>
               </metadata>"#,
        )
        .unwrap();
        let metadata = extract_metadata(&node);
        assert_eq!(metadata.title.as_deref(), Some("First"));
        assert_eq!(metadata.language.as_deref(), Some("en-us"));
        assert_eq!(metadata.publisher.as_deref(), Some("House"));
        assert!(metadata.subject.is_none());
    }

    #[test]
    fn creator_file_as_defaults_to_creator_text() {
        let node =
            xml::parse("<metadata><dc:creator>Jane Doe</dc:creator></metadata>").unwrap();
        let metadata = extract_metadata(&node);
        assert_eq!(metadata.creator.as_deref(), Some("Jane Doe"));
        assert_eq!(metadata.creator_file_as.as_deref(), Some("Jane Doe"));

        let node = xml::parse(
            r#"<metadata><dc:creator opf:file-as="Doe, Jane">Jane Doe</dc:creator></metadata>"#,
        )
        .unwrap();
        let metadata = extract_metadata(&node);
        assert_eq!(metadata.creator_file_as.as_deref(), Some("Doe, Jane"));
    }

    #[test]
    fn identifier_list_can_fill_both_isbn_and_uuid() {
        let node = xml::parse(
            r#"<metadata>
                 <dc:identifier opf:scheme="ISBN">978-3-16-148410-0</dc:identifier>
                 <dc:identifier id="pub-uuid">urn:uuid:0a1b2c3d</dc:identifier>
               </metadata>"#,
        )
        .unwrap();
        let metadata = extract_metadata(&node);
        assert_eq!(metadata.isbn.as_deref(), Some("978-3-16-148410-0"));
        assert_eq!(metadata.uuid.as_deref(), Some("0A1B2C3D"));
    }

    #[test]
    fn isbn_scheme_match_is_case_sensitive() {
        let node = xml::parse(
            r#"<metadata><dc:identifier opf:scheme="isbn">123</dc:identifier></metadata>"#,
        )
        .unwrap();
        assert!(extract_metadata(&node).isbn.is_none());
    }

    #[test]
    fn meta_declarations_merge_and_overwrite() {
        let node = xml::parse(
            r#"<metadata>
                 <dc:title>Real Title</dc:title>
                 <meta name="cover" content="cover-img"/>
                 <meta name="title" content="Sort Title"/>
                 <meta property="dcterms:modified">2020-01-01</meta>
               </metadata>"#,
        )
        .unwrap();
        let metadata = extract_metadata(&node);
        assert_eq!(metadata.title.as_deref(), Some("Sort Title"));
        assert_eq!(metadata.extra.get("cover").map(String::as_str), Some("cover-img"));
        assert_eq!(
            metadata.extra.get("dcterms:modified").map(String::as_str),
            Some("2020-01-01")
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let node = xml::parse(
            r#"<metadata>
                 <dc:title>T</dc:title>
                 <dc:creator>C</dc:creator>
                 <meta name="cover" content="img"/>
               </metadata>"#,
        )
        .unwrap();
        assert_eq!(extract_metadata(&node), extract_metadata(&node));
    }

    #[test]
    fn manifest_items_resolve_hrefs_and_keep_extra_attributes() {
        let node = xml::parse(
            r#"<manifest>
                 <item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml" properties="nav"/>
               </manifest>"#,
        )
        .unwrap();
        let manifest = extract_manifest(&node, &segments(&["OEBPS"]));
        let item = manifest.by_id("c1").unwrap();
        assert_eq!(item.href, "OEBPS/ch1.xhtml");
        assert_eq!(item.media_type, "application/xhtml+xml");
        assert_eq!(item.attributes.get("properties").map(String::as_str), Some("nav"));
    }

    #[test]
    fn manifest_duplicate_id_last_wins() {
        let node = xml::parse(
            r#"<manifest>
                 <item id="c1" href="old.xhtml" media-type="application/xhtml+xml"/>
                 <item id="c1" href="new.xhtml" media-type="application/xhtml+xml"/>
               </manifest>"#,
        )
        .unwrap();
        let manifest = extract_manifest(&node, &[]);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.by_id("c1").unwrap().href, "new.xhtml");
    }

    #[test]
    fn spine_drops_unresolved_idrefs_and_keeps_order() {
        let manifest_node = xml::parse(
            r#"<manifest>
                 <item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
                 <item id="b" href="b.xhtml" media-type="application/xhtml+xml"/>
               </manifest>"#,
        )
        .unwrap();
        let manifest = extract_manifest(&manifest_node, &[]);

        let spine_node = xml::parse(
            r#"<spine toc="ncx">
                 <itemref idref="b"/>
                 <itemref idref="ghost"/>
                 <itemref idref="a"/>
               </spine>"#,
        )
        .unwrap();
        let spine = extract_spine(&spine_node, &manifest);
        assert!(spine.toc.is_none());
        let ids: Vec<_> = spine
            .contents
            .iter()
            .map(|&i| manifest.get(i).unwrap().id.as_str())
            .collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn spine_single_itemref_is_normalized() {
        let manifest_node = xml::parse(
            r#"<manifest><item id="a" href="a.xhtml" media-type="application/xhtml+xml"/></manifest>"#,
        )
        .unwrap();
        let manifest = extract_manifest(&manifest_node, &[]);
        let spine_node = xml::parse(r#"<spine><itemref idref="a"/></spine>"#).unwrap();
        let spine = extract_spine(&spine_node, &manifest);
        assert_eq!(spine.contents.len(), 1);
    }
}
