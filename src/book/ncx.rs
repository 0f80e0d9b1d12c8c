//! Navigation-document walking
//!
//! Flattens the `navMap`/`navPoint` tree of the navigation resource into
//! an ordered table of contents. A nav point whose resolved href matches
//! a manifest item merges its title/order/level into that item in place
//! and the output entry references it by arena index; everything else
//! becomes a standalone entry. Output order is pre-order, parent before
//! children, sibling order preserved.

use crate::book::package::resolve_path;
use crate::book::types::{Manifest, ManifestItem, TocEntry};
use crate::xml::XmlNode;

/// Nav points nested deeper than this contribute nothing.
const MAX_NAV_DEPTH: usize = 7;

/// Walk a parsed navigation document. A missing `navMap`/`navPoint` node
/// yields an empty table of contents, not an error.
pub(crate) fn walk(
    nav_doc: &XmlNode,
    toc_dir: &[String],
    manifest: &mut Manifest,
) -> Vec<TocEntry> {
    let Some(nav_map) = nav_doc.first_child("navMap") else {
        return Vec::new();
    };
    let points = nav_map.child_nodes("navPoint");
    if points.is_empty() {
        return Vec::new();
    }
    walk_points(&points, 0, toc_dir, manifest)
}

fn walk_points(
    points: &[&XmlNode],
    level: usize,
    toc_dir: &[String],
    manifest: &mut Manifest,
) -> Vec<TocEntry> {
    if level > MAX_NAV_DEPTH {
        tracing::warn!(level, "navigation tree deeper than {MAX_NAV_DEPTH}; truncated");
        return Vec::new();
    }

    let mut out = Vec::new();
    for point in points {
        visit_point(point, level, toc_dir, manifest, &mut out);
    }
    out
}

fn visit_point(
    point: &XmlNode,
    level: usize,
    toc_dir: &[String],
    manifest: &mut Manifest,
    out: &mut Vec<TocEntry>,
) {
    if let Some(label) = point.first_child("navLabel") {
        let order = point
            .attr("playOrder")
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let title = label
            .first_child("text")
            .map(|text| text.text.trim())
            .unwrap_or_else(|| label.text.trim())
            .to_string();
        let href = point
            .first_child("content")
            .and_then(|content| content.attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty());

        // A labelled point without a content src is skipped entirely,
        // though its children are still visited below.
        if let Some(href) = href {
            let resolved = resolve_path(href, toc_dir);
            match manifest.index_by_href(&resolved) {
                Some(index) => {
                    if let Some(item) = manifest.get_mut(index) {
                        item.title = Some(title);
                        item.order = Some(order);
                        item.level = Some(level);
                    }
                    out.push(TocEntry::Item(index));
                }
                None => {
                    out.push(TocEntry::Standalone(ManifestItem {
                        id: point.attr("id").unwrap_or("").to_string(),
                        href: resolved,
                        title: Some(title),
                        order: Some(order),
                        level: Some(level),
                        ..ManifestItem::default()
                    }));
                }
            }
        }
    }

    let children = point.child_nodes("navPoint");
    if !children.is_empty() {
        out.extend(walk_points(&children, level + 1, toc_dir, manifest));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    fn manifest_with(entries: &[(&str, &str)]) -> Manifest {
        let mut manifest = Manifest::default();
        for (id, href) in entries {
            manifest.insert(ManifestItem {
                id: id.to_string(),
                href: href.to_string(),
                media_type: "application/xhtml+xml".to_string(),
                ..ManifestItem::default()
            });
        }
        manifest
    }

    fn dir(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matching_href_merges_into_manifest_item() {
        let ncx = xml::parse(
            r#"<ncx><navMap>
                 <navPoint id="np1" playOrder="3">
                   <navLabel><text> Chapter One </text></navLabel>
                   <content src="ch1.xhtml"/>
                 </navPoint>
               </navMap></ncx>"#,
        )
        .unwrap();
        let mut manifest = manifest_with(&[("c1", "OEBPS/ch1.xhtml")]);
        let toc = walk(&ncx, &dir(&["OEBPS"]), &mut manifest);

        assert_eq!(toc, [TocEntry::Item(0)]);
        let item = manifest.by_id("c1").unwrap();
        assert_eq!(item.title.as_deref(), Some("Chapter One"));
        assert_eq!(item.order, Some(3));
        assert_eq!(item.level, Some(0));
    }

    #[test]
    fn unmatched_href_becomes_standalone_entry() {
        let ncx = xml::parse(
            r#"<ncx><navMap>
                 <navPoint id="np1">
                   <navLabel><text>Intro</text></navLabel>
                   <content src="intro.xhtml"/>
                 </navPoint>
               </navMap></ncx>"#,
        )
        .unwrap();
        let mut manifest = manifest_with(&[]);
        let toc = walk(&ncx, &dir(&["OEBPS"]), &mut manifest);

        let [TocEntry::Standalone(entry)] = toc.as_slice() else {
            panic!("expected one standalone entry");
        };
        assert_eq!(entry.id, "np1");
        assert_eq!(entry.href, "OEBPS/intro.xhtml");
        assert_eq!(entry.order, Some(0));
    }

    #[test]
    fn point_without_src_is_skipped_but_children_survive() {
        let ncx = xml::parse(
            r#"<ncx><navMap>
                 <navPoint id="part">
                   <navLabel><text>Part I</text></navLabel>
                   <navPoint id="np1">
                     <navLabel><text>One</text></navLabel>
                     <content src="ch1.xhtml"/>
                   </navPoint>
                 </navPoint>
               </navMap></ncx>"#,
        )
        .unwrap();
        let mut manifest = manifest_with(&[]);
        let toc = walk(&ncx, &[], &mut manifest);

        assert_eq!(toc.len(), 1);
        let entry = toc[0].item(&manifest).unwrap();
        assert_eq!(entry.id, "np1");
        assert_eq!(entry.level, Some(1));
    }

    #[test]
    fn output_is_pre_order() {
        let ncx = xml::parse(
            r#"<ncx><navMap>
                 <navPoint id="a"><navLabel><text>A</text></navLabel><content src="a.xhtml"/>
                   <navPoint id="a1"><navLabel><text>A1</text></navLabel><content src="a1.xhtml"/></navPoint>
                 </navPoint>
                 <navPoint id="b"><navLabel><text>B</text></navLabel><content src="b.xhtml"/></navPoint>
               </navMap></ncx>"#,
        )
        .unwrap();
        let mut manifest = manifest_with(&[]);
        let toc = walk(&ncx, &[], &mut manifest);
        let ids: Vec<_> = toc
            .iter()
            .map(|entry| entry.item(&manifest).unwrap().id.clone())
            .collect();
        assert_eq!(ids, ["a", "a1", "b"]);
    }

    #[test]
    fn deep_trees_truncate_below_depth_limit() {
        // Nest 10 levels; only levels 0..=7 may produce entries.
        let mut doc = String::from("<ncx><navMap>");
        for depth in 0..10 {
            doc.push_str(&format!(
                r#"<navPoint id="np{depth}"><navLabel><text>L{depth}</text></navLabel><content src="l{depth}.xhtml"/>"#
            ));
        }
        for _ in 0..10 {
            doc.push_str("</navPoint>");
        }
        doc.push_str("</navMap></ncx>");

        let ncx = xml::parse(&doc).unwrap();
        let mut manifest = manifest_with(&[]);
        let toc = walk(&ncx, &[], &mut manifest);

        assert_eq!(toc.len(), 8);
        let max_level = toc
            .iter()
            .filter_map(|entry| entry.item(&manifest).and_then(|i| i.level))
            .max();
        assert_eq!(max_level, Some(MAX_NAV_DEPTH));
    }

    #[test]
    fn non_numeric_play_order_defaults_to_zero() {
        let ncx = xml::parse(
            r#"<ncx><navMap>
                 <navPoint id="np1" playOrder="three">
                   <navLabel><text>One</text></navLabel>
                   <content src="ch1.xhtml"/>
                 </navPoint>
               </navMap></ncx>"#,
        )
        .unwrap();
        let mut manifest = manifest_with(&[]);
        let toc = walk(&ncx, &[], &mut manifest);
        assert_eq!(toc[0].item(&manifest).unwrap().order, Some(0));
    }

    #[test]
    fn missing_nav_map_yields_empty_toc() {
        let doc = xml::parse("<html><body><nav/></body></html>").unwrap();
        let mut manifest = manifest_with(&[]);
        assert!(walk(&doc, &[], &mut manifest).is_empty());
    }
}
