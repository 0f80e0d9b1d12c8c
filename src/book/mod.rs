//! Book parsing and retrieval
//!
//! [`Book`] runs the structural pipeline once per archive - mimetype
//! validation, container lookup, package-document parsing, navigation
//! walking - and then serves metadata, manifest, spine, flow, TOC and
//! per-resource retrieval (raw bytes, rewritten chapter markup, images)
//! from the resulting model. Pipeline steps are strictly sequential; a
//! failure at any step aborts the parse and surfaces exactly once.

mod container;
mod ncx;
mod package;
mod rewrite;
pub mod types;

use std::path::Path;

use crate::archive::ZipArchiveReader;
use crate::error::{ArchiveError, BookError, Result};
use crate::xml;

use self::types::{Manifest, ManifestItem, PackageMetadata, ParsedBook, Spine};

const EPUB_MIMETYPE: &str = "application/epub+zip";

/// Construction options for [`Book`]
///
/// `image_root` and `link_root` are the URL prefixes used when rewriting
/// chapter markup; a trailing slash is enforced on both.
#[derive(Debug, Clone)]
pub struct BookOptions {
    image_root: String,
    link_root: String,
}

impl Default for BookOptions {
    fn default() -> Self {
        Self {
            image_root: "/images/".to_string(),
            link_root: "/links/".to_string(),
        }
    }
}

impl BookOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL prefix for rewritten image sources
    pub fn image_root(mut self, root: impl Into<String>) -> Self {
        self.image_root = with_trailing_slash(root.into());
        self
    }

    /// URL prefix for rewritten internal links
    pub fn link_root(mut self, root: impl Into<String>) -> Self {
        self.link_root = with_trailing_slash(root.into());
        self
    }

    /// Open and parse an archive from a file path.
    pub async fn open(self, path: impl AsRef<Path>) -> Result<Book> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| BookError::InvalidArchive(ArchiveError::Io(e)))?;
        self.read(data).await
    }

    /// Parse an archive from raw bytes.
    pub async fn read(self, data: Vec<u8>) -> Result<Book> {
        let archive = ZipArchiveReader::new(data).map_err(BookError::InvalidArchive)?;
        Book::parse(archive, self).await
    }
}

fn with_trailing_slash(mut root: String) -> String {
    if !root.ends_with('/') {
        root.push('/');
    }
    root
}

/// A parsed book
#[derive(Debug)]
pub struct Book {
    archive: ZipArchiveReader,
    options: BookOptions,
    parsed: ParsedBook,
}

impl Book {
    /// Start configuring a book before opening it.
    pub fn options() -> BookOptions {
        BookOptions::new()
    }

    /// Open and parse an archive from a file path with default options.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::options().open(path).await
    }

    /// Parse an archive from raw bytes with default options.
    pub async fn read(data: Vec<u8>) -> Result<Self> {
        Self::options().read(data).await
    }

    async fn parse(archive: ZipArchiveReader, options: BookOptions) -> Result<Self> {
        if archive.entry_names().is_empty() {
            return Err(BookError::EmptyArchive);
        }

        Self::check_mimetype(&archive).await?;

        let container_entry = container::container_entry(archive.entry_names())
            .ok_or(BookError::ContainerMissing)?
            .to_string();
        let container_doc = Self::read_xml(&archive, &container_entry, BookError::ContainerRead).await?;
        let rootfiles = container::rootfile_paths(&container_doc, archive.entry_names())?;
        let rootfile_path = rootfiles[0].clone();

        let package = Self::read_xml(&archive, &rootfile_path, BookError::PackageRead).await?;
        let version = package.attr("version").unwrap_or("2.0").to_string();
        let package_dir = package::dir_of(&rootfile_path);

        let metadata = package
            .first_child("metadata")
            .map(package::extract_metadata)
            .unwrap_or_default();
        let mut manifest = package
            .first_child("manifest")
            .map(|node| package::extract_manifest(node, &package_dir))
            .unwrap_or_default();
        let spine = package
            .first_child("spine")
            .map(|node| package::extract_spine(node, &manifest))
            .unwrap_or_default();

        let mut toc = Vec::new();
        if let Some(toc_item) = spine.toc.and_then(|index| manifest.get(index)) {
            let href = toc_item.href.clone();
            let nav_doc = Self::read_xml(&archive, &href, BookError::NavigationRead).await?;
            toc = ncx::walk(&nav_doc, &package::dir_of(&href), &mut manifest);
        }

        tracing::debug!(
            rootfile = %rootfile_path,
            version = %version,
            manifest_items = manifest.len(),
            spine_items = spine.contents.len(),
            toc_entries = toc.len(),
            "parsed book"
        );

        Ok(Self {
            archive,
            options,
            parsed: ParsedBook {
                rootfile_path,
                rootfiles,
                version,
                metadata,
                manifest,
                spine,
                toc,
            },
        })
    }

    async fn check_mimetype(archive: &ZipArchiveReader) -> Result<()> {
        let entry = archive
            .entry_names()
            .iter()
            .find(|name| name.to_lowercase() == "mimetype")
            .cloned()
            .ok_or(BookError::MimetypeMissing)?;
        let bytes = archive.read(&entry).await.map_err(BookError::MimetypeRead)?;
        let value = String::from_utf8_lossy(&bytes).trim().to_lowercase();
        if value != EPUB_MIMETYPE {
            return Err(BookError::UnsupportedMimetype(value));
        }
        Ok(())
    }

    async fn read_xml(
        archive: &ZipArchiveReader,
        name: &str,
        wrap: fn(crate::error::ReadError) -> BookError,
    ) -> Result<xml::XmlNode> {
        let bytes = archive.read(name).await.map_err(|e| wrap(e.into()))?;
        let text = String::from_utf8_lossy(&bytes);
        xml::parse(&text).map_err(|e| wrap(e.into()))
    }

    /// The whole parsed model
    pub fn parsed(&self) -> &ParsedBook {
        &self.parsed
    }

    /// Package version attribute (`"2.0"` when the document omits it)
    pub fn version(&self) -> &str {
        &self.parsed.version
    }

    /// Canonical package-document path
    pub fn rootfile_path(&self) -> &str {
        &self.parsed.rootfile_path
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.parsed.metadata
    }

    pub fn manifest(&self) -> &Manifest {
        &self.parsed.manifest
    }

    pub fn spine(&self) -> &Spine {
        &self.parsed.spine
    }

    /// The reading order, resolved to manifest items
    pub fn flow(&self) -> Vec<&ManifestItem> {
        self.parsed
            .spine
            .contents
            .iter()
            .filter_map(|&index| self.parsed.manifest.get(index))
            .collect()
    }

    /// The flattened table of contents, resolved to items
    pub fn toc(&self) -> Vec<&ManifestItem> {
        self.parsed
            .toc
            .iter()
            .filter_map(|entry| entry.item(&self.parsed.manifest))
            .collect()
    }

    /// The cover resource, when a generic `cover` meta names one
    pub fn cover(&self) -> Option<&ManifestItem> {
        let id = self.parsed.metadata.extra.get("cover")?;
        self.parsed.manifest.by_id(id)
    }

    /// Raw resource bytes and media type by manifest id
    pub async fn get_file(&self, id: &str) -> Result<(Vec<u8>, String)> {
        let item = self.item(id)?;
        let data = self.read_item(item).await?;
        Ok((data, item.media_type.clone()))
    }

    /// Image bytes and media type by manifest id; the media type must be
    /// `image/*`.
    pub async fn get_image(&self, id: &str) -> Result<(Vec<u8>, String)> {
        let item = self.item(id)?;
        if !item.media_type.trim().to_lowercase().starts_with("image/") {
            return Err(BookError::UnsupportedImageType {
                id: id.to_string(),
                media_type: item.media_type.clone(),
            });
        }
        let data = self.read_item(item).await?;
        Ok((data, item.media_type.clone()))
    }

    /// Un-rewritten chapter markup by manifest id; the media type must be
    /// XHTML or SVG.
    pub async fn get_chapter_raw(&self, id: &str) -> Result<String> {
        let item = self.item(id)?;
        if !rewrite::is_chapter_media_type(&item.media_type) {
            return Err(BookError::UnsupportedChapterType {
                id: id.to_string(),
                media_type: item.media_type.clone(),
            });
        }
        let data = self.read_item(item).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Rewritten chapter markup by manifest id
    ///
    /// Body extraction, script/style stripping, event-handler
    /// neutralization and src/href rewriting against the manifest, using
    /// the configured image/link roots.
    pub async fn get_chapter(&self, id: &str) -> Result<String> {
        let raw = self.get_chapter_raw(id).await?;
        let item = self.item(id)?;
        Ok(rewrite::rewrite(
            &raw,
            &package::dir_of(&item.href),
            &self.parsed.manifest,
            &self.options.image_root,
            &self.options.link_root,
        ))
    }

    fn item(&self, id: &str) -> Result<&ManifestItem> {
        self.parsed
            .manifest
            .by_id(id)
            .ok_or_else(|| BookError::ResourceNotFound(id.to_string()))
    }

    async fn read_item(&self, item: &ManifestItem) -> Result<Vec<u8>> {
        self.archive
            .read(&item.href)
            .await
            .map_err(|source| BookError::ResourceRead {
                id: item.id.clone(),
                source,
            })
    }
}
