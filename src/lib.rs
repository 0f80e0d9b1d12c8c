//! Structural EPUB parsing and chapter rewriting.
//!
//! This crate extracts the structure of an EPUB-shaped archive into a
//! queryable in-memory model: container lookup, package-document parsing,
//! metadata/manifest/spine extraction, navigation-document walking, and
//! on-demand rewriting of chapter markup so image and link references
//! point at externally-addressable URLs.
//!
//! # Modules
//!
//! - `book`: the [`Book`] type - parse pipeline and retrieval surface
//! - `archive`: ZIP-backed archive access
//! - `xml`: markup-string-to-tree parsing
//! - `error`: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use tomo::Book;
//!
//! # async fn example() -> tomo::Result<()> {
//! let book = Book::open("alice.epub").await?;
//! println!("{:?}", book.metadata().title);
//! for item in book.flow() {
//!     let html = book.get_chapter(&item.id).await?;
//!     println!("{} bytes of markup", html.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod book;
pub mod error;
pub mod xml;

pub use book::types::{Manifest, ManifestItem, PackageMetadata, ParsedBook, Spine, TocEntry};
pub use book::{Book, BookOptions};
pub use error::{ArchiveError, BookError, ReadError, Result, XmlError};
