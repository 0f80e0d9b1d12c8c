//! Error types
//!
//! One closed taxonomy for the parse pipeline ([`BookError`]) plus the
//! collaborator errors it wraps ([`ArchiveError`], [`XmlError`]). Failures
//! are local to the pipeline step that detects them and abort the rest of
//! the chain; unresolved cross-references inside manifest/spine/TOC are
//! handled by omission, never by raising an error.

use thiserror::Error;

/// Result type alias for book operations
pub type Result<T> = std::result::Result<T, BookError>;

/// Archive access errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to read entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("blocking read task failed: {0}")]
    Task(String),
}

/// XML tree-building errors
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("document has no root element")]
    NoRoot,
}

/// Underlying cause of a pipeline read-or-parse failure
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Parse-pipeline and retrieval errors
#[derive(Debug, Error)]
pub enum BookError {
    /// The archive could not be opened or is not a readable ZIP
    #[error("invalid archive")]
    InvalidArchive(#[source] ArchiveError),

    /// The archive contains no entries
    #[error("archive contains no entries")]
    EmptyArchive,

    /// No `mimetype` resource in the archive
    #[error("no mimetype resource in archive")]
    MimetypeMissing,

    /// The `mimetype` resource could not be read
    #[error("failed to read mimetype resource")]
    MimetypeRead(#[source] ArchiveError),

    /// The `mimetype` value is not an EPUB mimetype
    #[error("unsupported mimetype: {0}")]
    UnsupportedMimetype(String),

    /// No `META-INF/container.xml` entry in the archive
    #[error("no container descriptor in archive")]
    ContainerMissing,

    /// The container descriptor could not be read or parsed
    #[error("failed to read container descriptor")]
    ContainerRead(#[source] ReadError),

    /// The container declares no rootfiles
    #[error("container declares no rootfiles")]
    NoRootfiles,

    /// A sole rootfile entry lacks a valid media-type/full-path pair
    #[error("rootfile is missing a valid media-type or full-path")]
    RootfileFormatInvalid,

    /// No usable rootfile candidates were collected
    #[error("no usable rootfile candidates in container")]
    EmptyRootfileList,

    /// None of the declared rootfiles exist in the archive
    #[error("declared rootfile not present in archive: {0}")]
    RootfileNotFound(String),

    /// The package document could not be read or parsed
    #[error("failed to read package document")]
    PackageRead(#[source] ReadError),

    /// The navigation document could not be read or parsed
    #[error("failed to read navigation document")]
    NavigationRead(#[source] ReadError),

    /// The requested id has no manifest entry
    #[error("resource not found in manifest: {0}")]
    ResourceNotFound(String),

    /// A manifest resource could not be read back from the archive
    #[error("failed to read resource {id}")]
    ResourceRead {
        id: String,
        #[source]
        source: ArchiveError,
    },

    /// Chapter retrieval was requested for a non-chapter media type
    #[error("resource {id} is not a chapter (media type {media_type})")]
    UnsupportedChapterType { id: String, media_type: String },

    /// Image retrieval was requested for a non-image media type
    #[error("resource {id} is not an image (media type {media_type})")]
    UnsupportedImageType { id: String, media_type: String },
}
