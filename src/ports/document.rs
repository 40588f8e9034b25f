//! Document writer port: Trait for encoding report documents.
//!
//! This trait abstracts the document format (PDF) from the report renderer.

use crate::domain::ReportDocument;
use crate::Result;

/// Trait for turning a laid-out document into downloadable bytes.
///
/// Implementations must be deterministic: the same document always encodes
/// to the same bytes.
pub trait DocumentWriter: Send + Sync {
    /// MIME type of the produced bytes.
    fn media_type(&self) -> &'static str;

    /// File extension without the dot.
    fn file_extension(&self) -> &'static str;

    /// Encode the document.
    ///
    /// # Errors
    /// Returns `Report` if the document cannot be encoded.
    fn write(&self, document: &ReportDocument) -> Result<Vec<u8>>;
}
