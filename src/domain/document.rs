//! Format-independent document layout.
//!
//! The report renderer describes what goes on the page; a `DocumentWriter`
//! decides how it is encoded.

/// A single layout element, stacked top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBlock {
    /// Large bold heading at the top of the document
    Title(String),
    /// Section heading
    Heading(String),
    /// Body paragraph, wrapped to the page width
    Text(String),
    /// Label/value row
    Field { label: String, value: String },
    /// Horizontal bar on a 0-100 scale
    Bar {
        label: String,
        percent: f64,
        color: (u8, u8, u8),
    },
    /// Small muted paragraph (disclaimers, footnotes)
    Notice(String),
    /// Vertical gap
    Spacer,
}

/// An ordered list of blocks with a document title.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportDocument {
    pub title: String,
    pub blocks: Vec<DocumentBlock>,
}

impl ReportDocument {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: DocumentBlock) -> &mut Self {
        self.blocks.push(block);
        self
    }
}
