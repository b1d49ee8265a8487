use anyhow::Result;

/// Document metadata shared across all input formats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
}

/// Trait for splitting a source document (EPUB, HTML, PDF) into chapters
pub trait BookReader {
    /// Ordered plain-text chapters, already cleaned and cut
    fn chapters(&self) -> Result<Vec<String>>;
    /// Metadata embedded in the source, if the format carries any
    fn metadata(&self) -> Metadata {
        Metadata::default()
    }
}
