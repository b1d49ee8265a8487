use crate::config::EpubParams;
use crate::reader::{BookReader, Metadata};
use crate::text;
use anyhow::{Context, Result};
use rbook::prelude::Metadata as _;
use rbook::prelude::*;
use rbook::Epub;
use std::path::Path;
use tracing::{debug, info, warn};

/// EPUB runs of 3+ newlines collapse to one.
const NEWLINE_RUN: usize = 3;

const DOCUMENT_MEDIA_TYPES: [&str; 2] = ["application/xhtml+xml", "text/html"];

/// An EPUB whose document items are one chapter each.
pub struct EpubData {
    epub: Epub,
    params: EpubParams,
}

impl EpubData {
    pub fn open(path: &Path, params: EpubParams) -> Result<Self> {
        let epub = Epub::options()
            .strict(false)
            .open(path)
            .with_context(|| format!("Failed to open EPUB: {}", path.display()))?;
        info!(path = %path.display(), "Opened EPUB");
        Ok(Self { epub, params })
    }

    /// Raw markup of every document item, in the order the package file
    /// lists them. Falls back to reading order if the package file can't be
    /// parsed.
    fn documents(&self) -> Result<Vec<String>> {
        let package = self.epub.package_file().as_str();
        let ids = self
            .epub
            .read_resource_str(package)
            .context("Failed to read EPUB package file")
            .and_then(|opf| document_ids(&opf));
        match ids {
            Ok(ids) => self.manifest_documents(&ids),
            Err(err) => {
                warn!("Falling back to reading order: {err:#}");
                self.spine_documents()
            }
        }
    }

    fn manifest_documents(&self, ids: &[String]) -> Result<Vec<String>> {
        let manifest = self.epub.manifest();
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(entry) = manifest.by_id(id) else {
                warn!(id = %id, "Manifest item missing from EPUB, skipping");
                continue;
            };
            let content = entry
                .read_str()
                .with_context(|| format!("Failed to read document `{id}`"))?;
            documents.push(content);
        }
        Ok(documents)
    }

    fn spine_documents(&self) -> Result<Vec<String>> {
        let mut documents = Vec::new();
        let mut reader = self.epub.reader();

        while let Some(result) = reader.read_next() {
            let data = result.context("Failed to read chapter content")?;
            documents.push(data.content().to_string());
        }

        Ok(documents)
    }
}

/// Ids of the package's XHTML/HTML manifest items, in manifest order.
fn document_ids(opf: &str) -> Result<Vec<String>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let package = roxmltree::Document::parse_with_options(opf, options)
        .context("Failed to parse EPUB package file")?;

    let ids = package
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "item")
        .filter(|node| {
            node.parent_element()
                .is_some_and(|parent| parent.tag_name().name() == "manifest")
        })
        .filter(|node| {
            node.attribute("media-type").is_some_and(|media_type| {
                DOCUMENT_MEDIA_TYPES
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(media_type.trim()))
            })
        })
        .filter_map(|node| node.attribute("id").map(str::to_string))
        .collect();
    Ok(ids)
}

impl BookReader for EpubData {
    fn chapters(&self) -> Result<Vec<String>> {
        let documents = self.documents()?;
        let texts: Vec<String> = documents
            .iter()
            .enumerate()
            .map(|(i, html)| {
                let chapter = text::clean_text(&text::html_to_text(html), NEWLINE_RUN);
                debug!(document = i + 1, chars = chapter.len(), "Converted EPUB document");
                chapter
            })
            .collect();

        let total = texts.len();
        let chapters = self.params.cut().apply(texts)?;
        info!(documents = total, chapters = chapters.len(), "Split EPUB into chapters");
        Ok(chapters)
    }

    fn metadata(&self) -> Metadata {
        let metadata = self.epub.metadata();
        Metadata {
            title: metadata.title().map(|t| t.value().to_string()),
            authors: metadata
                .creators()
                .map(|creator| creator.value().to_string())
                .collect(),
        }
    }
}
