use crate::config::PdfParams;
use crate::reader::{BookReader, Metadata};
use crate::text;
use anyhow::{bail, Context, Result};
use lopdf::{Document, Object};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inclusive 1-indexed page range of every chapter.
///
/// Each entry but the last starts a chapter; the last entry is the book's
/// final page. `[3, 10, 25, 40]` yields `3..=9`, `10..=24` and `25..=40`.
pub fn chapter_page_ranges(pages: &[u32]) -> Result<Vec<RangeInclusive<u32>>> {
    let Some((&last_page, starts)) = pages.split_last() else {
        bail!("ch_page_list is empty");
    };
    if starts.is_empty() {
        bail!(
            "ch_page_list needs at least one chapter start page before the last page (got {:?})",
            pages
        );
    }
    if starts[0] == 0 {
        bail!("ch_page_list pages are 1-indexed (got page 0)");
    }
    if starts.windows(2).any(|w| w[1] <= w[0]) {
        bail!("ch_page_list chapter start pages must be strictly increasing (got {:?})", pages);
    }
    if let Some(&last_start) = starts.last() {
        if last_page < last_start {
            bail!(
                "ch_page_list last page {} comes before the final chapter start {}",
                last_page,
                last_start
            );
        }
    }

    Ok(starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).map_or(last_page, |next| next - 1);
            start..=end
        })
        .collect())
}

/// A PDF split into per-chapter PDFs by chapter start page.
pub struct PdfBook {
    path: PathBuf,
    document: Document,
    params: PdfParams,
    pdf_dir: PathBuf,
    prefix: String,
}

impl PdfBook {
    pub fn open(path: &Path, params: PdfParams, pdf_dir: &Path, prefix: &str) -> Result<Self> {
        let document = Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;
        info!(
            path = %path.display(),
            pages = document.get_pages().len(),
            "Opened PDF"
        );
        Ok(Self {
            path: path.to_path_buf(),
            document,
            params,
            pdf_dir: pdf_dir.to_path_buf(),
            prefix: prefix.to_string(),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    pub fn chapter_pdf_path(&self, index: usize) -> PathBuf {
        self.pdf_dir
            .join(format!("{}_chapter{}.pdf", self.prefix, index + 1))
    }

    /// Write the pages in `range` as a standalone PDF.
    fn write_pages(&self, range: &RangeInclusive<u32>, output: &Path) -> Result<()> {
        let mut chapter = self.document.clone();
        let outside: Vec<u32> = chapter
            .get_pages()
            .keys()
            .copied()
            .filter(|page| !range.contains(page))
            .collect();
        chapter.delete_pages(&outside);
        chapter.prune_objects();
        chapter.compress();
        chapter
            .save(output)
            .with_context(|| format!("Failed to write chapter PDF: {}", output.display()))?;
        Ok(())
    }

    /// Split the source into chapter PDFs, returning their paths in chapter order.
    pub fn split(&self) -> Result<Vec<PathBuf>> {
        let ranges = chapter_page_ranges(&self.params.ch_page_list)?;
        let page_count = self.page_count();
        if let Some(last) = ranges.last() {
            if *last.end() > page_count {
                bail!(
                    "ch_page_list ends at page {} but {} has only {} pages",
                    last.end(),
                    self.path.display(),
                    page_count
                );
            }
        }

        fs::create_dir_all(&self.pdf_dir)
            .with_context(|| format!("Failed to create {}", self.pdf_dir.display()))?;

        let mut outputs = Vec::with_capacity(ranges.len());
        for (i, range) in ranges.iter().enumerate() {
            let output = self.chapter_pdf_path(i);
            self.write_pages(range, &output)?;
            info!(
                chapter = i + 1,
                first_page = range.start(),
                last_page = range.end(),
                path = %output.display(),
                "Created chapter PDF"
            );
            outputs.push(output);
        }
        Ok(outputs)
    }
}

fn extract_text(path: &Path) -> Result<String> {
    let raw = pdf_extract::extract_text(path)
        .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;
    Ok(text::strip_control(&raw))
}

impl BookReader for PdfBook {
    fn chapters(&self) -> Result<Vec<String>> {
        let chapter_pdfs = self.split()?;
        let mut chapters = Vec::with_capacity(chapter_pdfs.len());
        for (i, pdf) in chapter_pdfs.iter().enumerate() {
            info!(chapter = i + 1, "Extracting chapter text");
            let chapter = extract_text(pdf)?;
            debug!(chapter = i + 1, chars = chapter.len(), "Extracted chapter text");
            chapters.push(chapter);
        }
        Ok(chapters)
    }

    fn metadata(&self) -> Metadata {
        let info = self
            .document
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .and_then(|id| self.document.get_dictionary(id));
        let Ok(info) = info else {
            debug!(path = %self.path.display(), "No Info dictionary in PDF");
            return Metadata::default();
        };

        let get_string = |key: &[u8]| -> Option<String> {
            let value = lopdf::decode_text_string(info.get(key).ok()?).ok()?;
            let value = value.trim_start_matches('\u{feff}').trim().to_string();
            (!value.is_empty()).then_some(value)
        };

        Metadata {
            title: get_string(b"Title"),
            authors: get_string(b"Author").into_iter().collect(),
        }
    }
}
