use crate::config::HtmlParams;
use crate::reader::BookReader;
use crate::text;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use reqwest::Url;
use std::fs;
use tracing::{debug, info, warn};

/// HTML runs of 4+ newlines collapse to one.
const NEWLINE_RUN: usize = 4;

/// A single HTML book (web page or local file) split into chapters by a regex.
pub struct HtmlBook {
    location: String,
    params: HtmlParams,
}

impl HtmlBook {
    pub fn new(location: impl Into<String>, params: HtmlParams) -> Self {
        Self {
            location: location.into(),
            params,
        }
    }

    /// Fetch the markup as a URL first, falling back to a local file.
    fn load(&self) -> Result<String> {
        let fetch_error = match Url::parse(&self.location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => match fetch(url) {
                Ok(html) => return Ok(html),
                Err(err) => {
                    warn!(location = %self.location, "Fetching HTML failed, trying local file: {err:#}");
                    Some(err)
                }
            },
            _ => None,
        };

        read_local(&self.location, fetch_error)
    }
}

/// Read `location` as a local file. `fetch_error` is why fetching it as a URL
/// failed, if that was tried.
fn read_local(location: &str, fetch_error: Option<anyhow::Error>) -> Result<String> {
    match fs::read_to_string(location) {
        Ok(html) => {
            info!(path = %location, bytes = html.len(), "Read HTML file");
            Ok(html)
        }
        Err(read_err) => match fetch_error {
            Some(fetch_err) => Err(anyhow!(
                "Failed to load HTML from {location}: fetch failed ({fetch_err:#}); read failed ({read_err})"
            )),
            None => Err(read_err).with_context(|| format!("Failed to read HTML file: {location}")),
        },
    }
}

fn fetch(url: Url) -> Result<String> {
    let response = reqwest::blocking::get(url.clone())
        .with_context(|| format!("Request to {url} failed"))?
        .error_for_status()
        .with_context(|| format!("Request to {url} returned an error status"))?;
    let html = response
        .text()
        .with_context(|| format!("Failed to read response body from {url}"))?;
    info!(%url, bytes = html.len(), "Fetched HTML");
    Ok(html)
}

/// Join split fragments two at a time as `first + ".\n" + second`.
///
/// A chapter-opening regex leaves each chapter's heading and body in adjacent
/// fragments, so an odd count means a chapter is missing its other half.
pub fn pair_fragments(fragments: Vec<String>) -> Result<Vec<String>> {
    if fragments.len() % 2 != 0 {
        bail!(
            "HTML split produced {} fragments after cutting; chapters are paired two at a time, so the count must be even",
            fragments.len()
        );
    }

    let mut chapters = Vec::with_capacity(fragments.len() / 2);
    let mut iter = fragments.into_iter();
    while let (Some(head), Some(body)) = (iter.next(), iter.next()) {
        chapters.push(format!("{head}.\n{body}"));
    }
    Ok(chapters)
}

/// Split, cut and pair raw markup into per-chapter markup.
pub fn split_chapters(html: &str, regex: &Regex, params: &HtmlParams) -> Result<Vec<String>> {
    let fragments: Vec<String> = regex.split(html).map(str::to_string).collect();
    debug!(fragments = fragments.len(), "Split HTML on chapter regex");
    let fragments = params.cut().apply(fragments)?;
    pair_fragments(fragments)
}

impl BookReader for HtmlBook {
    fn chapters(&self) -> Result<Vec<String>> {
        let html = self.load()?;
        let regex = self.params.split_regex()?;
        let chapters: Vec<String> = split_chapters(&html, &regex, &self.params)?
            .iter()
            .map(|markup| text::clean_text(&text::html_to_text(markup), NEWLINE_RUN))
            .collect();
        info!(chapters = chapters.len(), "Split HTML into chapters");
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(regex: &str, start: Option<usize>, end: Option<usize>) -> HtmlParams {
        HtmlParams {
            split_regex: regex.to_string(),
            cut_start: start,
            cut_end: end,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pairs_adjacent_fragments() {
        let chapters = pair_fragments(strings(&["I", "one", "II", "two"])).unwrap();
        assert_eq!(chapters, strings(&["I.\none", "II.\ntwo"]));
    }

    #[test]
    fn odd_fragment_count_is_rejected() {
        let err = pair_fragments(strings(&["A", "B", "C"])).unwrap_err();
        assert!(err.to_string().contains("3 fragments"));
    }

    #[test]
    fn cut_applies_before_pairing() {
        let p = params("<mark>", Some(1), None);
        let regex = p.split_regex().unwrap();
        let chapters = split_chapters("A<mark>B<mark>C", &regex, &p).unwrap();
        assert_eq!(chapters, strings(&["B.\nC"]));
    }

    #[test]
    fn odd_count_after_cut_is_rejected() {
        let p = params("<mark>", None, None);
        let regex = p.split_regex().unwrap();
        assert!(split_chapters("A<mark>B<mark>C", &regex, &p).is_err());
    }

    #[test]
    fn reads_local_file_and_cleans_chapters() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("book.html");
        let html = concat!(
            "<html><body><p>Contents</p>",
            "<h2>CHAPTER I</h2><p>It was on a dreary night.</p>\n\n\n\n\n<p>The rain fell.</p>",
            "<h2>CHAPTER II</h2><p>I saw the\u{a0}dull yellow eye.</p>",
            "<p>Appendix</p></body></html>"
        );
        fs::write(&path, html).unwrap();

        let p = params(r"</?h2>", Some(1), None);
        let book = HtmlBook::new(path.to_string_lossy(), p);
        let chapters = book.chapters().unwrap();

        assert_eq!(chapters.len(), 2);
        assert!(chapters[0].starts_with("CHAPTER I."));
        assert!(chapters[0].contains("It was on a dreary night."));
        assert!(chapters[0].contains("The rain fell."));
        assert!(!chapters[0].contains("\n\n\n\n"));
        assert!(chapters[1].contains("I saw thedull yellow eye."));
    }

    #[test]
    fn unreachable_url_without_local_copy_reports_both_failures() {
        let book = HtmlBook::new("http://127.0.0.1:9/book.html", params("<hr/>", None, None));
        let message = format!("{:#}", book.chapters().unwrap_err());
        assert!(message.contains("fetch failed"), "{message}");
        assert!(message.contains("read failed"), "{message}");
    }

    #[test]
    fn local_file_is_used_after_failed_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("book.html");
        fs::write(&path, "<p>Saved copy</p>").unwrap();

        let html = read_local(&path.to_string_lossy(), Some(anyhow!("connection refused"))).unwrap();
        assert_eq!(html, "<p>Saved copy</p>");
    }

    #[test]
    fn missing_file_is_an_error() {
        let book = HtmlBook::new("/nonexistent/book.html", params("<hr/>", None, None));
        assert!(book.chapters().is_err());
    }
}
