use scraper::{ElementRef, Html, Node};

const FORM_FEED: char = '\x0c';
const NO_BREAK_SPACE: char = '\u{a0}';

/// Extract the visible body text of an HTML document, one text node per line.
///
/// `script` and `style` subtrees are skipped. Blank markup yields an empty string.
pub fn html_to_text(html: &str) -> String {
    let html = html.trim();
    if html.is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);
    let root = document.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root);

    let mut pieces = Vec::new();
    collect_text(body, &mut pieces);
    pieces.join("\n")
}

fn collect_text(element: ElementRef<'_>, pieces: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => pieces.push((&**text).to_owned()),
            Node::Element(el) if matches!(el.name(), "script" | "style") => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, pieces);
                }
            }
            _ => {}
        }
    }
}

/// Delete form feeds and no-break spaces left behind by extractors.
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|&c| c != FORM_FEED && c != NO_BREAK_SPACE)
        .collect()
}

/// `strip_control`, then replace every run of `min_run` or more newlines with one.
pub fn clean_text(text: &str, min_run: usize) -> String {
    let stripped = strip_control(text);
    let mut result = String::with_capacity(stripped.len());
    let mut run = 0usize;

    for c in stripped.chars() {
        if c == '\n' {
            run += 1;
            continue;
        }
        flush_newlines(&mut result, run, min_run);
        run = 0;
        result.push(c);
    }
    flush_newlines(&mut result, run, min_run);

    result
}

fn flush_newlines(out: &mut String, run: usize, min_run: usize) {
    let count = if run >= min_run { 1 } else { run };
    out.extend(std::iter::repeat('\n').take(count));
}
