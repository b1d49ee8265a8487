use crate::config::InputFile;
use crate::reader::Metadata;

/// Names read out in the title announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credits {
    pub title: String,
    pub author: Option<String>,
    pub narrator: Option<String>,
}

/// Configured values win; the document's own author list fills a missing author.
pub fn resolve_credits(input: &InputFile, metadata: &Metadata) -> Credits {
    let author = input.author.clone().or_else(|| {
        let authors: Vec<&str> = metadata
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect();
        if authors.is_empty() {
            None
        } else {
            Some(authors.join(", "))
        }
    });

    Credits {
        title: input.book_name.clone(),
        author,
        narrator: input.narrator.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputKind;

    fn input(author: Option<&str>) -> InputFile {
        InputFile {
            kind: InputKind::Epub,
            path: "book.epub".to_string(),
            book_name: "Frankenstein".to_string(),
            author: author.map(str::to_string),
            narrator: Some("Ada".to_string()),
        }
    }

    #[test]
    fn configured_author_wins() {
        let metadata = Metadata {
            title: Some("Frankenstein; Or, The Modern Prometheus".to_string()),
            authors: vec!["M. W. Shelley".to_string()],
        };
        let credits = resolve_credits(&input(Some("Mary Shelley")), &metadata);
        assert_eq!(credits.author.as_deref(), Some("Mary Shelley"));
        assert_eq!(credits.title, "Frankenstein");
    }

    #[test]
    fn falls_back_to_document_authors() {
        let metadata = Metadata {
            title: None,
            authors: vec!["Mary Shelley".to_string(), " ".to_string(), "Percy Shelley".to_string()],
        };
        let credits = resolve_credits(&input(None), &metadata);
        assert_eq!(credits.author.as_deref(), Some("Mary Shelley, Percy Shelley"));
        assert_eq!(credits.narrator.as_deref(), Some("Ada"));
    }

    #[test]
    fn no_author_anywhere() {
        let credits = resolve_credits(&input(None), &Metadata::default());
        assert_eq!(credits.author, None);
    }
}
