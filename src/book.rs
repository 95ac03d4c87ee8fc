use serde::Serialize;
use std::fmt;

/// A single chapter entry of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub href: String,
    /// Raw PDF bytes, filled in by the downloader.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            content: None,
        }
    }

    pub fn with_content(self, content: Vec<u8>) -> Self {
        Self {
            content: Some(content),
            ..self
        }
    }
}

/// Metadata of a book as resolved from its catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub source_url: String,
    pub authors: Vec<String>,
    /// Empty when the catalog offers a complete-book PDF.
    pub chapters: Vec<Chapter>,
    pub complete_pdf_href: Option<String>,
    pub isbn: String,
    pub title: String,
    pub year: i32,
}

/// How the PDF content of a book is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode<'a> {
    Complete(&'a str),
    Chapters(&'a [Chapter]),
}

impl Book {
    pub fn download_mode(&self) -> DownloadMode<'_> {
        match self.complete_pdf_href.as_deref() {
            Some(href) if !href.is_empty() => DownloadMode::Complete(href),
            _ => DownloadMode::Chapters(&self.chapters),
        }
    }

    /// Author names joined for display.
    ///
    /// A single author is shown as is; two are joined with "and"; longer
    /// lists are cut after the second name.
    pub fn authors_display(&self) -> String {
        match self.authors.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [first, second] => format!("{} and {}", first, second),
            [first, second, ..] => format!("{}, {} et al.", first, second),
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({})\n{} ({} chapters)",
            self.title,
            self.year,
            self.authors_display(),
            self.chapters.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(authors: &[&str]) -> Book {
        Book {
            source_url: "https://www.hanser-elibrary.com/isbn/9783446450523".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            chapters: vec![Chapter::new("One", "/doi/pdf/10.3139/1")],
            complete_pdf_href: None,
            isbn: "9783446450523".to_string(),
            title: "Example".to_string(),
            year: 2019,
        }
    }

    #[test]
    fn test_authors_display() {
        assert_eq!(book(&["Ada"]).authors_display(), "Ada");
        assert_eq!(book(&["Ada", "Bob"]).authors_display(), "Ada and Bob");
        assert_eq!(
            book(&["Ada", "Bob", "Cy"]).authors_display(),
            "Ada, Bob et al."
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            book(&["Ada"]).to_string(),
            "'Example' (2019)\nAda (1 chapters)"
        );
    }

    #[test]
    fn test_download_mode() {
        let mut b = book(&["Ada"]);
        assert!(matches!(b.download_mode(), DownloadMode::Chapters(ch) if ch.len() == 1));

        b.complete_pdf_href = Some("/doi/pdf/10.3139/9783446450523".to_string());
        assert_eq!(
            b.download_mode(),
            DownloadMode::Complete("/doi/pdf/10.3139/9783446450523")
        );
    }

    #[test]
    fn test_serialize_skips_content() {
        let mut b = book(&["Ada"]);
        b.chapters[0].content = Some(vec![1, 2, 3]);
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["chapters"][0]["title"], "One");
        assert!(json["chapters"][0].get("content").is_none());
    }
}
