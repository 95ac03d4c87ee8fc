//! Saving a merged book under a collision-safe filename.

use std::io::{self, ErrorKind};
use std::path::Path;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::book::Book;
use crate::error::MergeError;
use crate::pdf_merger::MergedDocument;

const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Merge and save `book` into `dest`, returning the filename written.
///
/// Without a pre-supplied `document` the chapter contents are merged in
/// chapter order. The book is saved as `{title}-{year}.pdf`; when that name
/// is rejected by the filesystem, `ISBN_{isbn}-{year}.pdf` is tried once.
pub async fn write_book(
    book: &Book,
    document: Option<MergedDocument>,
    dest: &Path,
) -> Result<String, MergeError> {
    let document = match document {
        Some(document) => document,
        None => MergedDocument::from_chapters(&book.chapters)?,
    };
    let data = document.into_bytes()?;

    let primary = primary_filename(book);
    match write_new(dest, &primary, &data).await {
        Ok(filename) => return Ok(filename),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(MergeError::Unsaveable {
                filename: primary,
                reason: e.to_string(),
            });
        }
        Err(e) => warn!("Could not save as \"{}\": {}", primary, e),
    }

    let fallback = fallback_filename(book);
    write_new(dest, &fallback, &data)
        .await
        .map_err(|e| MergeError::Unsaveable {
            filename: fallback,
            reason: e.to_string(),
        })
}

pub fn primary_filename(book: &Book) -> String {
    format!("{}-{}.pdf", sanitize_filename(&book.title), book.year)
}

pub fn fallback_filename(book: &Book) -> String {
    format!("ISBN_{}-{}.pdf", book.isbn, book.year)
}

/// Strip characters that are not allowed in filenames.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .filter(|c| !INVALID_CHARS.contains(c))
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// The `n`-th candidate for `filename`: `name.pdf`, `name (1).pdf`, ...
fn numbered(filename: &str, n: usize) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{} ({}).{}", stem, n, ext),
        None => format!("{} ({})", filename, n),
    }
}

/// Write `data` to the first free candidate name in `dir`.
///
/// Existing files are never overwritten; a partially written file is
/// removed before the error is returned.
async fn write_new(dir: &Path, filename: &str, data: &[u8]) -> io::Result<String> {
    let mut n = 0;
    loop {
        let candidate = numbered(filename, n);
        let path = dir.join(&candidate);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("\"{}\" exists, trying next name", candidate);
                n += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(remove_err) = fs::remove_file(&path).await {
                warn!("Failed to remove {}: {}", path.display(), remove_err);
            }
            return Err(e);
        }

        debug!("Saved book to {}", path.display());
        return Ok(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Chapter;
    use crate::testing::sample_pdf;
    use tempfile::TempDir;

    /// One single-page chapter per entry of `widths`.
    fn book(title: &str, widths: &[i64]) -> Book {
        Book {
            source_url: "https://www.hanser-elibrary.com/isbn/9783446450523".to_string(),
            authors: vec!["Ada Lovelace".to_string()],
            chapters: widths
                .iter()
                .enumerate()
                .map(|(i, w)| Chapter::new(format!("C{}", i), "/c").with_content(sample_pdf(&[*w])))
                .collect(),
            complete_pdf_href: None,
            isbn: "9783446450523".to_string(),
            title: title.to_string(),
            year: 2019,
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Example"), "Example");
        assert_eq!(sanitize_filename("C/C++: A <Primer>?"), "CC++ A Primer");
        assert_eq!(sanitize_filename(" ..Tabs\tand\nnewlines.. "), "Tabs and newlines");
    }

    #[test]
    fn test_numbered() {
        assert_eq!(numbered("Example-2019.pdf", 0), "Example-2019.pdf");
        assert_eq!(numbered("Example-2019.pdf", 1), "Example-2019 (1).pdf");
        assert_eq!(numbered("Example-2019.pdf", 12), "Example-2019 (12).pdf");
    }

    #[tokio::test]
    async fn test_repeated_writes_never_overwrite() {
        let dir = TempDir::new().unwrap();
        let b = book("Example", &[100]);

        let first = write_book(&b, None, dir.path()).await.unwrap();
        let second = write_book(&b, None, dir.path()).await.unwrap();
        let third = write_book(&b, None, dir.path()).await.unwrap();

        assert_eq!(first, "Example-2019.pdf");
        assert_eq!(second, "Example-2019 (1).pdf");
        assert_eq!(third, "Example-2019 (2).pdf");
        for name in [first, second, third] {
            assert!(dir.path().join(name).is_file());
        }
    }

    #[tokio::test]
    async fn test_invalid_name_falls_back_to_isbn() {
        let dir = TempDir::new().unwrap();
        let title = "a".repeat(300);
        let b = book(&title, &[100]);

        let saved = write_book(&b, None, dir.path()).await.unwrap();
        assert_eq!(saved, "ISBN_9783446450523-2019.pdf");
        assert!(dir.path().join(&saved).is_file());
    }

    #[tokio::test]
    async fn test_missing_directory_fails_both_names() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let b = book("Example", &[100]);

        let err = write_book(&b, None, &missing).await.unwrap_err();
        assert!(matches!(
            err,
            MergeError::Unsaveable { ref filename, .. } if filename == "ISBN_9783446450523-2019.pdf"
        ));
        assert!(err.to_string().starts_with("unable to save book as"));
    }

    #[tokio::test]
    async fn test_empty_book_is_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let b = book("Example", &[]);

        let err = write_book(&b, None, dir.path()).await.unwrap_err();
        assert!(matches!(err, MergeError::Empty));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_partially_downloaded_book_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let mut b = book("Example", &[100]);
        b.chapters.push(Chapter::new("Second", "/c2"));
        b.chapters.push(Chapter::new("Third", "/c3"));

        let err = write_book(&b, None, dir.path()).await.unwrap_err();
        assert!(matches!(err, MergeError::MissingContent { ref title } if title == "Second"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_supplied_document_is_used() {
        let dir = TempDir::new().unwrap();
        let b = book("Complete", &[]);
        let seed = MergedDocument::from_pdf("complete", &sample_pdf(&[100, 200])).unwrap();

        let saved = write_book(&b, Some(seed), dir.path()).await.unwrap();
        let doc = lopdf::Document::load(dir.path().join(saved)).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
