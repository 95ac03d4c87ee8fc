//! Error types for isbn2pdf.
//!
//! Every stage of the pipeline fails with its own error kind; `Error` joins
//! them so the orchestrator can decide between skipping a book and aborting
//! the whole batch.

use thiserror::Error;

/// Input rejected by the ISBN/URL validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("invalid location: {0}")]
    InvalidHost(String),

    #[error("invalid amount of path elements in '{0}'")]
    SegmentCount(String),

    #[error("path must start with '{expected}' not '{found}'")]
    InvalidPrefix { expected: String, found: String },

    #[error("url end {0} returns invalid ISBN checksum")]
    UrlChecksum(String),

    #[error("invalid ISBN checksum for '{0}'")]
    IsbnChecksum(String),
}

/// The book exists but the current session may not download it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unauthorized to download '{title}'")]
pub struct AccessError {
    pub title: String,
}

/// The catalog page could not be fetched or is missing an expected field.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("book not found for this identifier ({url})")]
    NotFound { url: String },

    #[error("{url} returned status code {status}")]
    Status { url: String, status: u16 },

    #[error("could not reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("no title found")]
    NoTitle,

    #[error("authors not found")]
    NoAuthors,

    #[error("could not retrieve chapter list")]
    NoChapters,

    #[error("year of publication not found")]
    NoYear,
}

/// A chapter or complete-book PDF could not be fetched.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("'{url}' response code: {status}")]
    Status { url: String, status: u16 },

    #[error("'{url}' timed out")]
    Timeout { url: String },

    #[error("could not connect to '{url}': {reason}")]
    Connection { url: String, reason: String },

    #[error("download of '{url}' failed: {reason}")]
    Failed { url: String, reason: String },

    #[error("'{url}' sent '{content_type}' not 'application/pdf'")]
    NotPdf { url: String, content_type: String },
}

/// The merged book is empty or could not be written to disk.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("merged book contains no pages")]
    Empty,

    #[error("chapter '{title}' was not downloaded")]
    MissingContent { title: String },

    #[error("could not read PDF of '{label}': {reason}")]
    Malformed { label: String, reason: String },

    #[error("could not serialize merged book: {0}")]
    Serialize(String),

    #[error("unable to save book as {filename}: {reason}")]
    Unsaveable { filename: String, reason: String },
}

/// Main error type of the acquisition pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    /// The user interrupted the run.
    #[error("operation cancelled by user")]
    Cancelled,
}

impl Error {
    /// Whether the orchestrator may skip the current book and go on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Cancelled)
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(MergeError::Empty);
        assert_eq!(err.to_string(), "merged book contains no pages");

        let err = Error::from(AccessError {
            title: "Example".to_string(),
        });
        assert_eq!(err.to_string(), "unauthorized to download 'Example'");
    }

    #[test]
    fn test_not_pdf_names_url_and_type() {
        let err = DownloadError::NotPdf {
            url: "https://example.org/a".to_string(),
            content_type: "text/html".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.org/a"));
        assert!(msg.contains("text/html"));
    }

    #[test]
    fn test_only_cancellation_aborts() {
        assert!(!Error::Cancelled.is_recoverable());
        assert!(Error::from(MetaError::NoTitle).is_recoverable());
        assert!(Error::from(DownloadError::Timeout {
            url: "u".to_string()
        })
        .is_recoverable());
    }
}
