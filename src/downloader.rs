use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::book::Chapter;
use crate::error::{DownloadError, Result};
use crate::pdf_merger::MergedDocument;

const PDF_MIME: &str = "application/pdf";

/// Fetches chapter and complete-book PDFs from the catalog.
pub struct Downloader {
    client: Client,
    base_url: Url,
}

impl Downloader {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Resolve a catalog link against the base URL.
    pub fn resolve_href(&self, href: &str) -> std::result::Result<Url, DownloadError> {
        self.base_url.join(href).map_err(|e| DownloadError::Failed {
            url: href.to_string(),
            reason: format!("Failed to join URL: {}", e),
        })
    }

    /// Download a PDF, forcing the server to send the file instead of its viewer.
    pub async fn fetch_pdf(&self, url: &Url) -> std::result::Result<Vec<u8>, DownloadError> {
        debug!("Fetching \"{}\"", url);

        let response = self
            .client
            .get(url.clone())
            .query(&[("download", "true")])
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if content_type != PDF_MIME {
            return Err(DownloadError::NotPdf {
                url: url.to_string(),
                content_type,
            });
        }

        let data = response.bytes().await.map_err(|e| request_error(url, e))?;
        debug!("Received {} bytes from \"{}\"", data.len(), url);
        Ok(data.to_vec())
    }

    /// Fetch the PDF of a chapter and return it with its content filled in.
    pub async fn download_chapter(
        &self,
        chapter: Chapter,
    ) -> std::result::Result<Chapter, DownloadError> {
        let url = self.resolve_href(&chapter.href)?;
        debug!("Downloading \"{}\" from \"{}\"", chapter.title, url);
        let content = self.fetch_pdf(&url).await?;
        Ok(chapter.with_content(content))
    }

    /// Fetch a complete-book PDF as the seed of the merged book.
    pub async fn download_complete_book(&self, href: &str) -> Result<MergedDocument> {
        let url = self.resolve_href(href)?;
        debug!("Downloading complete book from \"{}\"", url);
        let content = self.fetch_pdf(&url).await?;
        Ok(MergedDocument::from_pdf(url.as_str(), &content)?)
    }
}

fn request_error(url: &Url, error: reqwest::Error) -> DownloadError {
    let url = url.to_string();
    if error.is_timeout() {
        DownloadError::Timeout { url }
    } else if error.is_connect() {
        DownloadError::Connection {
            url,
            reason: error.to_string(),
        }
    } else if let Some(status) = error.status() {
        DownloadError::Status {
            url,
            status: status.as_u16(),
        }
    } else {
        DownloadError::Failed {
            url,
            reason: error.to_string(),
        }
    }
}
