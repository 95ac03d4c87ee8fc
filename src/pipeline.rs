//! Sequential acquisition of a batch of books.
//!
//! Books are processed one after another, and so are the chapters of each
//! book. A failing book is reported and skipped; only a cancellation stops
//! the batch.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::book::{Book, DownloadMode};
use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::http::create_client;
use crate::resolver::Resolver;
use crate::writer::write_book;

/// Cooperative cancellation shared between the signal handler and the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Progress of the pipeline, for the caller to present.
#[derive(Debug)]
pub enum Progress<'a> {
    Book { index: usize, total: usize, url: &'a str },
    Resolving { url: &'a str },
    Found(&'a Book),
    DownloadingComplete { title: &'a str },
    DownloadingChapter { index: usize, total: usize, title: &'a str },
    Collecting { title: &'a str },
    Saved { filename: &'a str },
    Skipped { url: &'a str, error: &'a Error },
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: Vec<String>,
    pub skipped: Vec<(String, Error)>,
    pub cancelled: bool,
}

pub struct Pipeline {
    resolver: Resolver,
    downloader: Downloader,
    out_dir: PathBuf,
    cancel: CancelFlag,
}

impl Pipeline {
    pub fn new(config: &Config, out_dir: impl Into<PathBuf>, cancel: CancelFlag) -> reqwest::Result<Self> {
        let client = create_client(config)?;
        Ok(Self {
            resolver: Resolver::new(client.clone()),
            downloader: Downloader::new(client, config.base_url.clone()),
            out_dir: out_dir.into(),
            cancel,
        })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolve, download, merge and save one book; returns the saved filename.
    pub async fn acquire<F>(&self, url: &str, on_progress: &mut F) -> Result<String>
    where
        F: FnMut(Progress<'_>),
    {
        self.cancel.check()?;
        on_progress(Progress::Resolving { url });
        let mut book = self.resolver.resolve(url).await?;
        on_progress(Progress::Found(&book));

        let complete_href = match book.download_mode() {
            DownloadMode::Complete(href) => Some(href.to_string()),
            DownloadMode::Chapters(_) => None,
        };

        let document = match complete_href {
            Some(href) => {
                self.cancel.check()?;
                on_progress(Progress::DownloadingComplete { title: &book.title });
                Some(self.downloader.download_complete_book(&href).await?)
            }
            None => {
                let chapters = std::mem::take(&mut book.chapters);
                let total = chapters.len();
                let mut downloaded = Vec::with_capacity(total);
                for (i, chapter) in chapters.into_iter().enumerate() {
                    self.cancel.check()?;
                    on_progress(Progress::DownloadingChapter {
                        index: i + 1,
                        total,
                        title: &chapter.title,
                    });
                    downloaded.push(self.downloader.download_chapter(chapter).await?);
                }
                book.chapters = downloaded;
                None
            }
        };

        self.cancel.check()?;
        on_progress(Progress::Collecting { title: &book.title });
        let filename = write_book(&book, document, &self.out_dir).await?;
        on_progress(Progress::Saved { filename: &filename });
        Ok(filename)
    }

    /// Acquire every book in `urls`, skipping the ones that fail.
    pub async fn run<F>(&self, urls: &[String], mut on_progress: F) -> BatchReport
    where
        F: FnMut(Progress<'_>),
    {
        let mut report = BatchReport::default();
        let total = urls.len();

        for (i, url) in urls.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            on_progress(Progress::Book {
                index: i + 1,
                total,
                url,
            });

            match self.acquire(url, &mut on_progress).await {
                Ok(filename) => report.saved.push(filename),
                Err(error) if !error.is_recoverable() => {
                    debug!("Stopped while processing {}: {}", url, error);
                    report.cancelled = true;
                    break;
                }
                Err(error) => {
                    debug!("Skipped {}: {}", url, error);
                    on_progress(Progress::Skipped { url, error: &error });
                    report.skipped.push((url.clone(), error));
                }
            }
        }

        report
    }
}
