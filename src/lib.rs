//! # isbn2pdf
//!
//! A CLI utility to download books from the Hanser eLibrary as a single PDF.
//!
//! ## Current Features
//!
//! - ISBN-10/13 checksum and catalog URL validation
//! - Catalog page scraping (title, authors, year, chapters, complete-book link)
//! - Chapter or complete-book PDF download
//! - PDF merging with collision-safe saving
//!
//! ## Usage
//!
//! ```bash
//! isbn2pdf download https://www.hanser-elibrary.com/isbn/9783446450523
//! isbn2pdf download --isbn 978-3-446-45052-3 -o ~/books -f
//! ```

pub mod book;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod isbn;
pub mod pdf_merger;
pub mod pipeline;
pub mod resolver;
pub mod writer;

#[cfg(test)]
mod testing;

pub use book::{Book, Chapter, DownloadMode};
pub use config::Config;
pub use downloader::Downloader;
pub use error::{AccessError, DownloadError, Error, MergeError, MetaError, Result, ValidationError};
pub use pdf_merger::MergedDocument;
pub use pipeline::{BatchReport, CancelFlag, Pipeline, Progress};
pub use resolver::Resolver;
pub use writer::write_book;
