use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use isbn2pdf::config::{Config, DEFAULT_TIMEOUT_SECS};
use isbn2pdf::isbn::{isbn_from_url, isbn_to_catalog_url, normalize_catalog_url, normalize_isbn, validate_isbn};
use isbn2pdf::{CancelFlag, Pipeline, Progress};
use std::path::{Path, PathBuf};
use std::process;
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "isbn2pdf=info";

#[derive(Parser)]
#[command(name = "isbn2pdf")]
#[command(about = "Download books from the Hanser eLibrary as a single PDF file")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one or more books and merge each into a PDF
    Download {
        /// URL(s) of book(s) to download
        #[arg(value_name = "URL", value_parser = parse_catalog_url)]
        urls: Vec<String>,

        /// ISBN(s) of book(s) to download, either ISBN-10 or ISBN-13
        #[arg(long = "isbn", value_name = "ISBN", num_args = 1.., value_parser = parse_isbn)]
        isbns: Vec<String>,

        /// Output directory, defaults to the current directory
        #[arg(short = 'o', long = "out", value_name = "PATH")]
        out_dir: Option<PathBuf>,

        /// Create the output directory if it does not exist
        #[arg(short = 'f', long = "force")]
        force: bool,

        /// Request timeout in seconds
        #[arg(short = 't', long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = parse_timeout)]
        timeout: f64,
    },
    /// Show the metadata of a book without downloading it
    Info {
        /// URL or ISBN of the book
        #[arg(value_name = "URL|ISBN", value_parser = parse_book_ref)]
        url: String,

        /// Print the metadata as JSON
        #[arg(long)]
        json: bool,

        /// Request timeout in seconds
        #[arg(short = 't', long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = parse_timeout)]
        timeout: f64,
    },
}

fn parse_timeout(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|_| "Not a number.")?;
    if value < 0.0 || !value.is_finite() {
        return Err("Must be zero or positive number.".to_string());
    }
    Ok(value)
}

fn parse_catalog_url(s: &str) -> Result<String, String> {
    normalize_catalog_url(s).map_err(|e| e.to_string())
}

fn parse_isbn(s: &str) -> Result<String, String> {
    isbn_to_catalog_url(s).map_err(|e| e.to_string())
}

fn parse_book_ref(s: &str) -> Result<String, String> {
    if validate_isbn(&normalize_isbn(s), true) {
        parse_isbn(s)
    } else {
        parse_catalog_url(s)
    }
}

/// Category-prefixed log line.
fn log(category: &str, msg: &str) {
    let msg = msg.replace('\n', &format!("\n{:12}", ""));
    info!("{}{}", format!("{:<12}", category.to_uppercase()).bold(), msg);
}

fn report_progress(event: Progress<'_>) {
    match event {
        Progress::Book { index, total, url } => {
            log(&format!("book {}/{}", index, total), &url.green().to_string())
        }
        Progress::Resolving { url } => log("resolving", &format!("ISBN {}", isbn_from_url(url))),
        Progress::Found(book) => log("found", &book.to_string()),
        Progress::DownloadingComplete { title } => log("download", title),
        Progress::DownloadingChapter { index, total, title } => {
            let width = total.to_string().len();
            log("download", &format!("# {:0width$} - {}...", index, title, width = width))
        }
        Progress::Collecting { title } => log("collecting", &format!("{}...", title)),
        Progress::Saved { filename } => log("saved", &filename.blue().to_string()),
        Progress::Skipped { url, error: err } => {
            error!("{}", format!("Skipped {}: {}", url, err).red())
        }
    }
}

/// Resolve the output directory, creating it when `force` is set.
async fn prepare_out_dir(out_dir: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let out_dir = match out_dir {
        Some(path) => expand_home(path),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match fs::metadata(&out_dir).await {
        Ok(meta) if meta.is_file() => Err(anyhow!("'{}' points to a file", out_dir.display())),
        Ok(_) => {
            check_writable(&out_dir).await?;
            Ok(out_dir)
        }
        Err(_) if !force => Err(anyhow!(
            "no directory '{}' found and -f was not set",
            out_dir.display()
        )),
        Err(_) => {
            fs::create_dir_all(&out_dir)
                .await
                .with_context(|| format!("could not create directory '{}'", out_dir.display()))?;
            log("info", &format!("Created output directory\n{}", out_dir.display()));
            Ok(out_dir)
        }
    }
}

/// Create and remove a marker file to check that `dir` accepts new files.
async fn check_writable(dir: &Path) -> Result<()> {
    let marker = dir.join(format!(".isbn2pdf-{}", process::id()));
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&marker)
        .await
        .with_context(|| format!("permission to write to directory '{}' denied", dir.display()))?;
    fs::remove_file(&marker)
        .await
        .with_context(|| format!("could not remove '{}'", marker.display()))
}

fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path,
    }
}

async fn download(urls: Vec<String>, out_dir: Option<PathBuf>, force: bool, timeout: f64) -> Result<bool> {
    if urls.is_empty() {
        return Err(anyhow!("at least one of the following arguments is required: URL, --isbn"));
    }
    let out_dir = prepare_out_dir(out_dir, force).await?;

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.cancel();
        }
    });

    let config = Config::default().with_timeout_secs(timeout);
    let pipeline = Pipeline::new(&config, &out_dir, cancel)
        .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

    log("", "Starting isbn2pdf");
    let report = pipeline.run(&urls, report_progress).await;

    if report.cancelled {
        log("exit", "Operation cancelled by user");
        return Ok(false);
    }
    log(
        "finished",
        &format!("{} saved, {} skipped", report.saved.len(), report.skipped.len()),
    );
    Ok(true)
}

async fn info(url: String, json: bool, timeout: f64) -> Result<()> {
    let config = Config::default().with_timeout_secs(timeout);
    let pipeline = Pipeline::new(&config, ".", CancelFlag::new())
        .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

    let book = pipeline.resolver().resolve(&url).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&book)?);
    } else {
        log("found", &book.to_string());
        for (i, chapter) in book.chapters.iter().enumerate() {
            log("chapter", &format!("{} - {}", i + 1, chapter.title));
        }
        if let Some(href) = &book.complete_pdf_href {
            log("complete", href);
        }
    }
    Ok(())
}

/// `RUST_LOG` directives when set and valid, `isbn2pdf=info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(directives.as_deref());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Download { urls, isbns, out_dir, force, timeout } => {
            let urls = urls.into_iter().chain(isbns).collect();
            download(urls, out_dir, force, timeout).await
        }
        Commands::Info { url, json, timeout } => info(url, json, timeout).await.map(|_| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{}", format!("Error: {}", e).red());
            process::exit(1);
        }
    }
}
