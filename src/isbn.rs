//! ISBN checksums and catalog URL normalization.

use url::Url;

use crate::config::CATALOG_URL;
use crate::error::ValidationError;

/// Remove hyphens and upper-case a trailing `x` check character.
pub fn normalize_isbn(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// True if `code` carries a valid ISBN-13, or ISBN-10 when allowed, checksum.
///
/// ```
/// use isbn2pdf::isbn::validate_isbn;
///
/// assert!(validate_isbn("978-3-446-45052-3", true));
/// assert!(validate_isbn("080442957X", true));
/// assert!(!validate_isbn("080442957X", false));
/// ```
pub fn validate_isbn(code: &str, allow_isbn10: bool) -> bool {
    let code: Vec<char> = code.chars().filter(|c| *c != '-').collect();

    match code.len() {
        13 => {
            let Some(digits) = code.iter().map(|c| c.to_digit(10)).collect::<Option<Vec<_>>>()
            else {
                return false;
            };
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
                .sum();
            sum % 10 == 0
        }
        10 if allow_isbn10 => {
            let Some(mut digits) = code[..9]
                .iter()
                .map(|c| c.to_digit(10))
                .collect::<Option<Vec<_>>>()
            else {
                return false;
            };
            let check = match code[9] {
                'x' | 'X' => 10,
                c => match c.to_digit(10) {
                    Some(d) => d,
                    None => return false,
                },
            };
            digits.push(check);
            let sum: u32 = digits.iter().zip(1..).map(|(d, weight)| d * weight).sum();
            sum % 11 == 0
        }
        _ => false,
    }
}

/// Validate a catalog URL and return its canonical, scheme-qualified form.
///
/// Accepted paths are `isbn/<ISBN>` (ISBN-10 or ISBN-13) and
/// `doi/book/<prefix>/<ISBN-13>`. A missing scheme is filled in, and a bare
/// path is placed on the catalog host.
pub fn normalize_catalog_url(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();
    let catalog = catalog_url()?;
    let canonical_host = catalog.host_str().unwrap_or_default();

    let qualified = if raw.contains("://") {
        raw.to_string()
    } else {
        let trimmed = raw.trim_start_matches('/');
        let first = trimmed.split('/').next().unwrap_or_default();
        if first.contains('.') {
            format!("{}://{}", catalog.scheme(), trimmed)
        } else {
            format!("{}://{}/{}", catalog.scheme(), canonical_host, trimmed)
        }
    };

    let parsed = Url::parse(&qualified).map_err(|_| ValidationError::InvalidUrl(raw.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl(raw.to_string()));
    }

    let host = parsed.host_str().unwrap_or_default();
    let bare_host = canonical_host.trim_start_matches("www.");
    if host != canonical_host && host != bare_host {
        return Err(ValidationError::InvalidHost(host.to_string()));
    }

    let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();
    let path = segments.join("/");

    match segments.len() {
        2 if segments[0] != "isbn" => {
            return Err(ValidationError::InvalidPrefix {
                expected: "isbn".to_string(),
                found: segments[0].to_string(),
            });
        }
        4 if !path.starts_with("doi/book/") => {
            return Err(ValidationError::InvalidPrefix {
                expected: "doi/book/<DOI>".to_string(),
                found: path,
            });
        }
        2 | 4 => {}
        _ => return Err(ValidationError::SegmentCount(path)),
    }

    let allow_isbn10 = segments.len() == 2;
    let last = segments[segments.len() - 1];
    if !validate_isbn(last, allow_isbn10) {
        return Err(ValidationError::UrlChecksum(last.to_string()));
    }

    Ok(format!("{}://{}/{}", catalog.scheme(), host, path))
}

/// Build the canonical `isbn/<digits>` catalog URL for an ISBN.
pub fn isbn_to_catalog_url(isbn: &str) -> Result<String, ValidationError> {
    let isbn = normalize_isbn(isbn);
    if !validate_isbn(&isbn, true) {
        return Err(ValidationError::IsbnChecksum(isbn));
    }
    Ok(format!("{}/isbn/{}", CATALOG_URL.trim_end_matches('/'), isbn))
}

/// The identifier a catalog URL ends with, in normalized form.
pub fn isbn_from_url(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let last = path
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or_default();
    normalize_isbn(last)
}

fn catalog_url() -> Result<Url, ValidationError> {
    Url::parse(CATALOG_URL).map_err(|_| ValidationError::InvalidUrl(CATALOG_URL.to_string()))
}
