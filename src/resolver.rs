use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::book::Book;
use crate::catalog::parse_catalog_page;
use crate::error::{MetaError, Result};

/// Fetches catalog pages and turns them into [`Book`]s.
pub struct Resolver {
    client: Client,
}

impl Resolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve the metadata of the book behind `url`.
    pub async fn resolve(&self, url: &str) -> Result<Book> {
        debug!("Resolving \"{}\"", url);
        let html = self.fetch_page(url).await?;
        debug!("Catalog page has {} bytes", html.len());
        parse_catalog_page(&html, url)
    }

    async fn fetch_page(&self, url: &str) -> std::result::Result<String, MetaError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MetaError::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MetaError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(MetaError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| MetaError::Unreachable {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Error;
    use crate::http::create_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <h1 class="current-issue__title">Example</h1>
        <span class="hlFld-ContribAuthor">Ada Lovelace</span>
        <div class="issue-item__content">
          <div class="issue-item__title">One</div>
          <a title="PDF" href="/doi/epdf/10.3139/9783446450523.001">PDF</a>
        </div>
        <div class="cover-details__copyright">© 2019</div>
    </body></html>"#;

    fn resolver() -> Resolver {
        Resolver::new(create_client(&Config::default()).unwrap())
    }

    #[tokio::test]
    async fn test_resolve_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/isbn/9783446450523"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let url = format!("{}/isbn/9783446450523", server.uri());
        let book = resolver().resolve(&url).await.unwrap();

        assert_eq!(book.title, "Example");
        assert_eq!(book.source_url, url);
        assert_eq!(book.chapters[0].href, "/doi/pdf/10.3139/9783446450523.001");
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/isbn/9783446450523", server.uri());
        let err = resolver().resolve(&url).await.unwrap_err();
        assert!(matches!(err, Error::Meta(MetaError::NotFound { .. })));
        assert!(err.to_string().contains("book not found"));
    }

    #[tokio::test]
    async fn test_server_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = format!("{}/isbn/9783446450523", server.uri());
        let err = resolver().resolve(&url).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Meta(MetaError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{}/isbn/9783446450523", port);
        let err = resolver().resolve(&url).await.unwrap_err();
        assert!(matches!(err, Error::Meta(MetaError::Unreachable { .. })));
    }
}
