//! Product lookup client.
//!
//! Fetches product metadata for a barcode from the UPC lookup web API:
//! a single `GET {base_url}?upc={barcode}` answered with
//! `{ "items": [ { "title": ..., "brand": ..., "description": ... } ] }`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Default product API base URL.
pub const DEFAULT_BASE_URL: &str = "https://upc.up.railway.app";

/// One product entry in a lookup response.
///
/// Only the fields upcscan displays are kept; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product title.
    #[serde(default)]
    pub title: Option<String>,
    /// Product brand.
    #[serde(default)]
    pub brand: Option<String>,
    /// Product description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A decoded lookup response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    /// Matching products, best match first.
    #[serde(default)]
    pub items: Option<Vec<ProductRecord>>,
}

impl LookupResponse {
    /// The best matching product, if any.
    #[must_use]
    pub fn first_item(&self) -> Option<&ProductRecord> {
        self.items.as_deref().and_then(<[ProductRecord]>::first)
    }
}

/// A source of product metadata.
#[async_trait]
pub trait ProductApi: Send + Sync {
    /// Fetch the lookup response for `barcode`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the API cannot be reached and
    /// [`Error::InvalidResponse`] if the body is not a lookup response.
    async fn fetch(&self, barcode: &str) -> Result<LookupResponse>;
}

/// [`ProductApi`] backed by the HTTP lookup service.
#[derive(Debug, Clone)]
pub struct HttpProductApi {
    client: Client,
    base_url: Url,
}

impl HttpProductApi {
    /// Create a client for the API at `base_url`.
    ///
    /// `timeout` bounds each request; `None` waits as long as the
    /// connection stays open.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid API base URL '{base_url}': {e}"),
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, base_url })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the request URL for `barcode`.
    #[must_use]
    pub fn request_url(&self, barcode: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("upc", barcode);
        url
    }
}

#[async_trait]
impl ProductApi for HttpProductApi {
    #[instrument(skip(self))]
    async fn fetch(&self, barcode: &str) -> Result<LookupResponse> {
        let url = self.request_url(barcode);

        let response = self.client.get(url).send().await?;
        debug!(status = %response.status(), "Product API responded");

        // The status code is not inspected: error bodies that still parse
        // are treated like any other answer. Undecodable bodies map to
        // `Error::InvalidResponse`.
        Ok(response.json::<LookupResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Serve one canned HTTP response on a loopback port.
    ///
    /// Returns the base URL and a handle resolving to the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (format!("http://{addr}/"), handle)
    }

    #[test]
    fn test_first_item() {
        let response: LookupResponse = serde_json::from_str(
            r#"{"code":"OK","total":2,"items":[{"title":"Widget","brand":"Acme","ean":"0012345678905"},{"title":"Other"}]}"#,
        )
        .unwrap();

        let first = response.first_item().unwrap();
        assert_eq!(first.title.as_deref(), Some("Widget"));
        assert_eq!(first.brand.as_deref(), Some("Acme"));
        assert!(first.description.is_none());
    }

    #[test]
    fn test_first_item_empty_or_absent() {
        let empty: LookupResponse = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(empty.first_item().is_none());

        let absent: LookupResponse = serde_json::from_str(r#"{"code":"INVALID_UPC"}"#).unwrap();
        assert!(absent.first_item().is_none());

        let null: LookupResponse = serde_json::from_str(r#"{"items":null}"#).unwrap();
        assert!(null.first_item().is_none());
    }

    #[test]
    fn test_request_url() {
        let api = HttpProductApi::new(DEFAULT_BASE_URL, None).unwrap();
        assert_eq!(
            api.request_url("012345678905").as_str(),
            "https://upc.up.railway.app/?upc=012345678905"
        );
    }

    #[test]
    fn test_request_url_encodes_barcode() {
        let api = HttpProductApi::new("https://example.com/lookup", None).unwrap();
        assert_eq!(
            api.request_url("12 34&x").as_str(),
            "https://example.com/lookup?upc=12+34%26x"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpProductApi::new("not a url", None).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[tokio::test]
    async fn test_fetch_parses_items() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"items":[{"title":"Widget","brand":"Acme"}]}"#,
        )
        .await;
        let api = HttpProductApi::new(&base_url, Some(Duration::from_secs(5))).unwrap();

        let response = api.fetch("012345678905").await.unwrap();

        assert_eq!(response.first_item().unwrap().title.as_deref(), Some("Widget"));
        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /?upc=012345678905 "));
    }

    #[tokio::test]
    async fn test_fetch_ignores_status_code() {
        let (base_url, _server) = serve_once("404 Not Found", r#"{"items":[]}"#).await;
        let api = HttpProductApi::new(&base_url, Some(Duration::from_secs(5))).unwrap();

        let response = api.fetch("000000000000").await.unwrap();
        assert!(response.first_item().is_none());
    }

    #[tokio::test]
    async fn test_fetch_invalid_body() {
        let (base_url, _server) = serve_once("502 Bad Gateway", "<html>oops</html>").await;
        let api = HttpProductApi::new(&base_url, Some(Duration::from_secs(5))).unwrap();

        let err = api.fetch("012345678905").await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api =
            HttpProductApi::new(&format!("http://{addr}/"), Some(Duration::from_secs(5))).unwrap();
        let err = api.fetch("012345678905").await.unwrap_err();

        assert!(matches!(err, Error::Network(_)));
    }
}
