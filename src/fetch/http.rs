// src/fetch/http.rs
// =============================================================================
// This module performs the HTTP GETs for pages and images.
//
// Key functionality:
// - One shared reqwest client with a spoofed browser User-Agent and a fixed
//   per-request timeout
// - Page requests return the raw body bytes plus status, Content-Type and
//   final URL. Decoding is left to the parser, which also looks at <meta>
// - Image requests additionally send a Referer header naming the page the
//   image was found on (gets past naive hot-link protection)
// - Failures are classified as network errors (timeout, DNS, connect, ...)
//   or HTTP errors (any non-2xx status)
//
// No retries: exactly one attempt per request.
//
// Rust concepts:
// - async/await: For network I/O
// - Result<T, E>: Every request either yields data or a FetchError
// - Error source chains: reqwest wraps hyper/io errors several layers deep
// =============================================================================

use crate::config::HarvestConfig;
use crate::error::{FetchError, NetworkErrorKind};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::{redirect, Client};
use url::Url;

// A page that was fetched successfully
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,
    /// Where we ended up after following redirects
    pub final_url: Url,
    /// HTTP status code (always 2xx)
    pub status: u16,
    /// The Content-Type header, if the server sent a readable one
    pub content_type: Option<String>,
    /// Raw response body
    pub body: Vec<u8>,
}

// Issues page and image requests with the harvester's fixed header set
//
// Cloning is cheap: reqwest::Client is reference counted internally, so the
// fetcher can be shared between the driver and the downloader.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    // Builds the HTTP client from the run configuration
    //
    // Returns an error only if reqwest cannot initialise its TLS backend.
    pub fn new(config: &HarvestConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,image/avif,image/webp,*/*;q=0.8"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client })
    }

    // Fetches one page
    //
    // Parameters:
    //   url: absolute URL of the page
    //
    // Returns: the page body, or a FetchError that the driver treats as fatal
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| categorize_error(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| categorize_error(url.as_str(), e))?
            .to_vec();

        log::debug!(
            "Fetched {} (HTTP {}, {} bytes)",
            final_url,
            status.as_u16(),
            body.len()
        );

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    // Fetches the raw bytes of one image
    //
    // Parameters:
    //   url: absolute image URL (a string, since it comes straight from markup)
    //   referer: the page the image was found on
    pub async fn fetch_asset(&self, url: &str, referer: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .header(REFERER, referer.as_str())
            .send()
            .await
            .map_err(|e| categorize_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| categorize_error(url, e))?;

        Ok(bytes.to_vec())
    }
}

// Categorizes the different ways a reqwest request can fail
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - Connection refused / TLS handshake failure
// - Too many redirects
// - A URL reqwest refuses to request (e.g. a data: URI)
fn categorize_error(url: &str, error: reqwest::Error) -> FetchError {
    let message = error_chain(&error);
    let lowered = message.to_lowercase();

    let kind = if error.is_timeout() {
        NetworkErrorKind::Timeout
    } else if error.is_redirect() {
        NetworkErrorKind::TooManyRedirects
    } else if error.is_builder() {
        NetworkErrorKind::InvalidRequest
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if lowered.contains("dns") || lowered.contains("resolve") {
            NetworkErrorKind::Dns
        } else {
            NetworkErrorKind::Connect
        }
    } else if error.is_body() || error.is_decode() {
        NetworkErrorKind::Body
    } else {
        NetworkErrorKind::Other
    };

    FetchError::Network {
        url: url.to_string(),
        kind,
        message,
    }
}

// Flattens an error and all of its sources into one line
//
// reqwest's own message is usually just "error sending request for url";
// the interesting part (e.g. "Connection refused") sits in the source chain.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}
