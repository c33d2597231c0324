//! Gutendex (Project Gutenberg catalogue) search client and text downloader.

mod formats;
pub mod types;

pub use formats::pick_text_url;

use std::env;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use types::{Book, BookList};

const API_BASE: &str = "https://gutendex.com";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const TEXT_TIMEOUT: Duration = Duration::from_secs(30);
/// Hard cap on a downloaded text body, regardless of the requested excerpt size.
pub(crate) const MAX_TEXT_BYTES: usize = 20_000_000;

#[derive(Debug, thiserror::Error)]
pub enum GutendexError {
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: status {0}")]
    Status(u16),

    #[error("failed to decode JSON response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("response too large (>{} bytes)", MAX_TEXT_BYTES)]
    TooLarge,
}

/// Source of catalogue records and book texts.
/// Implemented by `GutendexClient` for production; mock implementations used in tests.
pub trait Catalog {
    async fn search(&self, title: &str) -> Result<Vec<Book>, GutendexError>;

    /// Download the text behind `url`. With `byte_budget`, stop reading once that
    /// many bytes have arrived; the caller truncates to characters afterwards.
    async fn fetch_text(&self, url: &str, byte_budget: Option<usize>)
    -> Result<String, GutendexError>;
}

#[derive(Clone)]
pub struct GutendexClient {
    http: Client,
    base_url: String,
}

impl GutendexClient {
    /// Uses `GUTENDEX_BASE_URL` when set (e.g. a self-hosted mirror).
    pub fn from_env(http: Client) -> Self {
        let base_url = env::var("GUTENDEX_BASE_URL")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| API_BASE.to_string());
        Self::with_base_url(http, &base_url)
    }

    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Catalog for GutendexClient {
    async fn search(&self, title: &str) -> Result<Vec<Book>, GutendexError> {
        let url = url::Url::parse_with_params(
            &format!("{}/books/", self.base_url),
            &[("search", title)],
        )?;

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, query = %title, "Gutendex search failed");
            return Err(GutendexError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let list: BookList =
            serde_json::from_str(&body).map_err(|e| GutendexError::Decode(e.to_string()))?;

        debug!(
            query = %title,
            count = list.count,
            returned = list.results.len(),
            "gutendex search complete"
        );
        Ok(list.results)
    }

    async fn fetch_text(
        &self,
        url: &str,
        byte_budget: Option<usize>,
    ) -> Result<String, GutendexError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(TEXT_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GutendexError::Status(status.as_u16()));
        }

        let encoding = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_of)
            .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
            .unwrap_or(encoding_rs::UTF_8);

        let mut body = Vec::new();
        let mut stream = response;
        while let Some(chunk) = stream.chunk().await? {
            body.extend_from_slice(&chunk);
            if byte_budget.is_some_and(|budget| body.len() >= budget) {
                break;
            }
            if body.len() > MAX_TEXT_BYTES {
                return Err(GutendexError::TooLarge);
            }
        }

        let (text, _, had_errors) = encoding.decode(&body);
        if had_errors {
            debug!(url, encoding = encoding.name(), "text contained undecodable bytes");
        }
        debug!(url, bytes = body.len(), "text fetched");
        Ok(text.into_owned())
    }
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}
