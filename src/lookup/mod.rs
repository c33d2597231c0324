//! Title lookup: fan a list of titles out to the catalogue, cap and normalize the
//! matches, and optionally attach (truncated) book texts.
//!
//! Search and text failures are recorded in the result set; only an invalid
//! request is an error, and it is rejected before any network call.

mod normalize;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::gutendex::Catalog;

pub const DEFAULT_MAX_RESULTS: i64 = 3;
pub const DEFAULT_MAX_CHARS: i64 = 20_000;
const MAX_CONCURRENT_TITLES: usize = 4;
const MAX_CONCURRENT_TEXTS: usize = 4;
/// Worst-case UTF-8 width; reading this many bytes per requested character is enough.
const MAX_BYTES_PER_CHAR: usize = 4;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("max_results_per_title must be >= 0, got {0}")]
    NegativeMaxResults(i64),

    #[error("max_chars must be >= 0 or null for full text, got {0}")]
    NegativeMaxChars(i64),

    #[error("titles[{index}] is empty; every title must contain text")]
    BlankTitle { index: usize },
}

/// A validated lookup. Construct with [`LookupRequest::new`].
#[derive(Debug, Clone)]
pub struct LookupRequest {
    titles: Vec<String>,
    max_results: usize,
    download_text: bool,
    max_chars: Option<usize>,
}

impl LookupRequest {
    /// `max_chars = None` keeps full texts.
    pub fn new(
        titles: Vec<String>,
        max_results_per_title: i64,
        download_text: bool,
        max_chars: Option<i64>,
    ) -> Result<Self, LookupError> {
        let max_results = usize::try_from(max_results_per_title)
            .map_err(|_| LookupError::NegativeMaxResults(max_results_per_title))?;
        let max_chars = max_chars
            .map(|n| usize::try_from(n).map_err(|_| LookupError::NegativeMaxChars(n)))
            .transpose()?;

        let titles = titles
            .into_iter()
            .enumerate()
            .map(|(index, t)| {
                let trimmed = t.trim();
                if trimmed.is_empty() {
                    Err(LookupError::BlankTitle { index })
                } else {
                    Ok(trimmed.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            titles,
            max_results,
            download_text,
            max_chars,
        })
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn download_text(&self) -> bool {
        self.download_text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub name: String,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
}

/// One candidate work for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: u64,
    pub title: String,
    pub authors: Vec<Author>,
    pub languages: Vec<String>,
    pub download_count: u64,
    pub subjects: Vec<String>,
    pub bookshelves: Vec<String>,
    pub copyright: Option<bool>,
    pub gutenberg_url: String,
    pub text_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub matches: Vec<Match>,
    /// Set when the search call itself failed; `matches` is then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub results: Vec<QueryResult>,
}

/// Run every title of `request` against `catalog`.
///
/// Titles are searched concurrently (bounded) but results keep input order.
pub async fn lookup(catalog: &impl Catalog, request: &LookupRequest) -> ResultSet {
    info!(
        titles = request.titles.len(),
        max_results = request.max_results,
        download_text = request.download_text,
        "lookup"
    );

    let results: Vec<QueryResult> = stream::iter(request.titles.clone())
        .map(|title| async move { lookup_title(catalog, &title, request).await })
        .buffered(MAX_CONCURRENT_TITLES)
        .collect()
        .await;

    ResultSet { results }
}

async fn lookup_title(
    catalog: &impl Catalog,
    title: &str,
    request: &LookupRequest,
) -> QueryResult {
    let books = match catalog.search(title).await {
        Ok(books) => books,
        Err(e) => {
            warn!(query = %title, error = %e, "search failed");
            return QueryResult {
                query: title.to_string(),
                matches: Vec::new(),
                error: Some(format!("Gutendex search failed: {e}")),
            };
        }
    };

    let mut matches: Vec<Match> = books
        .into_iter()
        .take(request.max_results)
        .map(normalize::to_match)
        .collect();

    if request.download_text {
        attach_texts(catalog, &mut matches, request.max_chars).await;
    }

    QueryResult {
        query: title.to_string(),
        matches,
        error: None,
    }
}

async fn attach_texts(catalog: &impl Catalog, matches: &mut [Match], max_chars: Option<usize>) {
    let urls: Vec<Option<String>> = matches.iter().map(|m| m.text_url.clone()).collect();
    let outcomes: Vec<Result<String, String>> = stream::iter(urls)
        .map(|url| async move { fetch_excerpt(catalog, url.as_deref(), max_chars).await })
        .buffered(MAX_CONCURRENT_TEXTS)
        .collect()
        .await;

    for (m, outcome) in matches.iter_mut().zip(outcomes) {
        match outcome {
            Ok(text) => m.text = Some(text),
            Err(e) => {
                warn!(id = m.id, error = %e, "text unavailable");
                m.text_error = Some(e);
            }
        }
    }
}

async fn fetch_excerpt(
    catalog: &impl Catalog,
    url: Option<&str>,
    max_chars: Option<usize>,
) -> Result<String, String> {
    let url = url.ok_or_else(|| "no plain-text or HTML format available".to_string())?;
    let budget = max_chars.map(|n| n.saturating_mul(MAX_BYTES_PER_CHAR));
    let text = catalog
        .fetch_text(url, budget)
        .await
        .map_err(|e| format!("text download failed: {e}"))?;

    Ok(match max_chars {
        Some(n) => truncate_chars(text, n),
        None => text,
    })
}

/// Keep the first `max_chars` characters (not bytes).
pub(crate) fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((end, _)) = text.char_indices().nth(max_chars) {
        text.truncate(end);
    }
    text
}
