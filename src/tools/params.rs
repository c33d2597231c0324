use schemars::JsonSchema;
use serde::Deserialize;

use crate::lookup::{DEFAULT_MAX_CHARS, DEFAULT_MAX_RESULTS, LookupError, LookupRequest};

/// Arguments of the `search_gutenberg` tool, shared by the MCP server and the
/// reading-list assistant's function declaration.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchGutenbergParams {
    /// Book titles or partial titles to search for
    pub titles: Vec<String>,
    /// Maximum number of matches per title (default: 3)
    #[serde(default = "default_max_results")]
    pub max_results_per_title: i64,
    /// Download the text of every match. Slow and produces large responses (default: false)
    #[serde(default)]
    pub download_text: bool,
    /// Truncate downloaded texts to this many characters (default: 20000).
    /// Pass null for full texts.
    #[serde(default = "default_max_chars")]
    pub max_chars: Option<i64>,
}

impl SearchGutenbergParams {
    pub fn into_request(self) -> Result<LookupRequest, LookupError> {
        LookupRequest::new(
            self.titles,
            self.max_results_per_title,
            self.download_text,
            self.max_chars,
        )
    }
}

fn default_max_results() -> i64 {
    DEFAULT_MAX_RESULTS
}

fn default_max_chars() -> Option<i64> {
    Some(DEFAULT_MAX_CHARS)
}
