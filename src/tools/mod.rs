mod errors;
mod params;

pub use params::SearchGutenbergParams;

use reqwest::Client;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use tracing::info;

use errors::{encode_to_mcp_error, lookup_to_mcp_error};

use crate::gutendex::GutendexClient;
use crate::lookup;

/// MCP server handler exposing the Project Gutenberg title lookup.
///
/// Configuration via environment variables:
/// - `GUTENDEX_BASE_URL`: alternative Gutendex deployment (optional)
#[derive(Clone)]
pub struct Guttenread {
    catalog: GutendexClient,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl Guttenread {
    pub fn new(http: Client) -> Self {
        Self {
            catalog: GutendexClient::from_env(http),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "search_gutenberg",
        description = "Search Project Gutenberg (via the Gutendex API) for a list of book titles. Returns, per title, up to max_results_per_title matches with id, title, authors, languages, download count, subjects, bookshelves, copyright status, Gutenberg URL and text URL. With download_text, each match also carries the book text (truncated to max_chars characters) or a text_error. A failed search for one title is reported in that title's error field and does not affect the others."
    )]
    async fn search_gutenberg(
        &self,
        Parameters(params): Parameters<SearchGutenbergParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.into_request().map_err(lookup_to_mcp_error)?;

        info!(titles = request.titles().len(), "tool:search_gutenberg");

        let results = lookup::lookup(&self.catalog, &request).await;

        let failed = results.results.iter().filter(|r| r.error.is_some()).count();
        info!(
            queries = results.results.len(),
            failed, "search_gutenberg complete"
        );

        let output = serde_json::to_string_pretty(&results).map_err(encode_to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }
}

#[tool_handler]
impl ServerHandler for Guttenread {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "guttenread-gutendex".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "guttenread looks up books on Project Gutenberg by title (search_gutenberg) and can return their full text or an excerpt."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
