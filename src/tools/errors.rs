use rmcp::ErrorData as McpError;

use crate::lookup::LookupError;

/// Every lookup error is a caller mistake caught before any network call.
pub(super) fn lookup_to_mcp_error(e: LookupError) -> McpError {
    McpError::invalid_params(e.to_string(), None)
}

pub(super) fn encode_to_mcp_error(e: serde_json::Error) -> McpError {
    McpError::internal_error(format!("failed to encode results: {e}"), None)
}
