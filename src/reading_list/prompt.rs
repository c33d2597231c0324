use crate::gemini::types::{FunctionDeclaration, Tool};

pub(super) const TOOL_NAME: &str = "search_gutenberg";

pub(super) const SYSTEM_INSTRUCTION: &str = "\
You are an assistant that helps organize reading lists and look up books on Project Gutenberg via a `search_gutenberg` tool.

1. Carefully read the user's reading list text, which may contain messy bullet points, comments, and partial titles.
2. Normalize it into a set of likely book titles (and authors if present).
3. Decide which entries are actual books and which are comments or notes; ignore non-book entries.
4. Call the `search_gutenberg` tool with a clean, deduplicated list of titles.
5. When interpreting tool results, be STRICT:
   - Only treat a book as 'found on Project Gutenberg' if the title is the same or very similar, and the author and subject matter clearly match.
   - If results only match on a generic word or look unrelated, say that the book is NOT available on Project Gutenberg instead of listing those loose matches.
   - For obviously modern works (roughly 20th/21st century) that have no strong matches, explicitly say they are likely not in the public domain and therefore not on Project Gutenberg.
   - Do NOT invent matches or URLs.
6. Present a nicely formatted summary of the reading list. For each original requested book, either:
   - Show the best-matching Gutenberg entry (title, author(s), language(s), Gutenberg URL), or
   - Clearly state that it does not appear to be available on Project Gutenberg.
7. If book texts were downloaded, you may provide very brief summaries, but keep them concise.";

pub(super) fn user_message(reading_list: &str) -> String {
    format!(
        "Here is my reading list. Normalize the titles, then use the `search_gutenberg` tool \
         to look them up on Project Gutenberg. Finally, give me a clean, structured summary.\n\n\
         READING LIST:\n{reading_list}"
    )
}

/// Function declaration in Gemini's OpenAPI schema dialect. Property names
/// mirror `SearchGutenbergParams`.
pub(super) fn search_tool() -> Tool {
    Tool {
        function_declarations: vec![FunctionDeclaration {
            name: TOOL_NAME.to_string(),
            description: "Search Project Gutenberg (via the Gutendex API) for books matching \
                          the given titles, returning structured metadata and optionally text excerpts."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "titles": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "A list of normalized book titles to search for. Deduplicate titles and remove obviously invalid entries."
                    },
                    "max_results_per_title": {
                        "type": "integer",
                        "description": "Maximum number of matches per title (default 3)."
                    },
                    "download_text": {
                        "type": "boolean",
                        "description": "If true, download text excerpts for the matches. Use this only if you actually need to read or summarize the text."
                    },
                    "max_chars": {
                        "type": "integer",
                        "nullable": true,
                        "description": "Truncate downloaded texts to at most this many characters. Use a smaller number (e.g. 5000) for summaries."
                    }
                },
                "required": ["titles"]
            }),
        }],
    }
}
