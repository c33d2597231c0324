//! Reading-list assistant: a chat model cleans up a free-form list of books and
//! calls `search_gutenberg` as a function tool until it can write a summary.

mod prompt;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Args;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::gemini::client::{ChatModel, GeminiClient, GeminiError};
use crate::gemini::types::{Content, FunctionCall, GenerateContentRequest, Part};
use crate::gutendex::{Catalog, GutendexClient};
use crate::lookup;
use crate::tools::SearchGutenbergParams;

/// Model turns allowed before giving up on a final answer.
const MAX_TURNS: usize = 8;
const DEFAULT_EXCERPT_CHARS: i64 = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ReadingListError {
    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error("failed to read reading list: {0}")]
    Io(#[from] io::Error),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reading list is empty")]
    EmptyInput,

    #[error("model did not produce a final answer within {0} turns")]
    TooManyTurns(usize),
}

#[derive(Args, Debug)]
pub struct ReadingListArgs {
    /// Text file containing the reading list. Reads stdin when omitted.
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Gemini model name (default: $GEMINI_MODEL or gemini-2.5-flash)
    #[arg(long)]
    pub model: Option<String>,

    /// Let the model download text excerpts of matched books
    #[arg(long)]
    pub download_text: bool,

    /// Max characters per book text when --download-text is used
    #[arg(long, default_value_t = DEFAULT_EXCERPT_CHARS, allow_negative_numbers = true)]
    pub max_chars: i64,
}

/// Values the model's tool arguments are layered over.
#[derive(Debug, Clone, Copy)]
pub struct ToolDefaults {
    pub download_text: bool,
    pub max_chars: i64,
}

pub async fn run(args: ReadingListArgs) -> Result<(), ReadingListError> {
    let http = crate::build_http_client()?;
    let gemini = GeminiClient::from_env(http.clone(), args.model.as_deref())?;
    let catalog = GutendexClient::from_env(http);

    let reading_list = read_input(args.input_file.as_ref())?;
    let defaults = ToolDefaults {
        download_text: args.download_text,
        max_chars: args.max_chars,
    };

    let answer = assist(&gemini, &catalog, &reading_list, defaults).await?;
    println!("\n=== MODEL OUTPUT ===\n");
    println!("{answer}");
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String, ReadingListError> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                eprintln!(
                    "Paste your reading list (Ctrl-D to end on Unix / Ctrl-Z then Enter on Windows):"
                );
            }
            let mut buf = String::new();
            stdin.lock().read_to_string(&mut buf)?;
            buf
        }
    };
    if text.trim().is_empty() {
        return Err(ReadingListError::EmptyInput);
    }
    Ok(text)
}

/// Drive the tool-calling conversation and return the model's final text.
pub async fn assist(
    model: &impl ChatModel,
    catalog: &impl Catalog,
    reading_list: &str,
    defaults: ToolDefaults,
) -> Result<String, ReadingListError> {
    if reading_list.trim().is_empty() {
        return Err(ReadingListError::EmptyInput);
    }

    let mut request = GenerateContentRequest {
        system_instruction: Some(Content::instruction(prompt::SYSTEM_INSTRUCTION)),
        contents: vec![Content::user(vec![Part::text(&prompt::user_message(
            reading_list,
        ))])],
        tools: vec![prompt::search_tool()],
    };

    for turn in 1..=MAX_TURNS {
        let reply = model.generate(&request).await?;
        let calls: Vec<FunctionCall> = reply.function_calls().cloned().collect();

        if calls.is_empty() {
            info!(turn, "reading list summary ready");
            return Ok(reply.text());
        }

        debug!(turn, calls = calls.len(), "model requested tool calls");
        request.contents.push(reply);

        let mut responses = Vec::with_capacity(calls.len());
        for call in &calls {
            let response = dispatch(catalog, call, defaults).await;
            responses.push(Part::function_response(&call.name, response));
        }
        request.contents.push(Content::user(responses));
    }

    Err(ReadingListError::TooManyTurns(MAX_TURNS))
}

async fn dispatch(catalog: &impl Catalog, call: &FunctionCall, defaults: ToolDefaults) -> Value {
    if call.name != prompt::TOOL_NAME {
        warn!(tool = %call.name, "model called unknown tool");
        return json!({ "error": format!("Unknown tool {}", call.name) });
    }

    let params = match merge_args(defaults, &call.args) {
        Ok(params) => params,
        Err(e) => return json!({ "error": format!("invalid arguments: {e}") }),
    };
    let request = match params.into_request() {
        Ok(request) => request,
        Err(e) => return json!({ "error": e.to_string() }),
    };

    let results = lookup::lookup(catalog, &request).await;
    serde_json::to_value(&results).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

/// The model's arguments win over `defaults`.
fn merge_args(
    defaults: ToolDefaults,
    args: &Value,
) -> Result<SearchGutenbergParams, serde_json::Error> {
    let mut merged = serde_json::Map::new();
    merged.insert("download_text".into(), json!(defaults.download_text));
    merged.insert("max_chars".into(), json!(defaults.max_chars));
    if let Value::Object(args) = args {
        merged.extend(args.clone());
    }
    serde_json::from_value(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gutendex::GutendexError;
    use crate::gutendex::types::Book;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    struct MockModel {
        replies: Mutex<VecDeque<Content>>,
        requests: Mutex<Vec<GenerateContentRequest>>,
    }

    impl MockModel {
        fn new(replies: Vec<Content>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatModel for MockModel {
        async fn generate(&self, request: &GenerateContentRequest) -> Result<Content, GeminiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(GeminiError::RateLimited)
        }
    }

    #[derive(Default)]
    struct MockCatalog {
        searched: Mutex<Vec<String>>,
    }

    impl Catalog for MockCatalog {
        async fn search(&self, title: &str) -> Result<Vec<Book>, GutendexError> {
            self.searched.lock().unwrap().push(title.to_string());
            Ok(vec![Book {
                id: 345,
                title: title.to_string(),
                authors: vec![],
                languages: vec!["en".into()],
                download_count: 1,
                subjects: vec![],
                bookshelves: vec![],
                copyright: Some(false),
                formats: BTreeMap::new(),
            }])
        }

        async fn fetch_text(
            &self,
            _url: &str,
            _budget: Option<usize>,
        ) -> Result<String, GutendexError> {
            Err(GutendexError::Status(404))
        }
    }

    fn model_call(name: &str, args: Value) -> Content {
        Content {
            role: Some("model".into()),
            parts: vec![Part {
                function_call: Some(FunctionCall {
                    name: name.into(),
                    args,
                }),
                thought_signature: Some("sig".into()),
                ..Default::default()
            }],
        }
    }

    fn model_text(text: &str) -> Content {
        Content {
            role: Some("model".into()),
            parts: vec![Part::text(text)],
        }
    }

    const DEFAULTS: ToolDefaults = ToolDefaults {
        download_text: false,
        max_chars: 5000,
    };

    #[tokio::test]
    async fn tool_call_results_are_fed_back_before_final_answer() {
        let model = MockModel::new(vec![
            model_call("search_gutenberg", json!({"titles": ["Dracula", "Emma"]})),
            model_text("Dracula is on Project Gutenberg."),
        ]);
        let catalog = MockCatalog::default();

        let answer = assist(&model, &catalog, "* dracula\n* emma (austen)", DEFAULTS)
            .await
            .unwrap();

        assert_eq!(answer, "Dracula is on Project Gutenberg.");
        let mut searched = catalog.searched.lock().unwrap().clone();
        searched.sort();
        assert_eq!(searched, ["Dracula", "Emma"]);

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let second = &requests[1].contents;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].parts[0].thought_signature.as_deref(), Some("sig"));
        let response = second[2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.name, "search_gutenberg");
        assert_eq!(response.response["results"][1]["query"], "Emma");
    }

    #[tokio::test]
    async fn unknown_tool_gets_error_response() {
        let model = MockModel::new(vec![
            model_call("delete_everything", json!({})),
            model_text("Sorry."),
        ]);
        let catalog = MockCatalog::default();

        assist(&model, &catalog, "Emma", DEFAULTS).await.unwrap();

        let requests = model.requests.lock().unwrap();
        let response = requests[1].contents[2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.response["error"], "Unknown tool delete_everything");
        assert!(catalog.searched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_request_is_reported_to_model() {
        let model = MockModel::new(vec![
            model_call(
                "search_gutenberg",
                json!({"titles": ["Emma"], "max_results_per_title": -3}),
            ),
            model_text("done"),
        ]);
        let catalog = MockCatalog::default();

        assist(&model, &catalog, "Emma", DEFAULTS).await.unwrap();

        let requests = model.requests.lock().unwrap();
        let response = requests[1].contents[2].parts[0].function_response.as_ref().unwrap();
        assert!(response.response["error"].as_str().unwrap().contains("max_results_per_title"));
        assert!(catalog.searched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn endless_tool_calls_hit_turn_limit() {
        let replies = (0..MAX_TURNS)
            .map(|_| model_call("search_gutenberg", json!({"titles": ["Emma"]})))
            .collect();
        let model = MockModel::new(replies);
        let catalog = MockCatalog::default();

        let err = assist(&model, &catalog, "Emma", DEFAULTS).await.unwrap_err();
        assert!(matches!(err, ReadingListError::TooManyTurns(MAX_TURNS)));
    }

    #[tokio::test]
    async fn blank_list_is_rejected_without_model_call() {
        let model = MockModel::new(vec![]);
        let err = assist(&model, &MockCatalog::default(), " \n", DEFAULTS)
            .await
            .unwrap_err();
        assert!(matches!(err, ReadingListError::EmptyInput));
        assert!(model.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn model_args_override_defaults() {
        let defaults = ToolDefaults {
            download_text: true,
            max_chars: 5000,
        };
        let params = merge_args(defaults, &json!({"titles": ["Emma"], "max_chars": 100})).unwrap();
        assert!(params.download_text);
        assert_eq!(params.max_chars, Some(100));

        let params = merge_args(defaults, &json!({"titles": ["Emma"], "download_text": false}))
            .unwrap();
        assert!(!params.download_text);
        assert_eq!(params.max_chars, Some(5000));
    }

    #[test]
    fn null_args_fail_for_missing_titles() {
        assert!(merge_args(DEFAULTS, &Value::Null).is_err());
    }
}
