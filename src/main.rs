mod cli;
mod gemini;
mod gutendex;
mod lookup;
mod reading_list;
mod tools;

pub const USER_AGENT: &str = concat!("guttenread/", env!("CARGO_PKG_VERSION"));

use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Client;
use rmcp::{ServiceExt, transport::stdio};
use tools::Guttenread;
use tracing::info;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default per-request timeout; individual calls may set their own.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

#[derive(Parser)]
#[command(name = "guttenread", version, about = "Look up Project Gutenberg books by title")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search Gutendex for one or more titles and print the matches
    Search(cli::SearchArgs),
    /// Run the MCP server on stdio, exposing the `search_gutenberg` tool
    Serve,
    /// Let Gemini clean up a reading list and look the books up
    ReadingList(reading_list::ReadingListArgs),
}

pub(crate) fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

fn init_tracing(default_directive: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Search(args) => {
            init_tracing("guttenread=warn")?;
            cli::run(args).await?;
        }
        Command::ReadingList(args) => {
            init_tracing("guttenread=warn")?;
            reading_list::run(args).await?;
        }
        Command::Serve => {
            init_tracing("guttenread=info")?;
            info!("starting guttenread MCP server");

            let service = Guttenread::new(build_http_client()?)
                .serve(stdio())
                .await
                .inspect_err(|e| tracing::error!("failed to start server: {e}"))?;

            service.waiting().await?;
            info!("server stopped");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_accepts_titles_and_flags() {
        let cli = Cli::try_parse_from([
            "guttenread",
            "search",
            "Dracula",
            "Emma",
            "--max-results",
            "1",
            "--download-text",
            "--full-text",
        ])
        .unwrap();
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.titles, ["Dracula", "Emma"]);
                assert_eq!(args.max_results, 1);
                assert!(args.download_text);
                assert!(args.full_text);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn full_text_conflicts_with_max_chars() {
        let result = Cli::try_parse_from([
            "guttenread",
            "search",
            "Emma",
            "--max-chars",
            "10",
            "--full-text",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn reading_list_defaults_to_short_excerpts() {
        let cli = Cli::try_parse_from(["guttenread", "reading-list"]).unwrap();
        match cli.command {
            Command::ReadingList(args) => {
                assert_eq!(args.max_chars, 5000);
                assert!(args.input_file.is_none());
            }
            _ => panic!("expected reading-list"),
        }
    }
}
