use std::io::{self, Write as _};

use clap::Args;
use tracing::info;

use crate::gutendex::GutendexClient;
use crate::lookup::{self, DEFAULT_MAX_CHARS, DEFAULT_MAX_RESULTS, LookupRequest, ResultSet};

const PREVIEW_CHARS: usize = 400;
const RULE_WIDTH: usize = 80;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Book titles to search for. Prompts on stdin when omitted.
    pub titles: Vec<String>,

    /// Maximum number of matches per title
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS, allow_negative_numbers = true)]
    pub max_results: i64,

    /// Download book texts as well (slower)
    #[arg(long)]
    pub download_text: bool,

    /// Maximum characters kept per downloaded text
    #[arg(long, default_value_t = DEFAULT_MAX_CHARS, allow_negative_numbers = true)]
    pub max_chars: i64,

    /// Keep downloaded texts whole instead of truncating to --max-chars
    #[arg(long, conflicts_with = "max_chars")]
    pub full_text: bool,

    /// Print the raw JSON result set
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let titles = if args.titles.is_empty() {
        prompt_for_titles()?
    } else {
        args.titles
    };

    if titles.is_empty() {
        println!("No titles provided. Exiting.");
        return Ok(());
    }

    let max_chars = (!args.full_text).then_some(args.max_chars);
    let request = LookupRequest::new(titles, args.max_results, args.download_text, max_chars)?;

    info!(titles = request.titles().len(), "cli:search");
    if !args.json {
        println!(
            "Searching Gutendex for {} title(s)...\n",
            request.titles().len()
        );
    }

    let catalog = GutendexClient::from_env(crate::build_http_client()?);
    let results = lookup::lookup(&catalog, &request).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", render(&results, request.download_text()));
    }
    Ok(())
}

fn prompt_for_titles() -> io::Result<Vec<String>> {
    print!("Enter book titles (comma- or semicolon-separated): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(split_titles(&line))
}

/// Split a comma- or semicolon-separated list, dropping empty entries.
fn split_titles(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn render(results: &ResultSet, show_text: bool) -> String {
    let mut out = String::new();
    for entry in &results.results {
        out.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH)));
        out.push_str(&format!("Query: {}\n", entry.query));
        if let Some(error) = &entry.error {
            out.push_str(&format!("  Error: {error}\n"));
        }
        if entry.matches.is_empty() {
            out.push_str(
                "  No matches found. Try a shorter or partial title, or search by author name.\n",
            );
            continue;
        }

        for (idx, m) in entry.matches.iter().enumerate() {
            let authors = join_or_unknown(m.authors.iter().map(|a| a.name.as_str()));
            let languages = join_or_unknown(m.languages.iter().map(String::as_str));

            out.push_str(&format!("\n  Match {}:\n", idx + 1));
            out.push_str(&format!("    Title: {}\n", m.title));
            out.push_str(&format!("    Author(s): {authors}\n"));
            out.push_str(&format!("    Gutenberg ID: {}\n", m.id));
            out.push_str(&format!("    Languages: {languages}\n"));
            out.push_str(&format!("    Download count: {}\n", m.download_count));
            out.push_str(&format!("    Gutenberg URL: {}\n", m.gutenberg_url));

            if show_text {
                match (&m.text, &m.text_error) {
                    (_, Some(error)) => out.push_str(&format!("    Text error: {error}\n")),
                    (Some(text), None) => {
                        let preview: String = text
                            .chars()
                            .take(PREVIEW_CHARS)
                            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                            .collect();
                        out.push_str(&format!(
                            "    Text preview ({} chars): {preview}...\n",
                            text.chars().count()
                        ));
                    }
                    (None, None) => out.push_str("    No text available.\n"),
                }
            }
        }
    }
    out
}

fn join_or_unknown<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let joined = names
        .map(|n| if n.is_empty() { "Unknown" } else { n })
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "Unknown".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{Author, Match, QueryResult};

    fn sample_match() -> Match {
        Match {
            id: 84,
            title: "Frankenstein; Or, The Modern Prometheus".into(),
            authors: vec![Author {
                name: "Shelley, Mary Wollstonecraft".into(),
                birth_year: Some(1797),
                death_year: Some(1851),
            }],
            languages: vec!["en".into()],
            download_count: 80000,
            subjects: vec![],
            bookshelves: vec![],
            copyright: Some(false),
            gutenberg_url: "https://www.gutenberg.org/ebooks/84".into(),
            text_url: Some("https://www.gutenberg.org/ebooks/84.txt.utf-8".into()),
            text: None,
            text_error: None,
        }
    }

    #[test]
    fn splits_on_commas_and_semicolons() {
        assert_eq!(
            split_titles(" Dracula, Emma ;; Moby Dick ;\n"),
            ["Dracula", "Emma", "Moby Dick"]
        );
        assert!(split_titles("  \n").is_empty());
    }

    #[test]
    fn render_shows_match_details() {
        let results = ResultSet {
            results: vec![QueryResult {
                query: "Frankenstein".into(),
                matches: vec![sample_match()],
                error: None,
            }],
        };
        let out = render(&results, false);
        assert!(out.contains("Query: Frankenstein"));
        assert!(out.contains("Match 1:"));
        assert!(out.contains("Author(s): Shelley, Mary Wollstonecraft"));
        assert!(out.contains("Gutenberg ID: 84"));
        assert!(out.contains("Gutenberg URL: https://www.gutenberg.org/ebooks/84"));
        assert!(!out.contains("Text"));
    }

    #[test]
    fn render_reports_error_and_no_matches() {
        let results = ResultSet {
            results: vec![QueryResult {
                query: "Dracula".into(),
                matches: vec![],
                error: Some("Gutendex search failed: HTTP error: status 500".into()),
            }],
        };
        let out = render(&results, false);
        assert!(out.contains("Error: Gutendex search failed"));
        assert!(out.contains("No matches found."));
    }

    #[test]
    fn render_text_preview_is_single_line_and_bounded() {
        let mut m = sample_match();
        m.text = Some(format!("Letter 1\n{}", "x".repeat(1000)));
        m.authors.clear();
        let results = ResultSet {
            results: vec![QueryResult {
                query: "Frankenstein".into(),
                matches: vec![m],
                error: None,
            }],
        };
        let out = render(&results, true);
        let line = out
            .lines()
            .find(|l| l.contains("Text preview"))
            .unwrap();
        assert!(line.contains("(1009 chars): Letter 1 x"));
        assert!(line.ends_with("..."));
        assert!(out.contains("Author(s): Unknown"));
    }

    #[test]
    fn render_text_error_wins() {
        let mut m = sample_match();
        m.text_error = Some("text download failed: HTTP error: status 404".into());
        let results = ResultSet {
            results: vec![QueryResult {
                query: "Frankenstein".into(),
                matches: vec![m],
                error: None,
            }],
        };
        let out = render(&results, true);
        assert!(out.contains("Text error: text download failed"));
    }

    #[test]
    fn render_lays_out_one_field_per_line() {
        let mut m = sample_match();
        m.languages.clear();
        let results = ResultSet {
            results: vec![QueryResult {
                query: "Frankenstein".into(),
                matches: vec![m],
                error: None,
            }],
        };
        let out = render(&results, true);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "=".repeat(RULE_WIDTH));
        assert_eq!(lines[1], "Query: Frankenstein");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "  Match 1:");
        assert_eq!(lines[6], "    Gutenberg ID: 84");
        assert_eq!(lines[7], "    Languages: Unknown");
        assert_eq!(lines.last(), Some(&"    No text available."));
        assert!(out.ends_with('\n'));
    }
}
