use std::collections::BTreeMap;

const PREFERRED_PLAIN: &[&str] = &[
    "text/plain; charset=utf-8",
    "text/plain; charset=us-ascii",
    "text/plain",
];
const PREFERRED_HTML: &[&str] = &["text/html; charset=utf-8", "text/html"];

/// Choose the URL to download a work's text from.
///
/// Plain text beats HTML, HTML beats any other `text/*` type. Within a tier the
/// well-known charset keys come first, then remaining keys alphabetically.
/// Zipped variants are never returned.
pub fn pick_text_url(formats: &BTreeMap<String, String>) -> Option<String> {
    tier(formats, PREFERRED_PLAIN, "text/plain")
        .or_else(|| tier(formats, PREFERRED_HTML, "text/html"))
        .or_else(|| tier(formats, &[], "text/"))
        .map(str::to_string)
}

fn tier<'a>(
    formats: &'a BTreeMap<String, String>,
    preferred: &[&str],
    prefix: &str,
) -> Option<&'a str> {
    preferred
        .iter()
        .filter_map(|key| formats.get(*key))
        .chain(
            formats
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(_, url)| url),
        )
        .map(String::as_str)
        .find(|url| !is_zipped(url))
}

fn is_zipped(url: &str) -> bool {
    url.to_ascii_lowercase().ends_with(".zip")
}
