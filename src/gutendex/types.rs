use std::collections::BTreeMap;

use serde::Deserialize;

/// Response envelope of `GET /books/`.
#[derive(Debug, Deserialize)]
pub struct BookList {
    #[serde(default)]
    pub count: u64,
    pub results: Vec<Book>,
}

/// One catalogue record as Gutendex returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct Book {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Person>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub bookshelves: Vec<String>,
    pub copyright: Option<bool>,
    /// MIME type -> URL. Ordered so fallback selection is deterministic.
    #[serde(default)]
    pub formats: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub name: String,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
}
