use crate::gutendex::pick_text_url;
use crate::gutendex::types::{Book, Person};

use super::{Author, Match};

const GUTENBERG_EBOOKS: &str = "https://www.gutenberg.org/ebooks";

impl From<Person> for Author {
    fn from(person: Person) -> Self {
        Self {
            name: person.name.trim().to_string(),
            birth_year: person.birth_year,
            death_year: person.death_year,
        }
    }
}

/// Map a raw catalogue record into the caller-facing shape. Text fields stay empty.
pub(super) fn to_match(book: Book) -> Match {
    let text_url = pick_text_url(&book.formats);
    Match {
        id: book.id,
        title: book.title.trim().to_string(),
        authors: book.authors.into_iter().map(Author::from).collect(),
        languages: clean_tags(book.languages),
        download_count: book.download_count,
        subjects: clean_tags(book.subjects),
        bookshelves: clean_tags(book.bookshelves),
        copyright: book.copyright,
        gutenberg_url: format!("{GUTENBERG_EBOOKS}/{}", book.id),
        text_url,
        text: None,
        text_error: None,
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
