use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identifiers::IdentifierKind;
use crate::normalize::{PubDate, clean_author_names, parse_pubdate};

/// Language tag every NDL Search result is published with.
pub const LANGUAGE: &str = "ja";

/// Identifiers of one source record; an empty string means the record carried none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIdentifiers {
    pub isbn: String,
    pub jpno: String,
    pub ndlbibid: String,
}

impl RecordIdentifiers {
    pub fn get(&self, kind: IdentifierKind) -> &str {
        match kind {
            IdentifierKind::Isbn => &self.isbn,
            IdentifierKind::Jpno => &self.jpno,
            IdentifierKind::NdlBibId => &self.ndlbibid,
        }
    }

    pub fn set(&mut self, kind: IdentifierKind, value: String) {
        match kind {
            IdentifierKind::Isbn => self.isbn = value,
            IdentifierKind::Jpno => self.jpno = value,
            IdentifierKind::NdlBibId => self.ndlbibid = value,
        }
    }
}

/// A bibliographic record as parsed from NDL Search, before normalization.
///
/// Parsers only build one after every required field was found, so holding a
/// `BookRecord` means title, authors and publisher are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: String,
    /// Raw date text in the catalogue's own notation (`2017.2`, `２０１０．５` ...).
    pub pubdate: Option<String>,
    /// Already HTML: one `<p>` per description element.
    pub description: String,
    pub tags: Vec<String>,
    pub identifiers: RecordIdentifiers,
}

/// The metadata object handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: String,
    pub pubdate: Option<PubDate>,
    pub comments: String,
    pub tags: Vec<String>,
    pub identifiers: BTreeMap<String, String>,
    pub isbn: String,
    pub language: String,
}

impl NormalizedMetadata {
    pub fn from_record(record: BookRecord) -> Self {
        let pubdate = record.pubdate.as_deref().and_then(parse_pubdate);

        let identifiers = IdentifierKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let value = record.identifiers.get(kind);
                (!value.is_empty()).then(|| (kind.as_str().to_string(), value.to_string()))
            })
            .collect();

        Self {
            title: record.title,
            authors: record.authors,
            publisher: record.publisher,
            pubdate,
            comments: record.description,
            tags: record.tags,
            identifiers,
            isbn: record.identifiers.isbn,
            language: LANGUAGE.to_string(),
        }
    }

    pub fn clean_authors(&mut self) {
        self.authors = clean_author_names(&self.authors);
    }
}

/// Raw cover bytes and the name of the source that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub source: String,
    pub data: Vec<u8>,
}
