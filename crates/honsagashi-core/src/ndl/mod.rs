//! NDL Search (国立国会図書館サーチ) endpoints and the parsers for what they return.

pub mod client;
pub mod export;
pub mod opensearch;
pub mod search_page;

pub use client::NdlClient;

use reqwest::Url;

use crate::config::DEFAULT_BASE_URL;
use crate::error::{NdlError, RecordError, Result};
use crate::types::BookRecord;

/// Outcome of parsing one record out of a response.
pub type ParsedRecord = std::result::Result<BookRecord, RecordError>;

/// URL templates of the four endpoint families, rooted at one base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Parameters of an OpenSearch query; `cnt` is always sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenSearchQuery {
    pub max_results: u32,
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/api/opensearch?cnt=..&isbn=..&title=..&creator=..`, values percent-encoded.
    pub fn opensearch(&self, query: &OpenSearchQuery) -> Result<String> {
        let mut url = format!("{}/api/opensearch?cnt={}", self.base_url, query.max_results);
        let params = [
            ("isbn", &query.isbn),
            ("title", &query.title),
            ("creator", &query.creator),
        ];
        for (key, value) in params {
            if let Some(value) = value {
                url.push_str(&format!("&{key}={}", urlencoding::encode(value)));
            }
        }
        checked(url)
    }

    pub fn search_by_ndlbibid(&self, ndlbibid: &str) -> Result<String> {
        checked(format!(
            "{}/search?cs=bib&f-bibid={}",
            self.base_url,
            urlencoding::encode(ndlbibid)
        ))
    }

    pub fn export_json(&self, token: &str) -> Result<String> {
        checked(format!(
            "{}/api/bib/download/json?cs=bib&f-token={}",
            self.base_url,
            urlencoding::encode(token)
        ))
    }

    /// Thumbnail for an ISBN; hyphens must already be stripped.
    pub fn thumbnail(&self, isbn: &str) -> Result<String> {
        checked(format!(
            "{}/thumbnail/{}.jpg",
            self.base_url,
            urlencoding::encode(isbn)
        ))
    }
}

fn checked(url: String) -> Result<String> {
    Url::parse(&url).map_err(|e| NdlError::InvalidUrl(format!("{url}: {e}")))?;
    Ok(url)
}
