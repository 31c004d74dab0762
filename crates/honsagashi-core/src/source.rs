//! The host-facing metadata source: strategy dispatch for `identify` and the
//! cover download.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::PluginConfig;
use crate::error::Result;
use crate::host::{AbortSignal, ResultSink};
use crate::identifiers::IdentifierKind;
use crate::identifiers::ndlbibid;
use crate::ndl::{NdlClient, ParsedRecord};
use crate::types::{BookRecord, Cover, NormalizedMetadata};

pub const NAME: &str = "HonSagashi";
pub const AUTHOR: &str = "kwadraten";
pub const DESCRIPTION: &str = "Metadata and covers for Japanese books from NDL Search.";
pub const VERSION: (u32, u32, u32) = (1, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Identify,
    Cover,
}

pub const CAPABILITIES: [Capability; 2] = [Capability::Identify, Capability::Cover];

/// Metadata fields a successful `identify` may fill in.
pub const TOUCHED_FIELDS: [&str; 9] = [
    "pubdate",
    "title",
    "comments",
    "publisher",
    "authors",
    "language",
    "identifier:isbn",
    "identifier:jpno",
    "identifier:ndlbibid",
];

/// Whatever the host already knows about the book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifyQuery {
    pub title: Option<String>,
    pub authors: Vec<String>,
    /// Keyed like the output map: `isbn`, `jpno`, `ndlbibid`.
    pub identifiers: BTreeMap<String, String>,
}

impl IdentifyQuery {
    /// A non-blank identifier of the given kind.
    pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
        self.identifiers
            .get(kind.as_str())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// One lookup against NDL Search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Isbn(String),
    NdlBibId(String),
    TitleAuthor { title: String, authors: Vec<String> },
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Isbn(isbn) => write!(f, "isbn:{isbn}"),
            Strategy::NdlBibId(id) => write!(f, "ndlbibid:{id}"),
            Strategy::TitleAuthor { title, authors } => {
                write!(f, "title:『{title}』 authors:{}", authors.join(";"))
            }
        }
    }
}

/// Builds the ordered lookup plan: ISBN, then NDLBibID, then title/author.
///
/// With `filename_shortcut` on, a `[digits]` group in the title stands in for a
/// missing NDLBibID and is removed from the title before the title search.
pub fn plan_strategies(query: &IdentifyQuery, prefs: &PluginConfig) -> Vec<Strategy> {
    let mut plan = Vec::with_capacity(3);

    if let Some(isbn) = query.identifier(IdentifierKind::Isbn) {
        plan.push(Strategy::Isbn(isbn.to_string()));
    }

    let title = query.title.as_deref().filter(|t| !t.trim().is_empty());

    let explicit_id = query.identifier(IdentifierKind::NdlBibId).map(ToOwned::to_owned);
    let ndlbibid = match (explicit_id, title) {
        (Some(id), _) => Some(id),
        (None, Some(title)) if prefs.filename_shortcut => ndlbibid::extract_from_title(title),
        _ => None,
    };
    if let Some(id) = ndlbibid {
        plan.push(Strategy::NdlBibId(id));
    }

    if let Some(title) = title {
        let title = if prefs.filename_shortcut {
            ndlbibid::strip_from_title(title)
        } else {
            title.trim().to_string()
        };
        if !title.is_empty() {
            plan.push(Strategy::TitleAuthor {
                title,
                authors: query.authors.clone(),
            });
        }
    }

    plan
}

/// The contract a host drives a metadata source through. Neither operation
/// reports failure; results go to the sink and problems go to the log.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &[Capability];

    fn touched_fields(&self) -> &[&'static str];

    async fn identify(
        &self,
        sink: &dyn ResultSink<NormalizedMetadata>,
        abort: &AbortSignal,
        timeout: Duration,
        query: &IdentifyQuery,
    );

    async fn download_cover(
        &self,
        sink: &dyn ResultSink<Cover>,
        abort: &AbortSignal,
        timeout: Duration,
        identifiers: &BTreeMap<String, String>,
    );
}

/// NDL Search as a metadata source.
#[derive(Clone)]
pub struct NdlSource {
    client: NdlClient,
    prefs: Arc<RwLock<PluginConfig>>,
}

impl NdlSource {
    pub fn new() -> Result<Self> {
        Self::with_config(PluginConfig::default())
    }

    /// `base_url` is read here once; later config updates only change the
    /// lookup options.
    pub fn with_config(prefs: PluginConfig) -> Result<Self> {
        prefs.validate()?;
        Ok(Self {
            client: NdlClient::with_base_url(&prefs.base_url)?,
            prefs: Arc::new(RwLock::new(prefs)),
        })
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::with_config(PluginConfig {
            base_url: base_url.to_string(),
            ..PluginConfig::default()
        })
    }

    pub async fn config(&self) -> PluginConfig {
        self.prefs.read().await.clone()
    }

    pub async fn update_config(&self, prefs: PluginConfig) -> Result<()> {
        prefs.validate()?;
        *self.prefs.write().await = prefs;
        Ok(())
    }

    async fn run_strategy(
        &self,
        strategy: &Strategy,
        prefs: &PluginConfig,
        timeout: Duration,
    ) -> Result<Vec<ParsedRecord>> {
        let max_results = prefs.effective_max_results();
        match strategy {
            Strategy::Isbn(isbn) => self.client.search_by_isbn(isbn, max_results, timeout).await,
            Strategy::NdlBibId(id) => Ok(vec![self.client.fetch_by_ndlbibid(id, timeout).await?]),
            Strategy::TitleAuthor { title, authors } => {
                self.client
                    .search_by_title(title, authors, max_results, timeout)
                    .await
            }
        }
    }
}

/// Keeps complete records and logs the rest.
fn collect_valid(strategy: &Strategy, parsed: Vec<ParsedRecord>) -> Vec<BookRecord> {
    parsed
        .into_iter()
        .filter_map(|record| match record {
            Ok(record) => Some(record),
            Err(e) => {
                error!(strategy = %strategy, error = %e, "dropping incomplete record");
                None
            }
        })
        .collect()
}

#[async_trait]
impl MetadataSource for NdlSource {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> &[Capability] {
        &CAPABILITIES
    }

    fn touched_fields(&self) -> &[&'static str] {
        &TOUCHED_FIELDS
    }

    async fn identify(
        &self,
        sink: &dyn ResultSink<NormalizedMetadata>,
        _abort: &AbortSignal,
        timeout: Duration,
        query: &IdentifyQuery,
    ) {
        let prefs = self.config().await;
        let plan = plan_strategies(query, &prefs);
        if plan.is_empty() {
            info!("no ISBN, NDLBibID or title to search with");
            return;
        }

        for strategy in &plan {
            info!(strategy = %strategy, "looking up");
            let parsed = match self.run_strategy(strategy, &prefs, timeout).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, "lookup failed, trying next strategy");
                    continue;
                }
            };

            let records = collect_valid(strategy, parsed);
            if records.is_empty() {
                debug!(strategy = %strategy, "no usable records");
                continue;
            }

            info!(strategy = %strategy, count = records.len(), "records found");
            for record in records {
                let mut metadata = NormalizedMetadata::from_record(record);
                if prefs.clean_authorname {
                    metadata.clean_authors();
                }
                sink.put(metadata);
            }
            return;
        }

        info!("no results from any strategy");
    }

    async fn download_cover(
        &self,
        sink: &dyn ResultSink<Cover>,
        _abort: &AbortSignal,
        timeout: Duration,
        identifiers: &BTreeMap<String, String>,
    ) {
        let Some(isbn) = identifiers.get(IdentifierKind::Isbn.as_str()) else {
            return;
        };

        match self.client.fetch_cover(isbn, timeout).await {
            Ok(data) => sink.put(Cover {
                source: NAME.to_string(),
                data,
            }),
            Err(e) if e.is_not_found() => warn!(isbn = %isbn, "no cover for ISBN"),
            Err(e) => error!(isbn = %isbn, error = %e, "cover download failed"),
        }
    }
}
