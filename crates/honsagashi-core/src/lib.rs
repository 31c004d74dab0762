//! HonSagashi: Japanese book metadata and covers from NDL Search.

pub mod error;
pub mod http;
pub mod config;
pub mod identifiers;
pub mod types;
pub mod normalize;
pub mod ndl;
pub mod host;
pub mod source;

pub use error::{NdlError, RecordError, Result};
pub use config::PluginConfig;
pub use host::{AbortSignal, ResultSink};
pub use source::{IdentifyQuery, MetadataSource, NdlSource, Strategy};
pub use types::{BookRecord, Cover, NormalizedMetadata};
