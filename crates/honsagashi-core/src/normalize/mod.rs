//! Text clean-up applied between parsing and the host-facing metadata.

pub mod date;
pub mod text;

pub use date::{PubDate, parse_pubdate};
pub use text::{clean_author_name, clean_author_names, collect_tags, split_tag_hierarchy};
