//! NDLBibID shortcut: a title such as `近世後期の海防と社会変容[033336476]` carries the
//! record ID, which lets users import by renaming the file.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([0-9]+)\]").expect("valid regex"));

/// First `[digits]` group in the title.
pub fn extract_from_title(title: &str) -> Option<String> {
    BRACKETED_ID
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Title with every `[digits]` group removed.
pub fn strip_from_title(title: &str) -> String {
    BRACKETED_ID.replace_all(title, "").trim().to_string()
}
