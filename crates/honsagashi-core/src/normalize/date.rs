use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::normalize::text::to_halfwidth_digits;

static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.+\)|（.+）").expect("valid regex"));
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{4})\.([0-9]{1,2})$").expect("valid regex"));
static YEAR_MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})\.([0-9]{1,2})\.([0-9]{1,2})$").expect("valid regex")
});
static YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{4})$").expect("valid regex"));

/// A publication date with the precision the catalogue actually recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl PubDate {
    fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Option<Self> {
        if year < 1 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;
        Some(Self { year, month, day })
    }

    /// Missing month or day default to 1, as the host's date type needs all three.
    pub fn to_naive_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for PubDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
            if let Some(day) = self.day {
                write!(f, "-{day:02}")?;
            }
        }
        Ok(())
    }
}

/// Canonicalizes NDL date text before matching: `２０１０．５（第２刷）` → `2010.5`.
pub fn clean_date_text(raw: &str) -> String {
    let text = to_halfwidth_digits(raw).replace('．', ".");
    let text = PARENTHETICAL.replace_all(&text, "");
    let mut text = text.trim().to_string();
    if text.chars().last().is_some_and(|c| !c.is_ascii_digit()) {
        text.pop();
    }
    text
}

fn match_formats(text: &str) -> Option<PubDate> {
    let num = |caps: &regex::Captures<'_>, i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    if let Some(caps) = YEAR_MONTH.captures(text) {
        return PubDate::new(num(&caps, 1)? as i32, Some(num(&caps, 2)?), None);
    }
    if let Some(caps) = YEAR_MONTH_DAY.captures(text) {
        return PubDate::new(
            num(&caps, 1)? as i32,
            Some(num(&caps, 2)?),
            Some(num(&caps, 3)?),
        );
    }
    if let Some(caps) = YEAR_ONLY.captures(text) {
        return PubDate::new(num(&caps, 1)? as i32, None, None);
    }
    None
}

/// Parses `YYYY.M`, `YYYY.M.D` or `YYYY`. Anything else is logged and left unset.
pub fn parse_pubdate(raw: &str) -> Option<PubDate> {
    let cleaned = clean_date_text(raw);
    let parsed = match_formats(&cleaned);
    if parsed.is_none() {
        error!(raw, pubdate = %cleaned, "failed to parse publication date");
    }
    parsed
}
