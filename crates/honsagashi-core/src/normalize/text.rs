use once_cell::sync::Lazy;
use regex::Regex;

/// Delimiter NDL subject headings use to encode a hierarchy, e.g. `日本 -- 歴史`.
pub const HIERARCHY_DELIMITER: &str = "--";

static AUTHOR_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\d,，]+").expect("valid regex"));

/// Replaces full-width digits `０`–`９` with their ASCII forms.
pub fn to_halfwidth_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Splits one subject heading on the hierarchy delimiter into flat tags.
pub fn split_tag_hierarchy(subject: &str) -> Vec<String> {
    subject
        .split(HIERARCHY_DELIMITER)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Flattens subject headings into tags, keeping source order.
pub fn collect_tags<I, S>(subjects: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    subjects
        .into_iter()
        .flat_map(|subject| split_tag_hierarchy(subject.as_ref()))
        .collect()
}

/// Removes whitespace, digits (birth years and the like) and commas from a name.
pub fn clean_author_name(name: &str) -> String {
    AUTHOR_NOISE.replace_all(name, "").into_owned()
}

pub fn clean_author_names(authors: &[String]) -> Vec<String> {
    authors.iter().map(|a| clean_author_name(a)).collect()
}

/// Wraps each description as its own HTML paragraph. The text is already HTML
/// and is not escaped; empty input gives an empty string.
pub fn to_html_paragraphs<I, S>(descriptions: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    descriptions
        .into_iter()
        .map(|d| format!("<p>{}</p>", d.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halfwidth_conversion_only_touches_digits() {
        assert_eq!(to_halfwidth_digits("２０１０年５月"), "2010年5月");
        assert_eq!(to_halfwidth_digits("abc"), "abc");
    }

    #[test]
    fn hierarchy_is_split_into_independent_tags() {
        assert_eq!(split_tag_hierarchy("歴史--近代--幕末"), ["歴史", "近代", "幕末"]);
        assert_eq!(split_tag_hierarchy("日本 -- 歴史"), ["日本", "歴史"]);
        assert_eq!(split_tag_hierarchy("海軍"), ["海軍"]);
    }

    #[test]
    fn collect_tags_preserves_order() {
        let tags = collect_tags(["海軍--歴史", "210.58"]);
        assert_eq!(tags, ["海軍", "歴史", "210.58"]);
    }

    #[test]
    fn author_cleanup_strips_noise() {
        assert_eq!(clean_author_name("山田太郎1,"), "山田太郎");
        assert_eq!(clean_author_name("金澤, 裕之, 1975-"), "金澤裕之-");
        assert_eq!(clean_author_name("鈴木，一郎　１９５０"), "鈴木一郎");
    }

    #[test]
    fn author_cleanup_preserves_order() {
        let authors = vec!["山田 太郎".to_string(), "佐藤,花子2".to_string()];
        assert_eq!(clean_author_names(&authors), ["山田太郎", "佐藤花子"]);
    }

    #[test]
    fn descriptions_become_paragraphs() {
        assert_eq!(to_html_paragraphs(["a", "b"]), "<p>a</p><p>b</p>");
        assert_eq!(to_html_paragraphs(Vec::<String>::new()), "");
    }

    #[test]
    fn description_markup_passes_through() {
        assert_eq!(
            to_html_paragraphs(["<ul><li>タイトル: 幕府海軍</li></ul>"]),
            "<p><ul><li>タイトル: 幕府海軍</li></ul></p>"
        );
    }
}
