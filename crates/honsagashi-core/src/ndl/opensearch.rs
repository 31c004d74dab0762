use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{NdlError, RecordError, Result};
use crate::identifiers::IdentifierKind;
use crate::ndl::ParsedRecord;
use crate::normalize::collect_tags;
use crate::normalize::text::to_html_paragraphs;
use crate::types::{BookRecord, RecordIdentifiers};

/// Fields gathered from the direct children of one `<item>`.
#[derive(Debug, Default)]
struct ItemFields {
    title: Option<String>,
    creators: Vec<String>,
    publisher: Option<String>,
    issued: Option<String>,
    identifiers: RecordIdentifiers,
    subjects: Vec<String>,
    dc_descriptions: Vec<String>,
    descriptions: Vec<String>,
}

/// A child element of `<item>` whose text is being collected.
struct OpenField {
    name: String,
    xsi_type: Option<String>,
    text: String,
}

impl OpenField {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let xsi_type = e
            .attributes()
            .flatten()
            .find(|a| a.key.as_ref() == b"xsi:type")
            .map(|a| String::from_utf8_lossy(&a.value).into_owned());
        Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            xsi_type,
            text: String::new(),
        }
    }
}

impl ItemFields {
    fn accept(&mut self, field: OpenField) {
        let text = field.text.trim().to_string();
        if text.is_empty() {
            return;
        }

        match field.name.as_str() {
            "dc:title" => {
                self.title.get_or_insert(text);
            }
            "dc:creator" => self.creators.push(text),
            "dc:publisher" => {
                self.publisher.get_or_insert(text);
            }
            "dcterms:issued" => {
                self.issued.get_or_insert(text);
            }
            "dc:identifier" => {
                let kind = field
                    .xsi_type
                    .as_deref()
                    .and_then(IdentifierKind::from_xsi_type);
                if let Some(kind) = kind.filter(|k| self.identifiers.get(*k).is_empty()) {
                    self.identifiers.set(kind, text);
                }
            }
            "dc:subject" => self.subjects.push(text),
            "dc:description" => self.dc_descriptions.push(text),
            "description" => self.descriptions.push(text),
            _ => {}
        }
    }

    fn into_record(self) -> ParsedRecord {
        let title = self.title.ok_or(RecordError::MissingField("dc:title"))?;
        if self.creators.is_empty() {
            return Err(RecordError::MissingField("dc:creator"));
        }
        let publisher = self
            .publisher
            .ok_or(RecordError::MissingField("dc:publisher"))?;
        let issued = self
            .issued
            .ok_or(RecordError::MissingField("dcterms:issued"))?;

        Ok(BookRecord {
            title,
            authors: self.creators,
            publisher,
            pubdate: Some(issued),
            description: to_html_paragraphs(self.dc_descriptions.iter().chain(&self.descriptions)),
            tags: collect_tags(&self.subjects),
            identifiers: self.identifiers,
        })
    }
}

/// Parses an OpenSearch RSS response into one result per `<item>`.
///
/// Items lacking a required element come back as `Err` without affecting their
/// siblings; only a document that is not well-formed fails as a whole.
pub fn parse_opensearch(xml: &str) -> Result<Vec<ParsedRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut item: Option<ItemFields> = None;
    let mut field: Option<OpenField> = None;
    // Element depth below the current <item>.
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            NdlError::Parse(format!(
                "invalid OpenSearch XML at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                if item.is_some() {
                    depth += 1;
                    if depth == 1 {
                        field = Some(OpenField::from_start(&e));
                    }
                } else if e.name().as_ref() == b"item" {
                    item = Some(ItemFields::default());
                    depth = 0;
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if let Some(fields) = item.as_mut() {
                        fields.accept(OpenField::from_start(&e));
                    }
                }
            }
            Event::Text(t) => {
                if let Some(f) = field.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| NdlError::Parse(format!("bad text in OpenSearch XML: {e}")))?;
                    f.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(f) = field.as_mut() {
                    f.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) if item.is_some() => {
                if depth == 0 {
                    if let Some(done) = item.take() {
                        records.push(done.into_record());
                    }
                    continue;
                }
                if depth == 1 {
                    if let (Some(f), Some(fields)) = (field.take(), item.as_mut()) {
                        fields.accept(f);
                    }
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:dcterms="http://purl.org/dc/terms/"
     xmlns:dcndl="http://ndl.go.jp/dcndl/terms/"
     xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
     xmlns:openSearch="http://a9.com/-/spec/opensearchrss/1.0/"
     version="2.0">
  <channel>
    <title>幕府海軍 - 国立国会図書館サーチ OpenSearch</title>
    <description>Search results for isbn=9784121027504</description>
    <openSearch:totalResults>2</openSearch:totalResults>
    <item>
      <title>幕府海軍 : ペリー来航から五稜郭まで</title>
      <description><![CDATA[<p>中公新書 ; 2750</p><ul><li>タイトル: 幕府海軍</li></ul>]]></description>
      <dc:title>幕府海軍 : ペリー来航から五稜郭まで</dc:title>
      <dc:creator>金澤裕之</dc:creator>
      <dc:publisher>中央公論新社</dc:publisher>
      <dcterms:issued xsi:type="dcterms:W3CDTF">2023.3</dcterms:issued>
      <dc:subject>日本 -- 歴史 -- 幕末期</dc:subject>
      <dc:subject xsi:type="dcndl:NDC10">397.21</dc:subject>
      <dc:identifier xsi:type="dcndl:ISBN">978-4-12-102750-4</dc:identifier>
      <dc:identifier xsi:type="dcndl:JPNO">23812345</dc:identifier>
      <dc:identifier xsi:type="dcndl:NDLBibID">032704512</dc:identifier>
      <dc:description>幕府海軍の誕生から終焉まで &amp; その後</dc:description>
    </item>
    <item>
      <title>幕府海軍の興亡</title>
      <dc:title>幕府海軍の興亡</dc:title>
      <dc:publisher>慶應義塾大学出版会</dc:publisher>
      <dcterms:issued>2017.2</dcterms:issued>
    </item>
    <item>
      <dc:title>海軍史</dc:title>
      <dc:creator>山田 太郎, 1950-</dc:creator>
      <dc:creator>佐藤 花子</dc:creator>
      <dc:publisher>史学社</dc:publisher>
      <dcterms:issued>１９９９</dcterms:issued>
      <dc:identifier xsi:type="dcndl:NDLBibID">000000001</dc:identifier>
    </item>
  </channel>
</rss>
"#;

    #[test]
    fn parses_complete_item() {
        let records = parse_opensearch(FEED).unwrap();
        assert_eq!(records.len(), 3);

        let first = records[0].as_ref().unwrap();
        assert_eq!(first.title, "幕府海軍 : ペリー来航から五稜郭まで");
        assert_eq!(first.authors, ["金澤裕之"]);
        assert_eq!(first.publisher, "中央公論新社");
        assert_eq!(first.pubdate.as_deref(), Some("2023.3"));
        assert_eq!(first.tags, ["日本", "歴史", "幕末期", "397.21"]);
        assert_eq!(first.identifiers.isbn, "978-4-12-102750-4");
        assert_eq!(first.identifiers.jpno, "23812345");
        assert_eq!(first.identifiers.ndlbibid, "032704512");
        assert_eq!(
            first.description,
            "<p>幕府海軍の誕生から終焉まで & その後</p><p><p>中公新書 ; 2750</p><ul><li>タイトル: 幕府海軍</li></ul></p>"
        );
    }

    #[test]
    fn item_without_creator_is_skipped_but_siblings_survive() {
        let records = parse_opensearch(FEED).unwrap();
        assert_eq!(records[1], Err(RecordError::MissingField("dc:creator")));
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());
    }

    #[test]
    fn identifiers_come_from_their_own_item() {
        let records = parse_opensearch(FEED).unwrap();
        let third = records[2].as_ref().unwrap();
        assert_eq!(third.identifiers.ndlbibid, "000000001");
        assert_eq!(third.identifiers.isbn, "");
        assert_eq!(third.authors, ["山田 太郎, 1950-", "佐藤 花子"]);
        assert_eq!(third.description, "");
        assert!(third.tags.is_empty());
    }

    #[test]
    fn missing_issued_date_is_reported() {
        let xml = r#"<rss><channel><item>
            <dc:title>題</dc:title><dc:creator>著者</dc:creator><dc:publisher>版元</dc:publisher>
        </item></channel></rss>"#;
        let records = parse_opensearch(xml).unwrap();
        assert_eq!(records, vec![Err(RecordError::MissingField("dcterms:issued"))]);
    }

    #[test]
    fn empty_feed_yields_nothing() {
        let xml = r#"<rss><channel><title>none</title></channel></rss>"#;
        assert!(parse_opensearch(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let xml = "<rss><channel><item><dc:title>題</dc:creator></item></channel></rss>";
        assert!(matches!(parse_opensearch(xml), Err(NdlError::Parse(_))));
    }
}
