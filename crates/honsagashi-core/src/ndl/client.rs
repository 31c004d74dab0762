use std::time::Duration;

use tracing::{debug, info};

use crate::error::{NdlError, Result};
use crate::http::NdlHttpClient;
use crate::identifiers::isbn::strip_isbn;
use crate::ndl::export::parse_export;
use crate::ndl::opensearch::parse_opensearch;
use crate::ndl::search_page::extract_export_token;
use crate::ndl::{Endpoints, OpenSearchQuery, ParsedRecord};

/// Fetches and parses NDL Search documents. One method per lookup strategy.
#[derive(Clone)]
pub struct NdlClient {
    http: NdlHttpClient,
    endpoints: Endpoints,
}

impl NdlClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::with_endpoints(Endpoints::new(base_url))
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Result<Self> {
        Ok(Self {
            http: NdlHttpClient::new()?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub async fn opensearch(
        &self,
        query: &OpenSearchQuery,
        timeout: Duration,
    ) -> Result<Vec<ParsedRecord>> {
        let url = self.endpoints.opensearch(query)?;
        let xml = self.http.get_text(&url, timeout).await?;
        let records = parse_opensearch(&xml)?;
        debug!(url = %url, items = records.len(), "OpenSearch response parsed");
        Ok(records)
    }

    pub async fn search_by_isbn(
        &self,
        isbn: &str,
        max_results: u32,
        timeout: Duration,
    ) -> Result<Vec<ParsedRecord>> {
        let query = OpenSearchQuery {
            max_results,
            isbn: Some(isbn.to_string()),
            ..OpenSearchQuery::default()
        };
        self.opensearch(&query, timeout).await
    }

    /// Title search; authors are sent as one space-separated `creator` value.
    pub async fn search_by_title(
        &self,
        title: &str,
        authors: &[String],
        max_results: u32,
        timeout: Duration,
    ) -> Result<Vec<ParsedRecord>> {
        let creator = authors.join(" ");
        let query = OpenSearchQuery {
            max_results,
            title: Some(title.to_string()),
            creator: Some(creator),
            ..OpenSearchQuery::default()
        };
        self.opensearch(&query, timeout).await
    }

    /// Two round trips: the search page for the export token, then the JSON export.
    pub async fn fetch_by_ndlbibid(&self, ndlbibid: &str, timeout: Duration) -> Result<ParsedRecord> {
        let page_url = self.endpoints.search_by_ndlbibid(ndlbibid)?;
        let html = self.http.get_text(&page_url, timeout).await?;
        let token = extract_export_token(&html)
            .ok_or_else(|| NdlError::TokenNotFound(ndlbibid.to_string()))?;
        info!(ndlbibid, token = %token, "resolved export token");

        let export_url = self.endpoints.export_json(&token)?;
        let json = self.http.get_text(&export_url, timeout).await?;
        parse_export(&json)
    }

    pub async fn fetch_cover(&self, isbn: &str, timeout: Duration) -> Result<Vec<u8>> {
        let url = self.endpoints.thumbnail(&strip_isbn(isbn))?;
        info!(url = %url, "fetching cover");
        self.http.get_bytes(&url, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::error::RecordError;

    const TIMEOUT: Duration = Duration::from_secs(5);

    const ONE_ITEM: &str = r#"<rss><channel><item>
        <dc:title>幕府海軍 : ペリー来航から五稜郭まで</dc:title>
        <dc:creator>金澤裕之</dc:creator>
        <dc:publisher>中央公論新社</dc:publisher>
        <dcterms:issued>2023.3</dcterms:issued>
    </item></channel></rss>"#;

    #[tokio::test]
    async fn isbn_search_sends_count_and_isbn() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/opensearch")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cnt".into(), "20".into()),
                Matcher::UrlEncoded("isbn".into(), "9784121027504".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(ONE_ITEM)
            .create_async()
            .await;

        let client = NdlClient::with_base_url(&server.url()).unwrap();
        let records = client
            .search_by_isbn("9784121027504", 20, TIMEOUT)
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().authors, ["金澤裕之"]);
    }

    #[tokio::test]
    async fn title_search_joins_authors() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/opensearch")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("title".into(), "海軍史".into()),
                Matcher::UrlEncoded("creator".into(), "山田 佐藤".into()),
            ]))
            .with_status(200)
            .with_body("<rss><channel></channel></rss>")
            .create_async()
            .await;

        let client = NdlClient::with_base_url(&server.url()).unwrap();
        let authors = vec!["山田".to_string(), "佐藤".to_string()];
        let records = client
            .search_by_title("海軍史", &authors, 5, TIMEOUT)
            .await
            .unwrap();

        m.assert_async().await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn ndlbibid_lookup_follows_export_token() {
        let mut server = Server::new_async().await;
        let page = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("f-bibid".into(), "033336476".into()))
            .with_status(200)
            .with_body(
                r#"<div class="search-result-item"><h3><a id="R100000002-I033336476">x</a></h3></div>"#,
            )
            .create_async()
            .await;
        let export = server
            .mock("GET", "/api/bib/download/json")
            .match_query(Matcher::UrlEncoded(
                "f-token".into(),
                "R100000002-I033336476".into(),
            ))
            .with_status(200)
            .with_header("content-encoding", "gzip")
            .with_body(
                r#"{"title":[{"value":"近世後期の海防と社会変容"}],"creator":[{"name":"清水詩織"}],
                    "publisher":[{"name":"吉川弘文館"}],"date":"2023.11"}"#,
            )
            .create_async()
            .await;

        let client = NdlClient::with_base_url(&server.url()).unwrap();
        let record = client
            .fetch_by_ndlbibid("033336476", TIMEOUT)
            .await
            .unwrap()
            .unwrap();

        page.assert_async().await;
        export.assert_async().await;
        assert_eq!(record.title, "近世後期の海防と社会変容");
        assert_eq!(record.authors, ["清水詩織"]);
    }

    #[tokio::test]
    async fn ndlbibid_export_missing_publisher_is_record_error() {
        let mut server = Server::new_async().await;
        let _page = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_body(r#"<div class="search-result-item"><h3><a id="T-1">x</a></h3></div>"#)
            .create_async()
            .await;
        let _export = server
            .mock("GET", "/api/bib/download/json")
            .match_query(Matcher::Any)
            .with_body(r#"{"title":[{"value":"題"}],"creator":[{"name":"著者"}],"date":"2000"}"#)
            .create_async()
            .await;

        let client = NdlClient::with_base_url(&server.url()).unwrap();
        let parsed = client.fetch_by_ndlbibid("1", TIMEOUT).await.unwrap();
        assert_eq!(parsed, Err(RecordError::MissingField("publisher")));
    }

    #[tokio::test]
    async fn ndlbibid_without_results_is_token_error() {
        let mut server = Server::new_async().await;
        let _page = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_body("<html><body>該当する資料がありません</body></html>")
            .create_async()
            .await;
        let export = server
            .mock("GET", "/api/bib/download/json")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = NdlClient::with_base_url(&server.url()).unwrap();
        let err = client.fetch_by_ndlbibid("999", TIMEOUT).await.unwrap_err();

        assert!(matches!(err, NdlError::TokenNotFound(id) if id == "999"));
        export.assert_async().await;
    }

    #[tokio::test]
    async fn cover_url_uses_stripped_isbn() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/thumbnail/9784121027504.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(vec![0xffu8, 0xd8, 0xff, 0xe0])
            .create_async()
            .await;

        let client = NdlClient::with_base_url(&server.url()).unwrap();
        let bytes = client
            .fetch_cover("978-4-12-102750-4", TIMEOUT)
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(bytes, [0xffu8, 0xd8, 0xff, 0xe0]);
    }
}
