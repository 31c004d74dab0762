use std::io::Read;
use std::time::Duration;

use flate2::read::{GzDecoder, ZlibDecoder};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CACHE_CONTROL, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{NdlError, Result};

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

/// The fixed header set every NDL Search request carries.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers
}

// ─── NdlHttpClient ───────────────────────────────────────────────────────────

/// Single-shot GET client: no retries, no caching, per-request timeout.
///
/// Decompression is done by [`decode_body`] on the payload itself, so the client
/// is built without reqwest's own content-encoding handling.
#[derive(Clone)]
pub struct NdlHttpClient {
    client: reqwest::Client,
}

impl NdlHttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .build()?;
        Ok(Self { client })
    }

    /// Raw response body after decompression. Non-success statuses are errors,
    /// with 404 reported as [`NdlError::NotFound`].
    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        debug!(url, ?timeout, "GET");
        let resp = self.client.get(url).timeout(timeout).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(NdlError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(NdlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        Ok(decode_body(&body))
    }

    /// Response body as UTF-8 text.
    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let bytes = self.get_bytes(url, timeout).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Decompresses gzip or zlib payloads by sniffing their headers; anything else,
/// including a payload that fails to inflate, is returned unchanged.
pub fn decode_body(body: &[u8]) -> Vec<u8> {
    if body.starts_with(&[0x1f, 0x8b]) {
        let mut out = Vec::new();
        if GzDecoder::new(body).read_to_end(&mut out).is_ok() {
            return out;
        }
        debug!("body looked gzip-compressed but did not inflate, using raw bytes");
    } else if looks_like_zlib(body) {
        let mut out = Vec::new();
        if ZlibDecoder::new(body).read_to_end(&mut out).is_ok() {
            return out;
        }
        debug!("body looked zlib-compressed but did not inflate, using raw bytes");
    }
    body.to_vec()
}

fn looks_like_zlib(body: &[u8]) -> bool {
    match body {
        [cmf, flg, ..] => cmf & 0x0f == 8 && (u16::from(*cmf) * 256 + u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use mockito::Server;

    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn decodes_gzip_payload() {
        assert_eq!(decode_body(&gzip("幕府海軍".as_bytes())), "幕府海軍".as_bytes());
    }

    #[test]
    fn decodes_zlib_payload() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"{\"title\":[]}").unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(decode_body(&compressed), b"{\"title\":[]}");
    }

    #[test]
    fn plain_payload_passes_through() {
        assert_eq!(decode_body(b"{\"a\":1}"), b"{\"a\":1}");
        assert_eq!(decode_body(b"<rss/>"), b"<rss/>");
        assert_eq!(decode_body(b""), b"");
    }

    #[test]
    fn truncated_gzip_falls_back_to_raw() {
        let broken = [0x1f, 0x8b, 0x08];
        assert_eq!(decode_body(&broken), broken);
    }

    #[tokio::test]
    async fn gzip_body_without_content_encoding_is_decoded() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/opensearch")
            .match_header("user-agent", BROWSER_USER_AGENT)
            .with_status(200)
            .with_body(gzip(b"<rss></rss>"))
            .create_async()
            .await;

        let client = NdlHttpClient::new().unwrap();
        let text = client
            .get_text(
                &format!("{}/api/opensearch", server.url()),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(text, "<rss></rss>");
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/thumbnail/0000000000000.jpg")
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/thumbnail/9784121027504.jpg")
            .with_status(503)
            .create_async()
            .await;

        let client = NdlHttpClient::new().unwrap();
        let timeout = Duration::from_secs(5);

        let err = client
            .get_bytes(&format!("{}/thumbnail/0000000000000.jpg", server.url()), timeout)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = client
            .get_bytes(&format!("{}/thumbnail/9784121027504.jpg", server.url()), timeout)
            .await
            .unwrap_err();
        assert!(matches!(err, NdlError::Status { status: 503, .. }));
    }
}
