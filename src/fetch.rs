use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use url::Url;

use crate::error::FetchError;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGES: &str = "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7";

pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

// ── Client construction ──────────────────────────────────────────────────────

/// Client used for origin pages and image hosts. Timeouts are set per
/// request; certificate checks are skipped unless `verify_tls` is set.
pub fn build_web_client(verify_tls: bool) -> reqwest::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGES));

    let mut builder = reqwest::ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .default_headers(headers);

    if !verify_tls {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build()
}

// ── HTTP fetch ───────────────────────────────────────────────────────────────

/// Single GET of the page body. No retries.
pub async fn fetch_html(client: &reqwest::Client, url: &Url) -> Result<String, FetchError> {
    let response = client
        .get(url.as_str())
        .timeout(PAGE_TIMEOUT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| FetchError::Body(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_body_and_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello</p>"))
            .mount(&server)
            .await;

        let client = build_web_client(false).unwrap();
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let html = fetch_html(&client, &url).await.unwrap();
        assert_eq!(html, "<p>hello</p>");

        let requests = server.received_requests().await.unwrap();
        let headers = &requests[0].headers;
        assert_eq!(headers.get("user-agent").unwrap().to_str().unwrap(), USER_AGENT);
        assert_eq!(
            headers.get("accept-language").unwrap().to_str().unwrap(),
            ACCEPT_LANGUAGES
        );
        assert_eq!(headers.get("accept").unwrap().to_str().unwrap(), ACCEPT_HTML);
    }

    #[tokio::test]
    async fn non_success_status_fails_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_web_client(false).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetch_html(&client, &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(403)));
    }

    #[tokio::test]
    async fn unreachable_origin_is_transport_error() {
        let client = build_web_client(false).unwrap();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let err = fetch_html(&client, &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout(_)));
    }
}
