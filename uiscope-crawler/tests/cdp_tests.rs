// CDP discovery-surface tests against a mock HTTP endpoint.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use uiscope_crawler::cdp::{CdpBrowser, CdpError};
use uiscope_crawler::error::CrawlError;
use uiscope_crawler::session::Browser;

#[tokio::test]
async fn test_version_discovery() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Browser": "Chrome/120.0.0.0",
            "Protocol-Version": "1.3",
            "User-Agent": "Mozilla/5.0",
            "V8-Version": "12.0",
            "WebKit-Version": "537.36",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/browser/abc"
        })))
        .mount(&mock_server)
        .await;

    let browser = CdpBrowser::new(&mock_server.uri());
    let version = browser.version().await.unwrap();

    assert_eq!(version.browser, "Chrome/120.0.0.0");
    assert_eq!(version.protocol_version, "1.3");
}

#[tokio::test]
async fn test_version_against_dead_endpoint() {
    let browser = CdpBrowser::new("http://127.0.0.1:1");
    let err = browser.version().await.unwrap_err();
    assert!(matches!(err, CdpError::BrowserNotAvailable(_)));
}

#[tokio::test]
async fn test_open_tab_requires_debugger_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/json/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tab-1",
            "type": "page",
            "title": "",
            "url": "about:blank"
        })))
        .mount(&mock_server)
        .await;

    let browser = CdpBrowser::new(&mock_server.uri());
    let err = browser.open_tab().await.unwrap_err();
    assert!(matches!(err, CdpError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_open_tab_surfaces_http_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/json/new"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let browser = CdpBrowser::new(&mock_server.uri());
    let err = browser.open_tab().await.unwrap_err();
    assert!(matches!(err, CdpError::Http(_)));
}

#[tokio::test]
async fn test_open_page_maps_to_project_init_error() {
    let browser = CdpBrowser::new("http://127.0.0.1:1");
    let err = browser.open_page().await.unwrap_err();
    assert!(matches!(err, CrawlError::ProjectInit(_)));
}

#[test]
fn test_endpoint_trailing_slash_is_trimmed() {
    let browser = CdpBrowser::new("http://localhost:9222/");
    assert_eq!(browser.endpoint(), "http://localhost:9222");
}
