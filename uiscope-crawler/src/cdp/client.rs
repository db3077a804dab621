//! Handle to the remote browser's HTTP discovery surface.

use async_trait::async_trait;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::page::CdpPage;
use crate::cdp::protocol::{BrowserVersion, PageInfo};
use crate::error::CrawlError;
use crate::session::Browser;

pub const DEFAULT_CDP_ENDPOINT: &str = "http://localhost:9222";

/// Connection factory for an already-authenticated remote browser.
///
/// Holds only the endpoint address; nothing touches the network until a tab
/// is opened, so each project's crawl task pays for (and owns) its own
/// connection.
#[derive(Debug, Clone)]
pub struct CdpBrowser {
    endpoint: String,
    http: reqwest::Client,
}

impl CdpBrowser {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Endpoint from the `CDP_ENDPOINT` environment variable, falling back
    /// to the conventional local debugging port.
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("CDP_ENDPOINT").unwrap_or_else(|_| DEFAULT_CDP_ENDPOINT.to_string());
        Self::new(&endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch browser version info, verifying the endpoint is reachable.
    pub async fn version(&self) -> Result<BrowserVersion, CdpError> {
        let url = format!("{}/json/version", self.endpoint);
        let version: BrowserVersion = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", self.endpoint, e)))?
            .error_for_status()?
            .json()
            .await?;

        debug!("Connected to browser: {}", version.browser);
        Ok(version)
    }

    /// Create a new tab and attach to it over its own WebSocket.
    ///
    /// Chrome requires PUT for `/json/new`.
    pub async fn open_tab(&self) -> Result<CdpPage, CdpError> {
        let create_url = format!("{}/json/new", self.endpoint);
        let info: PageInfo = self
            .http
            .put(&create_url)
            .send()
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", self.endpoint, e)))?
            .error_for_status()?
            .json()
            .await?;

        debug!("Created new tab: {} - {}", info.id, info.url);
        CdpPage::connect(self.endpoint.clone(), info).await
    }
}

#[async_trait]
impl Browser for CdpBrowser {
    type Page = CdpPage;

    async fn open_page(&self) -> Result<CdpPage, CrawlError> {
        self.open_tab()
            .await
            .map_err(|e| CrawlError::ProjectInit(e.to_string()))
    }
}
