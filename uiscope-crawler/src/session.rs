//! The capability seam between crawl logic and the remote browser.
//!
//! `CrawlController` and the orchestrator only ever see these traits, so the
//! crawl engine is testable against in-memory fakes and agnostic to the
//! automation mechanism behind them.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::from_value;

use crate::cdp::CdpPage;
use crate::error::{CrawlError, Result};
use crate::result::PageMetrics;

/// In-page structural probe. Depth is 1 at a leaf element, else 1 plus the
/// maximum depth over children, rooted at the document element.
const METRICS_PROBE: &str = r#"
(() => {
  const total = document.getElementsByTagName('*').length;
  const interact = document.querySelectorAll(
    'button,input,select,textarea,a'
  ).length;
  function depth(n){return n.children.length
      ? 1 + Math.max(...[...n.children].map(depth))
      : 1;}
  return { total_dom_elements: total,
           num_interactive_elements: interact,
           dom_tree_depth: depth(document.documentElement),
           url: location.href };
})()
"#;

const LINK_HREFS: &str = "Array.from(document.querySelectorAll('a[href]')).map(a => a.href)";

const DOCUMENT_MARKUP: &str = "document.documentElement.outerHTML";

/// One logical browser tab. All operations mutate the remote tab's
/// navigation state; implementations hold no crawl-domain state.
#[async_trait]
pub trait PageSession: Send {
    /// Load the URL and wait for the document to settle. On failure or
    /// timeout the URL is unvisitable; callers skip it without retrying.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Serialized markup of the current document.
    async fn current_markup(&mut self) -> Result<String>;

    /// Run the structural measurement probe in the page.
    async fn probe_metrics(&mut self) -> Result<PageMetrics>;

    /// Every anchor's resolved absolute href.
    async fn discover_links(&mut self) -> Result<Vec<String>>;

    /// Release the tab.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for per-project page sessions against a shared endpoint.
#[async_trait]
pub trait Browser: Send + Sync {
    type Page: PageSession + Send;

    /// Open a fresh tab. Failure here abandons the whole project crawl.
    async fn open_page(&self) -> Result<Self::Page>;
}

#[async_trait]
impl PageSession for CdpPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let load = async {
            self.begin_navigation(url).await?;
            self.wait_for_ready().await
        };
        let outcome = tokio::time::timeout(timeout, load).await;

        match outcome {
            Ok(Ok(())) => {
                self.set_current_url(url);
                Ok(())
            }
            Ok(Err(e)) => Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: format!("no quiescence within {}ms", timeout.as_millis()),
            }),
        }
    }

    async fn current_markup(&mut self) -> Result<String> {
        let value = self
            .evaluate(DOCUMENT_MARKUP)
            .await
            .map_err(|e| CrawlError::Evaluation {
                url: self.current_url().to_string(),
                reason: e.to_string(),
            })?;

        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn probe_metrics(&mut self) -> Result<PageMetrics> {
        let url = self.current_url().to_string();
        let value = self
            .evaluate(METRICS_PROBE)
            .await
            .map_err(|e| CrawlError::Evaluation {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        from_value(value).map_err(|e| CrawlError::Evaluation {
            url,
            reason: format!("malformed probe result: {}", e),
        })
    }

    async fn discover_links(&mut self) -> Result<Vec<String>> {
        let url = self.current_url().to_string();
        let value = self
            .evaluate(LINK_HREFS)
            .await
            .map_err(|e| CrawlError::Evaluation {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        from_value(value).map_err(|e| CrawlError::Evaluation {
            url,
            reason: format!("malformed link list: {}", e),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.close_tab().await?;
        Ok(())
    }
}
