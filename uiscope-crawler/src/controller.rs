//! Per-project crawl driver.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::frontier::CrawlFrontier;
use crate::result::{CrawlResult, MetricsRecord};
use crate::session::PageSession;
use crate::signature::dom_signature;

/// Called once per structurally-novel page, in breadth-first visitation
/// order. The callback owns durability (the orchestrator wires it to the
/// project's output stream).
pub type RecordCallback = Arc<dyn Fn(&MetricsRecord) + Send + Sync>;

/// Called before each page visit with (visited count, url).
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Crawl-wide budgets, applied per project.
#[derive(Debug, Clone, Copy)]
pub struct CrawlBudget {
    pub max_pages: usize,
    pub max_depth: usize,
    pub nav_timeout: Duration,
}

impl Default for CrawlBudget {
    fn default() -> Self {
        Self {
            max_pages: 120,
            max_depth: 2,
            nav_timeout: Duration::from_secs(30),
        }
    }
}

/// Drives one project's crawl to completion over a single page session.
///
/// Strictly sequential: one navigation settles before the next begins, so
/// markup extraction and link discovery always observe post-navigation
/// state. A page-level failure is logged and skipped; it never terminates
/// the crawl.
pub struct CrawlController<P: PageSession> {
    project: String,
    base_url: String,
    page: P,
    frontier: CrawlFrontier,
    seen_signatures: HashSet<String>,
    budget: CrawlBudget,
    record_callback: Option<RecordCallback>,
    progress_callback: Option<ProgressCallback>,
}

impl<P: PageSession> CrawlController<P> {
    pub fn new(project: &str, base_url: &str, page: P, budget: CrawlBudget) -> Result<Self> {
        let frontier = CrawlFrontier::new(base_url, budget.max_depth)?;

        Ok(Self {
            project: project.to_string(),
            base_url: base_url.to_string(),
            page,
            frontier,
            seen_signatures: HashSet::new(),
            budget,
            record_callback: None,
            progress_callback: None,
        })
    }

    pub fn with_record_callback(mut self, callback: RecordCallback) -> Self {
        self.record_callback = Some(callback);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Run the crawl to completion and return the terminal counts.
    pub async fn run(mut self) -> CrawlResult {
        info!(
            "Starting crawl of {} for project '{}' (max_pages={}, max_depth={})",
            self.base_url, self.project, self.budget.max_pages, self.budget.max_depth
        );

        self.frontier.seed(&self.base_url);

        while !self.frontier.should_stop(self.budget.max_pages) {
            let Some(entry) = self.frontier.next() else {
                break;
            };

            self.frontier.mark_visited(&entry.url);

            if let Some(ref callback) = self.progress_callback {
                callback(self.frontier.visited_count(), entry.url.clone());
            }

            if let Err(e) = self.page.navigate(&entry.url, self.budget.nav_timeout).await {
                warn!(project = %self.project, "{}", e);
                continue;
            }

            let markup = match self.page.current_markup().await {
                Ok(markup) => markup,
                Err(e) => {
                    warn!(project = %self.project, "{}", e);
                    continue;
                }
            };

            let signature = dom_signature(&markup);
            if self.seen_signatures.insert(signature) {
                // Novel structure: emit a record. A failed probe forfeits the
                // record but not the rest of the page visit.
                match self.page.probe_metrics().await {
                    Ok(metrics) => {
                        let record = MetricsRecord::from_metrics(&self.project, metrics);
                        if let Some(ref callback) = self.record_callback {
                            callback(&record);
                        }
                    }
                    Err(e) => {
                        warn!(project = %self.project, "{}", e);
                    }
                }
            } else {
                // Duplicate structure still gets link discovery: distinct
                // URLs sharing a shell template can lead to different parts
                // of the app.
                debug!(project = %self.project, url = %entry.url, "duplicate structure");
            }

            match self.page.discover_links().await {
                Ok(links) => {
                    for link in links {
                        self.frontier.offer(&link, entry.depth + 1);
                    }
                }
                Err(e) => {
                    warn!(project = %self.project, "link discovery failed: {}", e);
                }
            }
        }

        if let Err(e) = self.page.close().await {
            debug!(project = %self.project, "tab close failed: {}", e);
        }

        let result = CrawlResult {
            project: self.project,
            pages_visited: self.frontier.visited_count(),
            unique_structures: self.seen_signatures.len(),
        };

        info!(
            "Crawl complete for '{}': pages visited={}, unique UI={}",
            result.project, result.pages_visited, result.unique_structures
        );

        result
    }
}
