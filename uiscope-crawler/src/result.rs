use serde::{Deserialize, Serialize};

/// Raw measurements returned by the in-page structural probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMetrics {
    pub total_dom_elements: u64,
    pub num_interactive_elements: u64,
    pub dom_tree_depth: u64,
    pub url: String,
}

/// One line of a project's metrics stream. Written once per
/// structurally-novel page and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub project: String,
    pub url: String,
    pub total_dom_elements: u64,
    pub num_interactive_elements: u64,
    pub dom_tree_depth: u64,
}

impl MetricsRecord {
    pub fn from_metrics(project: &str, metrics: PageMetrics) -> Self {
        Self {
            project: project.to_string(),
            url: metrics.url,
            total_dom_elements: metrics.total_dom_elements,
            num_interactive_elements: metrics.num_interactive_elements,
            dom_tree_depth: metrics.dom_tree_depth,
        }
    }
}

/// Terminal summary of one project's crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub project: String,
    pub pages_visited: usize,
    pub unique_structures: usize,
}
