// Crawl controller scenarios against an in-memory fake browser.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uiscope_crawler::controller::{CrawlBudget, CrawlController};
use uiscope_crawler::error::{CrawlError, Result};
use uiscope_crawler::result::{MetricsRecord, PageMetrics};
use uiscope_crawler::session::PageSession;

#[derive(Clone)]
struct FakeDoc {
    markup: String,
    links: Vec<String>,
}

#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, FakeDoc>,
    unreachable: HashSet<String>,
    probe_failures: HashSet<String>,
}

impl FakeSite {
    fn page(mut self, url: &str, markup: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            FakeDoc {
                markup: markup.to_string(),
                links: links.iter().map(|l| l.to_string()).collect(),
            },
        );
        self
    }

    fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    fn probe_failure(mut self, url: &str) -> Self {
        self.probe_failures.insert(url.to_string());
        self
    }
}

struct FakePage {
    site: Arc<FakeSite>,
    current: Option<String>,
}

impl FakePage {
    fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            current: None,
        }
    }

    fn doc(&self) -> Result<&FakeDoc> {
        let url = self.current.as_ref().expect("no page loaded");
        self.site.pages.get(url).ok_or_else(|| CrawlError::Evaluation {
            url: url.clone(),
            reason: "document gone".to_string(),
        })
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        if self.site.unreachable.contains(url) || !self.site.pages.contains_key(url) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "timed out".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn current_markup(&mut self) -> Result<String> {
        Ok(self.doc()?.markup.clone())
    }

    async fn probe_metrics(&mut self) -> Result<PageMetrics> {
        let url = self.current.clone().expect("no page loaded");
        if self.site.probe_failures.contains(&url) {
            return Err(CrawlError::Evaluation {
                url,
                reason: "probe threw".to_string(),
            });
        }
        let markup = self.doc()?.markup.clone();
        Ok(PageMetrics {
            total_dom_elements: markup.matches('<').count() as u64,
            num_interactive_elements: markup.matches("<a ").count() as u64,
            dom_tree_depth: 1,
            url,
        })
    }

    async fn discover_links(&mut self) -> Result<Vec<String>> {
        Ok(self.doc()?.links.clone())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn budget(max_pages: usize, max_depth: usize) -> CrawlBudget {
    CrawlBudget {
        max_pages,
        max_depth,
        nav_timeout: Duration::from_secs(1),
    }
}

fn collecting_controller(
    site: FakeSite,
    base: &str,
    budget: CrawlBudget,
) -> (CrawlController<FakePage>, Arc<Mutex<Vec<MetricsRecord>>>) {
    let records: Arc<Mutex<Vec<MetricsRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = records.clone();

    let controller = CrawlController::new("demo", base, FakePage::new(Arc::new(site)), budget)
        .unwrap()
        .with_record_callback(Arc::new(move |record| {
            sink.lock().unwrap().push(record.clone());
        }));

    (controller, records)
}

#[tokio::test]
async fn test_structurally_identical_siblings_emit_one_record() {
    // B and C differ only in attribute values, so they share a fingerprint.
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            r#"<html><body><a href="/b">b</a><a href="/c">c</a></body></html>"#,
            &["http://app.test/b", "http://app.test/c"],
        )
        .page(
            "http://app.test/b",
            r#"<html><body><div class="b"><p>item</p></div></body></html>"#,
            &[],
        )
        .page(
            "http://app.test/c",
            r#"<html><body><div class="c"><p>item</p></div></body></html>"#,
            &[],
        );

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 2));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 3);
    assert_eq!(result.unique_structures, 2);

    let records = records.lock().unwrap();
    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["http://app.test/", "http://app.test/b"]);
}

#[tokio::test]
async fn test_max_depth_zero_visits_only_the_seed() {
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            "<html><body><a>x</a></body></html>",
            &["http://app.test/next"],
        )
        .page("http://app.test/next", "<html><body><p>n</p></body></html>", &[]);

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 0));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 1);
    assert_eq!(records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_navigation_failure_counts_visited_without_a_record() {
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            "<html><body><nav></nav></body></html>",
            &["http://app.test/broken", "http://app.test/ok"],
        )
        .unreachable("http://app.test/broken")
        .page("http://app.test/ok", "<html><body><main></main></body></html>", &[]);

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 2));
    let result = controller.run().await;

    // The broken page is consumed from the frontier and counted, but emits
    // nothing; the crawl proceeds past it.
    assert_eq!(result.pages_visited, 3);
    assert_eq!(result.unique_structures, 2);

    let records = records.lock().unwrap();
    assert!(records.iter().all(|r| r.url != "http://app.test/broken"));
    assert!(records.iter().any(|r| r.url == "http://app.test/ok"));
}

#[tokio::test]
async fn test_seed_navigation_failure_yields_empty_crawl() {
    let site = FakeSite::default().unreachable("http://app.test/");

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 2));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 1);
    assert_eq!(result.unique_structures, 0);
    assert!(records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cyclic_links_terminate() {
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            "<html><body><header></header></body></html>",
            &["http://app.test/b"],
        )
        .page(
            "http://app.test/b",
            "<html><body><footer></footer></body></html>",
            &["http://app.test/", "http://app.test/b"],
        );

    let (controller, _records) = collecting_controller(site, "http://app.test/", budget(1000, 50));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 2);
}

#[tokio::test]
async fn test_page_budget_bounds_the_crawl() {
    let mut site = FakeSite::default();
    for i in 0..10 {
        let url = if i == 0 {
            "http://app.test/".to_string()
        } else {
            format!("http://app.test/p{}", i)
        };
        let next = format!("http://app.test/p{}", i + 1);
        let markup = format!("<html><body><p>{}</p><b>{}</b></body></html>", i, i);
        site = site.page(&url, &markup, &[next.as_str()]);
    }

    let (controller, _records) = collecting_controller(site, "http://app.test/", budget(3, 50));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 3);
}

#[tokio::test]
async fn test_duplicate_structure_still_contributes_links() {
    // B renders the same shell as the seed but links on to C; C must still
    // be discovered through B.
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            r#"<html><body><div id="shell"><a href="/b">next</a></div></body></html>"#,
            &["http://app.test/b"],
        )
        .page(
            "http://app.test/b",
            r#"<html><body><div id="other"><a href="/c">next</a></div></body></html>"#,
            &["http://app.test/c"],
        )
        .page(
            "http://app.test/c",
            "<html><body><table><tr><td>data</td></tr></table></body></html>",
            &[],
        );

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 3));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 3);
    assert_eq!(result.unique_structures, 2);

    let urls: Vec<String> = records.lock().unwrap().iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls, vec!["http://app.test/", "http://app.test/c"]);
}

#[tokio::test]
async fn test_records_follow_breadth_first_order() {
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            "<html><body><h1>root</h1></body></html>",
            &["http://app.test/a", "http://app.test/b"],
        )
        .page(
            "http://app.test/a",
            "<html><body><h2>a</h2><a>deep</a></body></html>",
            &["http://app.test/a/deep"],
        )
        .page(
            "http://app.test/b",
            "<html><body><h3>b</h3></body></html>",
            &[],
        )
        .page(
            "http://app.test/a/deep",
            "<html><body><h4>deep</h4></body></html>",
            &[],
        );

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 3));
    controller.run().await;

    let urls: Vec<String> = records.lock().unwrap().iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            "http://app.test/",
            "http://app.test/a",
            "http://app.test/b",
            "http://app.test/a/deep",
        ]
    );
}

#[tokio::test]
async fn test_probe_failure_forfeits_record_but_not_links() {
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            "<html><body><section></section></body></html>",
            &["http://app.test/next"],
        )
        .probe_failure("http://app.test/")
        .page(
            "http://app.test/next",
            "<html><body><article></article></body></html>",
            &[],
        );

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 2));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 2);

    let urls: Vec<String> = records.lock().unwrap().iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls, vec!["http://app.test/next"]);
}

#[tokio::test]
async fn test_cross_origin_links_are_not_followed() {
    let site = FakeSite::default()
        .page(
            "http://app.test/",
            "<html><body><a>out</a></body></html>",
            &["http://other.test/", "https://app.test/"],
        )
        .page("http://other.test/", "<html><body></body></html>", &[]);

    let (controller, _records) = collecting_controller(site, "http://app.test/", budget(120, 2));
    let result = controller.run().await;

    assert_eq!(result.pages_visited, 1);
}

#[tokio::test]
async fn test_records_are_stamped_with_the_project_name() {
    let site = FakeSite::default().page(
        "http://app.test/",
        "<html><body><span>x</span></body></html>",
        &[],
    );

    let (controller, records) = collecting_controller(site, "http://app.test/", budget(120, 2));
    controller.run().await;

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].project, "demo");
}
