//! Concurrent multi-project orchestration against the shared browser
//! endpoint.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use uiscope_crawler::controller::{CrawlBudget, CrawlController, RecordCallback};
use uiscope_crawler::error::CrawlError;
use uiscope_crawler::session::Browser;

use crate::config::Project;

/// Options for one orchestrated run.
pub struct OrchestrateOptions {
    pub out_dir: PathBuf,
    pub budget: CrawlBudget,
    pub max_concurrent: usize,
    pub show_progress_bars: bool,
}

impl Default for OrchestrateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("ui_metrics"),
            budget: CrawlBudget::default(),
            max_concurrent: 4,
            show_progress_bars: true,
        }
    }
}

/// A project crawl that ran to completion.
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub project: String,
    pub pages_visited: usize,
    pub unique_structures: usize,
    pub output_path: PathBuf,
}

/// A project crawl that could not run at all.
#[derive(Debug)]
pub struct ProjectFailure {
    pub project: String,
    pub error: CrawlError,
}

/// Run every configured project against the shared endpoint.
///
/// One task per project, each strictly sequential inside; the semaphore
/// bounds how many run at once so the remote browser is not overwhelmed.
/// No two tasks share a page session or crawl state. A project that cannot
/// start is reported and never touches its output file; siblings keep going.
pub async fn run_projects<B>(
    browser: Arc<B>,
    projects: Vec<Project>,
    options: OrchestrateOptions,
) -> Result<(Vec<ProjectReport>, Vec<ProjectFailure>), CrawlError>
where
    B: Browser + 'static,
    B::Page: 'static,
{
    std::fs::create_dir_all(&options.out_dir)?;

    info!(
        "Orchestrating {} project(s), at most {} concurrent",
        projects.len(),
        options.max_concurrent
    );

    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let multi_progress = if options.show_progress_bars {
        Some(Arc::new(MultiProgress::new()))
    } else {
        None
    };

    let mut handles = Vec::new();

    for project in projects {
        let progress_bar = if let Some(ref m) = multi_progress {
            let pb = m.add(ProgressBar::new_spinner());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap(),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message(format!("{}: waiting", project.name));
            Some(pb)
        } else {
            None
        };

        let browser = browser.clone();
        let semaphore = semaphore.clone();
        let out_dir = options.out_dir.clone();
        let budget = options.budget;

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire().await.unwrap();
            let name = project.name.clone();
            let outcome = crawl_one(browser, project, &out_dir, budget, progress_bar.clone()).await;

            if let Some(pb) = progress_bar {
                match &outcome {
                    Ok(report) => pb.finish_with_message(format!(
                        "{}: done ({} pages, {} unique)",
                        name, report.pages_visited, report.unique_structures
                    )),
                    Err(e) => pb.finish_with_message(format!("{}: failed ({})", name, e)),
                }
            }

            (name, outcome)
        });

        handles.push(handle);
    }

    let mut reports = Vec::new();
    let mut failures = Vec::new();

    for handle in handles {
        let (name, outcome) = handle.await?;
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("Project '{}' failed: {}", name, e);
                failures.push(ProjectFailure {
                    project: name,
                    error: e,
                });
            }
        }
    }

    Ok((reports, failures))
}

/// Crawl a single project into its own metrics stream.
///
/// The page is opened before the output file is created, so a project that
/// never gets a session leaves no file behind.
async fn crawl_one<B>(
    browser: Arc<B>,
    project: Project,
    out_dir: &Path,
    budget: CrawlBudget,
    progress_bar: Option<ProgressBar>,
) -> Result<ProjectReport, CrawlError>
where
    B: Browser,
{
    let page = browser.open_page().await?;

    let output_path = out_dir.join(format!("metrics_{}.jsonl", project.name));
    let writer = Arc::new(Mutex::new(LineWriter::new(File::create(&output_path)?)));

    let record_writer = writer.clone();
    let record_path = output_path.clone();
    let record_callback: RecordCallback = Arc::new(move |record| {
        match serde_json::to_string(record) {
            Ok(line) => {
                let mut writer = record_writer.lock().unwrap();
                if let Err(e) = writeln!(writer, "{}", line) {
                    error!("Failed to append to {}: {}", record_path.display(), e);
                }
            }
            Err(e) => error!("Failed to serialize record for {}: {}", record.url, e),
        }
    });

    let mut controller = CrawlController::new(&project.name, &project.base_url, page, budget)?
        .with_record_callback(record_callback);

    if let Some(pb) = progress_bar {
        let name = project.name.clone();
        controller = controller.with_progress_callback(Arc::new(move |count, url| {
            pb.set_message(format!("{}: [{}] {}", name, count, url));
        }));
    }

    let result = controller.run().await;

    if let Err(e) = writer.lock().unwrap().flush() {
        error!("Failed to flush {}: {}", output_path.display(), e);
    }

    Ok(ProjectReport {
        project: result.project,
        pages_visited: result.pages_visited,
        unique_structures: result.unique_structures,
        output_path,
    })
}
