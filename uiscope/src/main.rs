use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uiscope_core::config;
use uiscope_core::orchestrate::{OrchestrateOptions, run_projects};
use uiscope_core::report::{self, ReportFormat};
use uiscope_crawler::CdpBrowser;
use uiscope_crawler::controller::CrawlBudget;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        Some(("aggregate", primary_command)) => handle_aggregate(primary_command),
        _ => {
            command_argument_builder().print_help().ok();
        }
    }
}

async fn handle_crawl(args: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let config_path = expand_path(args.get_one::<PathBuf>("config").unwrap());
    let out_dir = expand_path(args.get_one::<PathBuf>("out").unwrap());
    let max_pages = *args.get_one::<usize>("max-pages").unwrap();
    let max_depth = *args.get_one::<usize>("max-depth").unwrap();
    let concurrency = *args.get_one::<usize>("concurrency").unwrap();
    let timeout_secs = *args.get_one::<u64>("timeout").unwrap();

    let projects = match config::load_projects(&config_path) {
        Ok(projects) => projects,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    let browser = match args.get_one::<String>("cdp") {
        Some(endpoint) => CdpBrowser::new(endpoint),
        None => CdpBrowser::from_env(),
    };

    if !quiet {
        println!(
            "\nCrawling {} project(s) via {}",
            projects.len(),
            browser.endpoint()
        );
        println!(
            "Max pages: {}  Max depth: {}  Concurrency: {}\n",
            max_pages, max_depth, concurrency
        );
    }

    let options = OrchestrateOptions {
        out_dir: out_dir.clone(),
        budget: CrawlBudget {
            max_pages,
            max_depth,
            nav_timeout: Duration::from_secs(timeout_secs),
        },
        max_concurrent: concurrency,
        show_progress_bars: !quiet,
    };

    match run_projects(Arc::new(browser), projects, options).await {
        Ok((reports, failures)) => {
            if !quiet {
                println!();
            }
            for report in &reports {
                println!(
                    "{} [{}] pages visited={}, unique UI={} -> {}",
                    "✓".green(),
                    report.project,
                    report.pages_visited,
                    report.unique_structures,
                    report.output_path.display()
                );
            }
            for failure in &failures {
                eprintln!("{} [{}] {}", "✗".red(), failure.project, failure.error);
            }

            if args.get_flag("summary") {
                run_summary(&out_dir, quiet);
            }

            if reports.is_empty() && !failures.is_empty() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red(), e);
            std::process::exit(1);
        }
    }
}

fn run_summary(out_dir: &Path, quiet: bool) {
    let files = match report::collect_metric_files(out_dir) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            return;
        }
    };

    if files.is_empty() {
        eprintln!("No metrics streams found in {}", out_dir.display());
        return;
    }

    match report::aggregate_files(&files) {
        Ok(summary) => {
            if !quiet
                && let Ok(text) = report::render(&summary, &ReportFormat::Text)
            {
                println!("{}", text);
            }

            match report::render(&summary, &ReportFormat::Csv) {
                Ok(csv) => {
                    let path = out_dir.join("summary.csv");
                    match std::fs::write(&path, csv) {
                        Ok(()) => println!("Summary saved to {}", path.display()),
                        Err(e) => eprintln!("{} Cannot write {}: {}", "✗".red(), path.display(), e),
                    }
                }
                Err(e) => eprintln!("{} {}", "✗".red(), e),
            }
        }
        Err(e) => eprintln!("{} {}", "✗".red(), e),
    }
}

fn handle_aggregate(args: &ArgMatches) {
    let files: Vec<PathBuf> = args
        .get_many::<PathBuf>("FILES")
        .unwrap()
        .map(expand_path)
        .collect();

    let format_name = args.get_one::<String>("format").unwrap();
    let format = ReportFormat::from_str(format_name).unwrap();

    let summary = match report::aggregate_files(&files) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    let rendered = match report::render(&summary, &format) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            let path = expand_path(path);
            match std::fs::write(&path, rendered) {
                Ok(()) => println!("Summary saved to {}", path.display()),
                Err(e) => {
                    eprintln!("{} Cannot write {}: {}", "✗".red(), path.display(), e);
                    std::process::exit(1);
                }
            }
        }
        None => print!("{}", rendered),
    }
}

fn expand_path(path: &PathBuf) -> PathBuf {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::tilde(raw.as_ref());
    PathBuf::from(expanded.as_ref())
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
