use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("uiscope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("uiscope")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress progress bars and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl every configured project through the remote browser and collect \
                UI complexity metrics.",
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("YAML mapping of project name to base URL")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .default_value("projects.yaml"),
                )
                .arg(
                    arg!(-o --"out" <DIR>)
                        .required(false)
                        .help("Directory for per-project metrics streams")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .default_value("ui_metrics"),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Max pages to visit per project")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("120"),
                )
                .arg(
                    arg!(--"max-depth" <NUM>)
                        .required(false)
                        .help("Max link depth from the base URL")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"cdp" <ENDPOINT>)
                        .required(false)
                        .help(
                            "Remote debugging endpoint (default: CDP_ENDPOINT env var or \
                        http://localhost:9222)",
                        ),
                )
                .arg(
                    arg!(-j --"concurrency" <NUM>)
                        .required(false)
                        .help("Max projects crawled at once")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-page navigation timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"summary")
                        .required(false)
                        .help("Aggregate the output directory once all crawls complete")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("aggregate")
                .about("Aggregate existing metrics streams into a summary document.")
                .arg(
                    arg!(<FILES>...)
                        .help("metrics_*.jsonl files to aggregate")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Summary format: text, json, csv")
                        .value_parser(["text", "json", "csv"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the summary to a file (default: print to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
