//! Aggregation of metrics streams into per-project and overall statistics.

use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use uiscope_crawler::MetricsRecord;

/// Key used for the group spanning every record.
pub const OVERALL_GROUP: &str = "_overall";

#[derive(Debug, Clone, Serialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Cannot read metrics file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path} line {line}: {reason}")]
    MalformedRecord {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No metrics records to aggregate")]
    NoRecords,
}

/// Descriptive statistics over one numeric field of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub total: u64,
    pub mean: f64,
    pub max: u64,
    pub min: u64,
    pub count: usize,
}

/// Statistics for every metric field within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub total_dom_elements: FieldStats,
    pub num_interactive_elements: FieldStats,
    pub dom_tree_depth: FieldStats,
}

/// The aggregate document: one overall group plus one group per project.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub generated_at: String,
    pub overall: GroupStats,
    pub projects: BTreeMap<String, GroupStats>,
}

struct FieldAccum {
    sum: u64,
    max: u64,
    min: u64,
    count: usize,
}

impl FieldAccum {
    fn new() -> Self {
        Self {
            sum: 0,
            max: 0,
            min: u64::MAX,
            count: 0,
        }
    }

    fn update(&mut self, value: u64) {
        self.sum += value;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
        self.count += 1;
    }

    fn finalize(&self) -> FieldStats {
        let mean = if self.count == 0 {
            0.0
        } else {
            let raw = self.sum as f64 / self.count as f64;
            (raw * 100.0).round() / 100.0
        };
        FieldStats {
            total: self.sum,
            mean,
            max: self.max,
            min: if self.count == 0 { 0 } else { self.min },
            count: self.count,
        }
    }
}

struct GroupAccum {
    total_dom_elements: FieldAccum,
    num_interactive_elements: FieldAccum,
    dom_tree_depth: FieldAccum,
}

impl GroupAccum {
    fn new() -> Self {
        Self {
            total_dom_elements: FieldAccum::new(),
            num_interactive_elements: FieldAccum::new(),
            dom_tree_depth: FieldAccum::new(),
        }
    }

    fn update(&mut self, record: &MetricsRecord) {
        self.total_dom_elements.update(record.total_dom_elements);
        self.num_interactive_elements
            .update(record.num_interactive_elements);
        self.dom_tree_depth.update(record.dom_tree_depth);
    }

    fn finalize(&self) -> GroupStats {
        GroupStats {
            total_dom_elements: self.total_dom_elements.finalize(),
            num_interactive_elements: self.num_interactive_elements.finalize(),
            dom_tree_depth: self.dom_tree_depth.finalize(),
        }
    }
}

/// Reduce records into the summary document. A commutative fold over a
/// sorted group map, so record order never changes the output.
pub fn aggregate_records<I>(records: I) -> Result<Summary, ReportError>
where
    I: IntoIterator<Item = MetricsRecord>,
{
    let mut overall = GroupAccum::new();
    let mut projects: BTreeMap<String, GroupAccum> = BTreeMap::new();
    let mut seen = 0usize;

    for record in records {
        seen += 1;
        overall.update(&record);
        projects
            .entry(record.project.clone())
            .or_insert_with(GroupAccum::new)
            .update(&record);
    }

    if seen == 0 {
        return Err(ReportError::NoRecords);
    }

    Ok(Summary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        overall: overall.finalize(),
        projects: projects
            .into_iter()
            .map(|(name, accum)| (name, accum.finalize()))
            .collect(),
    })
}

/// Parse one JSONL metrics stream. Blank lines are tolerated; anything else
/// that fails to parse is an error, not a silent drop.
pub fn read_metrics_file(path: &Path) -> Result<Vec<MetricsRecord>, ReportError> {
    let file = std::fs::File::open(path).map_err(|e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: MetricsRecord =
            serde_json::from_str(&line).map_err(|e| ReportError::MalformedRecord {
                path: path.display().to_string(),
                line: idx + 1,
                reason: e.to_string(),
            })?;
        records.push(record);
    }

    Ok(records)
}

/// Aggregate several metrics files into one summary.
pub fn aggregate_files(paths: &[PathBuf]) -> Result<Summary, ReportError> {
    let mut records = Vec::new();
    for path in paths {
        records.extend(read_metrics_file(path)?);
    }
    aggregate_records(records)
}

/// Find `metrics_*.jsonl` streams under an output directory, sorted by name.
pub fn collect_metric_files(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ReportError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("metrics_") && n.ends_with(".jsonl"))
                .unwrap_or(false)
        })
        .collect();

    paths.sort();
    Ok(paths)
}

/// Render the summary in the requested format.
pub fn render(summary: &Summary, format: &ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Text => Ok(render_text(summary)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        ReportFormat::Csv => Ok(render_csv(summary)),
    }
}

fn field_rows(stats: &GroupStats) -> [(&'static str, &FieldStats); 3] {
    [
        ("total_dom_elements", &stats.total_dom_elements),
        ("num_interactive_elements", &stats.num_interactive_elements),
        ("dom_tree_depth", &stats.dom_tree_depth),
    ]
}

fn push_group(report: &mut String, title: &str, stats: &GroupStats) {
    report.push_str(&format!("\n=== {} ===\n", title.bold()));
    for (name, field) in field_rows(stats) {
        report.push_str(&format!(
            "{:25}: total={:>8} | mean={:>8.2} | max={:>6} | min={:>6} | n={}\n",
            name, field.total, field.mean, field.max, field.min, field.count
        ));
    }
    report.push_str(&"-".repeat(60));
    report.push('\n');
}

fn render_text(summary: &Summary) -> String {
    let mut report = String::new();
    push_group(&mut report, "OVERALL", &summary.overall);
    for (project, stats) in &summary.projects {
        push_group(&mut report, &format!("PROJECT: {}", project), stats);
    }
    report
}

fn render_csv(summary: &Summary) -> String {
    let mut csv = String::from("group,field,total,mean,max,min,count\n");

    let mut push_rows = |group: &str, stats: &GroupStats| {
        for (name, field) in field_rows(stats) {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                group, name, field.total, field.mean, field.max, field.min, field.count
            ));
        }
    };

    push_rows(OVERALL_GROUP, &summary.overall);
    for (project, stats) in &summary.projects {
        push_rows(project, stats);
    }
    csv
}
