//! Output formatting for extraction results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: one document with every extraction and failure
//! - JSONL: one extraction per line, for building datasets

use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dataflow::{BatchReport, Extraction, Failure, Relation};

/// Output formats accepted by `--format`.
pub const FORMATS: &[&str] = &["pretty", "json", "jsonl"];

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON document.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub files_extracted: usize,
    pub files_failed: usize,
    pub files_degraded: usize,
    pub edge_count: usize,
    pub extractions: &'a [Extraction],
    pub failures: &'a [Failure],
    pub failure_counts: BTreeMap<String, usize>,
}

impl<'a> JsonReport<'a> {
    pub fn new(path: &str, config_path: Option<&str>, report: &'a BatchReport) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            path: path.to_string(),
            config: config_path.map(str::to_string),
            files_extracted: report.extractions.len(),
            files_failed: report.failures.len(),
            files_degraded: report.degraded_count(),
            edge_count: report.edge_count(),
            extractions: &report.extractions,
            failures: &report.failures,
            failure_counts: report
                .failure_counts()
                .into_iter()
                .map(|(kind, count)| (kind.to_string(), count))
                .collect(),
        }
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, config_path: Option<&str>, report: &BatchReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport::new(path, config_path, report))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// JSONL Format
// =============================================================================

/// One compact JSON object per extraction, in path order.
pub fn jsonl_lines(report: &BatchReport) -> anyhow::Result<Vec<String>> {
    report
        .extractions
        .iter()
        .map(|e| serde_json::to_string(e).map_err(anyhow::Error::from))
        .collect()
}

/// Write results in JSONL format. Failures go to stderr via logging.
pub fn write_jsonl(report: &BatchReport) -> anyhow::Result<()> {
    for line in jsonl_lines(report)? {
        println!("{}", line);
    }
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

pub fn write_pretty(path: &str, config_path: Option<&str>, report: &BatchReport, show_state: bool) {
    // Header
    println!();
    print!("  ");
    print!("{}", "dfgraph".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Path:   ".dimmed());
    println!("{}", path);
    if let Some(config) = config_path {
        print!("  {}", "Config: ".dimmed());
        println!("{}", config);
    }
    println!();

    for extraction in &report.extractions {
        write_extraction(extraction, show_state);
        println!();
    }

    if !report.failures.is_empty() {
        write_failures(&report.failures);
        println!();
    }

    write_summary(report);
    println!();
}

fn write_extraction(extraction: &Extraction, show_state: bool) {
    print!("  {}", extraction.path.bold());
    print!("  {}", format!("[{}]", extraction.language).dimmed());
    if extraction.has_parse_errors {
        print!("  {}", "(syntax errors)".yellow());
    }
    println!();

    if extraction.edges.is_empty() {
        println!("    {}", "no data-flow edges".dimmed());
    }
    for edge in &extraction.edges {
        let target = format!("{}@{}", edge.variable, edge.index);
        let relation = match edge.relation {
            Relation::ComesFrom => edge.relation.as_str().green(),
            Relation::ComputedFrom => edge.relation.as_str().blue(),
        };
        let sources: Vec<String> = edge
            .source_names
            .iter()
            .zip(&edge.source_indices)
            .map(|(name, index)| format!("{}@{}", name, index))
            .collect();
        println!("    {:<24} {:<14} {}", target, relation, sources.join(", "));
    }

    for degradation in &extraction.degradations {
        println!("    {} {}", "!".yellow(), degradation.dimmed());
    }

    if show_state {
        if let Some(state) = &extraction.state {
            println!("    {}", "final state:".dimmed());
            for (name, indices) in state {
                let indices: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                println!("      {:<22} [{}]", name, indices.join(", "));
            }
        }
    }
}

fn write_failures(failures: &[Failure]) {
    println!("  {}", "Skipped files:".bold());
    for failure in failures {
        println!(
            "    {} {}  {}",
            "✗".red(),
            failure.path,
            format!("{}: {}", failure.kind, failure.message).dimmed()
        );
    }
}

fn write_summary(report: &BatchReport) {
    if report.has_failures() {
        print!("  {}", "✗ PARTIAL".yellow());
    } else {
        print!("  {}", "✓ DONE".green());
    }
    print!(
        "  {} files, {} edges",
        report.extractions.len(),
        report.edge_count()
    );
    if report.has_failures() {
        print!("{}", format!(", {} skipped", report.failures.len()).red());
    }
    let degraded = report.degraded_count();
    if degraded > 0 {
        print!("{}", format!(" ({} degraded)", degraded).dimmed());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DfgConfig;
    use crate::dataflow::extract;

    #[test]
    fn test_json_report_counts() {
        let extraction = extract("a.py", b"a = 1\nb = a\n", "python", &DfgConfig::default()).unwrap();
        let report = BatchReport {
            extractions: vec![extraction],
            failures: Vec::new(),
        };
        let json = JsonReport::new(".", None, &report);
        assert_eq!(json.files_extracted, 1);
        assert_eq!(json.edge_count, 2);
        assert!(json.failure_counts.is_empty());
    }

    #[test]
    fn test_jsonl_one_line_per_file() {
        let config = DfgConfig::default();
        let report = BatchReport {
            extractions: vec![
                extract("a.py", b"a = 1\n", "python", &config).unwrap(),
                extract("b.js", b"let b = 2;\n", "javascript", &config).unwrap(),
            ],
            failures: Vec::new(),
        };
        let lines = jsonl_lines(&report).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| !l.contains('\n')));
    }
}
