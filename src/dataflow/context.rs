//! File-level extraction and the parallel batch runner.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::DfgConfig;

use super::{get_grammar, Assembler, DfgBuilder, DfgEdge, DfgError, LanguageTag, TokenIndex};

/// Worker stack size; the builder recurses once per nesting level up to
/// `max_depth`.
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "vendor", "target", "__pycache__"];

/// The data-flow graph of one source file.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub path: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    pub edges: Vec<DfgEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<BTreeMap<String, Vec<usize>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<String>,
    /// tree-sitter recovered from syntax errors while parsing.
    pub has_parse_errors: bool,
}

impl Extraction {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty() || self.has_parse_errors
    }
}

/// Parse, index, build and assemble one source text.
pub fn extract(
    path: &str,
    source: &[u8],
    language: &str,
    config: &DfgConfig,
) -> anyhow::Result<Extraction> {
    let grammar = get_grammar(language)?;
    let parsed = grammar.parse_source(path, source)?;
    let root = parsed.tree.root_node();

    let tokens = TokenIndex::from_tree(root, &parsed.source, grammar);
    let result = DfgBuilder::new(grammar, &tokens)
        .max_depth(config.max_depth)
        .build(root);
    let edges = Assembler::new(config.dedupe).assemble(&result.edges);

    debug!(
        path,
        language = grammar.language_id(),
        tokens = tokens.len(),
        raw_edges = result.edges.len(),
        edges = edges.len(),
        "extracted data-flow graph"
    );

    Ok(Extraction {
        path: path.to_string(),
        language: grammar.language_id().to_string(),
        tokens: config.include_tokens.then(|| tokens.code_tokens()),
        edges,
        state: config.include_state.then_some(result.state),
        degradations: result.degradations.iter().map(|d| d.to_string()).collect(),
        has_parse_errors: parsed.has_errors(),
    })
}

/// Why a file produced no extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedLanguage,
    Read,
    Parse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::UnsupportedLanguage => write!(f, "unsupported_language"),
            FailureKind::Read => write!(f, "read"),
            FailureKind::Parse => write!(f, "parse"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a batch run. Both lists are sorted by path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub extractions: Vec<Extraction>,
    pub failures: Vec<Failure>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failure_counts(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Files extracted with local recoveries.
    pub fn degraded_count(&self) -> usize {
        self.extractions.iter().filter(|e| e.is_degraded()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.extractions.iter().map(|e| e.edges.len()).sum()
    }
}

/// Runs [`extract`] over many files in parallel.
pub struct Pipeline {
    config: DfgConfig,
    language: Option<LanguageTag>,
    threads: Option<usize>,
}

impl Pipeline {
    pub fn new(config: DfgConfig) -> Self {
        Self {
            config,
            language: None,
            threads: None,
        }
    }

    /// Force one language instead of inferring it from extensions.
    pub fn language(mut self, language: Option<LanguageTag>) -> Self {
        self.language = language;
        self
    }

    /// Size of the worker pool (`None` = rayon's default).
    pub fn threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads.filter(|&n| n > 0);
        self
    }

    pub fn config(&self) -> &DfgConfig {
        &self.config
    }

    /// Collect the source files under `root`.
    ///
    /// A file path is returned as-is. Directories are walked, skipping hidden
    /// entries (unless configured), dependency directories, excluded globs,
    /// and files whose language is unknown or filtered out.
    pub fn collect_files(&self, root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        if !root.is_dir() {
            anyhow::bail!("path does not exist: {}", root.display());
        }

        let allowed = self.config.language_filter()?;
        let include_hidden = self.config.include_hidden;
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                if !include_hidden && name.starts_with('.') {
                    return false;
                }
                !(e.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
            })
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if self.config.is_path_excluded(relative) {
                continue;
            }

            let Some(tag) = self.language.or_else(|| tag_for_path(path)) else {
                continue;
            };
            if allowed.as_ref().is_some_and(|tags| !tags.contains(&tag)) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Extract every file. Failures are collected, never fatal.
    pub fn run(&self, files: &[PathBuf]) -> BatchReport {
        let builder = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads.unwrap_or(0))
            .stack_size(WORKER_STACK_SIZE);
        let pool = match builder.build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "could not build worker pool, using global pool");
                None
            }
        };

        let outcomes: Vec<Result<Extraction, Failure>> = match pool {
            Some(pool) => pool.install(|| self.process(files)),
            None => self.process(files),
        };

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(extraction) => report.extractions.push(extraction),
                Err(failure) => report.failures.push(failure),
            }
        }
        report.extractions.sort_by(|a, b| a.path.cmp(&b.path));
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));

        for (kind, count) in report.failure_counts() {
            warn!(%kind, count, "files skipped");
        }
        info!(
            files = files.len(),
            extracted = report.extractions.len(),
            failed = report.failures.len(),
            degraded = report.degraded_count(),
            edges = report.edge_count(),
            "batch complete"
        );

        report
    }

    fn process(&self, files: &[PathBuf]) -> Vec<Result<Extraction, Failure>> {
        files.par_iter().map(|path| self.process_file(path)).collect()
    }

    fn process_file(&self, path: &Path) -> Result<Extraction, Failure> {
        let shown = path.display().to_string();
        let fail = |kind: FailureKind, message: String| Failure {
            path: shown.clone(),
            kind,
            message,
        };

        let tag = self.language.or_else(|| tag_for_path(path)).ok_or_else(|| {
            fail(
                FailureKind::UnsupportedLanguage,
                format!("no grammar for {}", shown),
            )
        })?;

        let source = fs::read(path).map_err(|e| fail(FailureKind::Read, e.to_string()))?;

        extract(&shown, &source, tag.as_str(), &self.config).map_err(|e| {
            let kind = match e.downcast_ref::<DfgError>() {
                Some(DfgError::UnsupportedLanguage(_)) => FailureKind::UnsupportedLanguage,
                _ => FailureKind::Parse,
            };
            debug!(path = %shown, error = %e, "extraction failed");
            fail(kind, e.to_string())
        })
    }
}

fn tag_for_path(path: &Path) -> Option<LanguageTag> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(LanguageTag::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_respects_config() {
        let config = DfgConfig {
            include_tokens: false,
            include_state: false,
            ..Default::default()
        };
        let extraction = extract("a.py", b"x = 1\ny = x\n", "py", &config).unwrap();
        assert_eq!(extraction.language, "python");
        assert!(extraction.tokens.is_none());
        assert!(extraction.state.is_none());
        assert_eq!(extraction.edges.len(), 2);
        assert!(!extraction.is_degraded());
    }

    #[test]
    fn test_extract_unknown_language() {
        let err = extract("a.f", b"x", "fortran", &DfgConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DfgError>(),
            Some(DfgError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_extract_flags_syntax_errors() {
        let extraction = extract("b.py", b"x = (1 +\n", "python", &DfgConfig::default()).unwrap();
        assert!(extraction.has_parse_errors);
    }

    #[test]
    fn test_collect_skips_hidden_vendor_and_unknown() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("src/a.py"), "a = 1\n").unwrap();
        fs::write(root.join("src/B.java"), "class B {}\n").unwrap();
        fs::write(root.join("src/notes.txt"), "x").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "let a = 1;\n").unwrap();
        fs::write(root.join(".cache/c.py"), "c = 1\n").unwrap();

        let files = Pipeline::new(DfgConfig::default()).collect_files(root).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["B.java", "a.py"]);
    }

    #[test]
    fn test_collect_applies_language_filter_and_excludes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("gen")).unwrap();
        fs::write(root.join("keep.py"), "a = 1\n").unwrap();
        fs::write(root.join("gen/skip.py"), "a = 1\n").unwrap();
        fs::write(root.join("other.go"), "package main\n").unwrap();

        let config = DfgConfig {
            languages: vec!["python".to_string()],
            excluded_paths: vec!["gen/**".to_string()],
            ..Default::default()
        };
        let files = Pipeline::new(config).collect_files(root).unwrap();
        assert_eq!(files, vec![root.join("keep.py")]);
    }

    #[test]
    fn test_run_collects_failures_without_aborting() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.rb");
        fs::write(&good, "a = 1\nb = a\n").unwrap();
        let missing = temp.path().join("missing.py");
        let unknown = temp.path().join("data.csv");
        fs::write(&unknown, "1,2\n").unwrap();

        let report = Pipeline::new(DfgConfig::default())
            .threads(Some(2))
            .run(&[missing.clone(), good.clone(), unknown]);

        assert_eq!(report.extractions.len(), 1);
        assert_eq!(report.extractions[0].language, "ruby");
        let counts = report.failure_counts();
        assert_eq!(counts.get(&FailureKind::Read), Some(&1));
        assert_eq!(counts.get(&FailureKind::UnsupportedLanguage), Some(&1));
    }

    #[test]
    fn test_run_survives_nesting_at_depth_ceiling() {
        let temp = TempDir::new().unwrap();
        let deep = temp.path().join("deep.py");
        let source = format!("y = {}a{}\nz = 1\n", "(".repeat(5000), ")".repeat(5000));
        fs::write(&deep, source).unwrap();

        let config = DfgConfig {
            max_depth: crate::config::MAX_DEPTH_CEILING,
            ..Default::default()
        };
        let report = Pipeline::new(config).threads(Some(1)).run(&[deep]);

        assert_eq!(report.extractions.len(), 1);
        assert!(report.extractions[0].is_degraded());
        assert!(report.extractions[0]
            .state
            .as_ref()
            .is_some_and(|state| state.contains_key("z")));
    }
}
