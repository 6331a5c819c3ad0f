//! dfgraph - token-level data-flow graphs from tree-sitter syntax trees.
//!
//! For every variable definition in a source file, dfgraph reports which
//! earlier tokens the value is drawn from (`comesFrom` for copies,
//! `computedFrom` for derived values). The output feeds code models in the
//! GraphCodeBERT style.
//!
//! # Architecture
//!
//! - `dataflow`: token index, the recursive builder, graph assembly and the
//!   per-language grammar tables
//! - `config`: YAML extraction settings
//! - `report`: Output formatting (pretty, JSON, JSONL)
//! - `cli`: the `dfgraph` command
//!
//! # Adding a New Language
//!
//! See `src/dataflow/languages/` for examples. Implement the `Grammar`
//! trait and register it in `languages/mod.rs`.

pub mod cli;
pub mod config;
pub mod dataflow;
pub mod report;

pub use config::DfgConfig;
pub use dataflow::{
    assemble, build_dfg, build_dfg_with_state, extract, get_grammar, BatchReport, DfgEdge,
    DfgError, DfgResult, Extraction, Grammar, LanguageTag, Pipeline, Relation, TokenIndex,
    VariableState,
};

/// Initialize all subsystems.
///
/// Call this once at startup.
pub fn init() {
    dataflow::register_grammars();
}
