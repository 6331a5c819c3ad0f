//! Token-level data-flow graph construction.
//!
//! Given a tree-sitter tree and an index of its leaf tokens, this module
//! produces edges saying which earlier tokens each definition draws its
//! value from, in the GraphCodeBERT style: `comesFrom` for direct copies and
//! `computedFrom` for values derived from an expression.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Syntax tree  │────▶│ TokenIndex   │────▶│ DfgBuilder   │
//! └──────────────┘     │ (span->index)│     │ + Grammar    │
//!                      └──────────────┘     └──────────────┘
//!                                                  │ raw edges
//!                                                  ▼
//!                                           ┌──────────────┐
//!                                           │ Assembler    │
//!                                           └──────────────┘
//! ```
//!
//! Scoping is approximate: a definition inside a branch or loop stays live
//! after it, and only function parameters and locals are isolated from the
//! enclosing code.
//!
//! # Adding a New Language
//!
//! 1. Create a module in `src/dataflow/languages/`
//! 2. Implement the `Grammar` trait, mapping node kinds onto `Construct`
//! 3. Register it in `languages/mod.rs`

mod assemble;
mod builder;
mod context;
mod graph;
mod languages;
mod state;
pub mod syntax;
mod tokens;
mod traits;

use thiserror::Error;
use tree_sitter::Node;

pub use assemble::{assemble, Assembler};
pub use builder::{DfgBuilder, DEFAULT_MAX_DEPTH, LOOP_PASSES};
pub use context::{extract, BatchReport, Extraction, Failure, FailureKind, Pipeline};
pub use graph::{DfgEdge, DfgResult, Position, Relation, Source, Span};
pub use languages::{
    get_grammar, grammar_for_extension, register_grammars, registered_extensions,
    registered_languages, CSharpGrammar, GoGrammar, JavaGrammar, JavaScriptGrammar,
    LanguageTag, PhpGrammar, PythonGrammar, RubyGrammar,
};
pub use state::VariableState;
pub use tokens::{Token, TokenIndex};
pub use traits::{
    Binding, BindingKind, Branch, Construct, ForEach, Function, Grammar, Loop, Parameter,
    ParsedFile,
};

/// Data-flow analysis errors.
///
/// `UnsupportedLanguage` fails the call. The other two are recovered locally
/// and reported through [`DfgResult::degradations`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum DfgError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("leaf at {0} is missing from the token index")]
    MalformedSpan(Span),
    #[error("nesting deeper than {limit} at {kind} ({span}), subtree skipped")]
    RecursionLimitExceeded {
        limit: usize,
        kind: String,
        span: Span,
    },
}

/// Build the raw data-flow graph of `root`.
///
/// Deterministic for identical inputs. Edges come back in traversal order;
/// pass them through [`assemble`] for the deduplicated graph.
pub fn build_dfg(root: Node, tokens: &TokenIndex, language: &str) -> Result<DfgResult, DfgError> {
    let grammar = get_grammar(language)?;
    Ok(DfgBuilder::new(grammar, tokens).build(root))
}

/// Like [`build_dfg`], seeded with the state left by a previous sequence.
pub fn build_dfg_with_state(
    root: Node,
    tokens: &TokenIndex,
    language: &str,
    state: VariableState,
) -> Result<DfgResult, DfgError> {
    let grammar = get_grammar(language)?;
    Ok(DfgBuilder::new(grammar, tokens).build_with_state(root, state))
}
