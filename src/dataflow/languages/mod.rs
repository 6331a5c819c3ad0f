//! Language-specific grammar tables.

mod csharp;
mod go;
mod java;
mod javascript;
mod php;
mod python;
mod ruby;

pub use csharp::CSharpGrammar;
pub use go::GoGrammar;
pub use java::JavaGrammar;
pub use javascript::JavaScriptGrammar;
pub use php::PhpGrammar;
pub use python::PythonGrammar;
pub use ruby::RubyGrammar;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tracing::debug;

use super::{DfgError, Grammar};

/// Static storage for the C# grammar.
static CSHARP_GRAMMAR: OnceCell<CSharpGrammar> = OnceCell::new();

/// Static storage for the Go grammar.
static GO_GRAMMAR: OnceCell<GoGrammar> = OnceCell::new();

/// Static storage for the Java grammar.
static JAVA_GRAMMAR: OnceCell<JavaGrammar> = OnceCell::new();

/// Static storage for the JavaScript grammar.
static JAVASCRIPT_GRAMMAR: OnceCell<JavaScriptGrammar> = OnceCell::new();

/// Static storage for the PHP grammar.
static PHP_GRAMMAR: OnceCell<PhpGrammar> = OnceCell::new();

/// Static storage for the Python grammar.
static PYTHON_GRAMMAR: OnceCell<PythonGrammar> = OnceCell::new();

/// Static storage for the Ruby grammar.
static RUBY_GRAMMAR: OnceCell<RubyGrammar> = OnceCell::new();

/// Whether grammars have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Canonical language tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageTag {
    Python,
    Java,
    CSharp,
    JavaScript,
    Php,
    Ruby,
    Go,
}

impl LanguageTag {
    pub const ALL: [LanguageTag; 7] = [
        LanguageTag::Python,
        LanguageTag::Java,
        LanguageTag::CSharp,
        LanguageTag::JavaScript,
        LanguageTag::Php,
        LanguageTag::Ruby,
        LanguageTag::Go,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTag::Python => "python",
            LanguageTag::Java => "java",
            LanguageTag::CSharp => "c_sharp",
            LanguageTag::JavaScript => "javascript",
            LanguageTag::Php => "php",
            LanguageTag::Ruby => "ruby",
            LanguageTag::Go => "go",
        }
    }

    /// Accepted spellings besides the canonical tag.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            LanguageTag::Python => &["py"],
            LanguageTag::Java => &[],
            LanguageTag::CSharp => &["c-sharp", "csharp", "cs"],
            LanguageTag::JavaScript => &["js"],
            LanguageTag::Php => &[],
            LanguageTag::Ruby => &["rb"],
            LanguageTag::Go => &["golang"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(LanguageTag::Python),
            "java" => Some(LanguageTag::Java),
            "cs" => Some(LanguageTag::CSharp),
            "js" | "jsx" | "mjs" | "cjs" => Some(LanguageTag::JavaScript),
            "php" => Some(LanguageTag::Php),
            "rb" => Some(LanguageTag::Ruby),
            "go" => Some(LanguageTag::Go),
            _ => None,
        }
    }

    /// The grammar table for this tag.
    pub fn grammar(&self) -> &'static dyn Grammar {
        register_grammars();

        match self {
            LanguageTag::Python => PYTHON_GRAMMAR.get_or_init(PythonGrammar::new),
            LanguageTag::Java => JAVA_GRAMMAR.get_or_init(JavaGrammar::new),
            LanguageTag::CSharp => CSHARP_GRAMMAR.get_or_init(CSharpGrammar::new),
            LanguageTag::JavaScript => JAVASCRIPT_GRAMMAR.get_or_init(JavaScriptGrammar::new),
            LanguageTag::Php => PHP_GRAMMAR.get_or_init(PhpGrammar::new),
            LanguageTag::Ruby => RUBY_GRAMMAR.get_or_init(RubyGrammar::new),
            LanguageTag::Go => GO_GRAMMAR.get_or_init(GoGrammar::new),
        }
    }
}

impl FromStr for LanguageTag {
    type Err = DfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        LanguageTag::ALL
            .into_iter()
            .find(|t| t.as_str() == tag || t.aliases().contains(&tag.as_str()))
            .ok_or_else(|| DfgError::UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Register all grammar tables.
///
/// Idempotent; lookups call it on demand.
pub fn register_grammars() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    CSHARP_GRAMMAR.get_or_init(CSharpGrammar::new);
    GO_GRAMMAR.get_or_init(GoGrammar::new);
    JAVA_GRAMMAR.get_or_init(JavaGrammar::new);
    JAVASCRIPT_GRAMMAR.get_or_init(JavaScriptGrammar::new);
    PHP_GRAMMAR.get_or_init(PhpGrammar::new);
    PYTHON_GRAMMAR.get_or_init(PythonGrammar::new);
    RUBY_GRAMMAR.get_or_init(RubyGrammar::new);

    debug!(count = LanguageTag::ALL.len(), "registered data-flow grammars");
}

/// Get the grammar for a language tag or alias.
pub fn get_grammar(tag: &str) -> Result<&'static dyn Grammar, DfgError> {
    tag.parse::<LanguageTag>().map(|t| t.grammar())
}

/// Get the grammar for a file extension (without dot).
pub fn grammar_for_extension(ext: &str) -> Option<&'static dyn Grammar> {
    LanguageTag::from_extension(ext).map(|t| t.grammar())
}

/// All canonical language tags.
pub fn registered_languages() -> Vec<String> {
    LanguageTag::ALL.iter().map(|t| t.as_str().to_string()).collect()
}

/// All file extensions with a grammar.
pub fn registered_extensions() -> Vec<String> {
    LanguageTag::ALL
        .iter()
        .flat_map(|t| t.grammar().file_extensions().iter())
        .map(|ext| ext.to_string())
        .collect()
}
