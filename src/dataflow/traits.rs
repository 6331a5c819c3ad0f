//! Core traits for per-language data-flow tables.

use tree_sitter::{Language, Node, Parser};

/// Holds a parsed tree-sitter tree and associated metadata.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for token text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Whether tree-sitter had to insert ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// How a binding construct relates its targets to its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `x = y`
    Assignment,
    /// `x += y`: the target also reads its own prior definitions.
    Compound,
    /// `int x = y`, `var x = y`, `x := y`: binds even without a value.
    Declaration,
}

/// Targets defined from values. When both lists have the same length they
/// pair up element-wise (`a, b = b, a`), otherwise every target draws from
/// every value.
#[derive(Debug, Clone)]
pub struct Binding<'t> {
    pub kind: BindingKind,
    pub targets: Vec<Node<'t>>,
    pub values: Vec<Node<'t>>,
}

/// if/else chains, switch and match statements.
#[derive(Debug, Clone)]
pub struct Branch<'t> {
    /// Evaluated once against the incoming state.
    pub condition: Vec<Node<'t>>,
    /// Each arm starts from the post-condition state.
    pub arms: Vec<Vec<Node<'t>>>,
    /// Whether some arm always runs (an `else` or `default` is present).
    pub exhaustive: bool,
}

/// `for x in xs` style iteration.
#[derive(Debug, Clone)]
pub struct ForEach<'t> {
    pub targets: Vec<Node<'t>>,
    pub iterable: Option<Node<'t>>,
    pub body: Vec<Node<'t>>,
    /// Visited once after the loop (Python's `for ... else`).
    pub tail: Vec<Node<'t>>,
    /// Targets are local to the body (Ruby block parameters); everything
    /// else the body defines stays live afterwards.
    pub scoped: bool,
}

/// Condition-driven loops and three-clause `for`.
#[derive(Debug, Clone)]
pub struct Loop<'t> {
    /// Runs once before the loop (the `for` initializer).
    pub setup: Vec<Node<'t>>,
    /// Condition, body and update, in evaluation order.
    pub repeated: Vec<Node<'t>>,
    pub tail: Vec<Node<'t>>,
}

/// A formal parameter; `name` may be a destructuring pattern.
#[derive(Debug, Clone)]
pub struct Parameter<'t> {
    pub name: Node<'t>,
    pub default: Option<Node<'t>>,
}

/// Function, method, lambda and block definitions.
#[derive(Debug, Clone)]
pub struct Function<'t> {
    pub name: Option<Node<'t>>,
    pub params: Vec<Parameter<'t>>,
    pub body: Vec<Node<'t>>,
}

/// The canonical pattern a syntax node maps onto.
///
/// Grammars decide which node kinds produce which variant and where the
/// operands live; the builder implements each variant once.
#[derive(Debug, Clone)]
pub enum Construct<'t> {
    Bind(Binding<'t>),
    /// `i++` / `--i`: every name in the operand is redefined from its own
    /// previous value.
    Update(Node<'t>),
    Branch(Branch<'t>),
    ForEach(ForEach<'t>),
    Loop(Loop<'t>),
    Function(Function<'t>),
    /// Children analyzed in a fixed order, `first` before `rest`
    /// (comprehension clauses before the element expression).
    Ordered {
        first: Vec<Node<'t>>,
        rest: Vec<Node<'t>>,
    },
    /// Anything without a pattern: recurse into the children.
    Other,
}

/// Language-specific node-kind table.
///
/// Each supported grammar implements this trait; the builder algorithm
/// itself is language-agnostic.
pub trait Grammar: Send + Sync {
    /// Canonical language tag (e.g., "python", "c_sharp").
    fn language_id(&self) -> &'static str;

    /// File extensions this grammar handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// The tree-sitter language.
    fn language(&self) -> &Language;

    /// Leaf kinds that name variables.
    fn is_identifier(&self, kind: &str) -> bool;

    /// Non-leaf kinds indexed as one token (string literals).
    fn is_atomic(&self, kind: &str) -> bool;

    fn is_comment(&self, kind: &str) -> bool;

    /// Member-access kinds that keep an operand a plain reference
    /// (`a.b` is copied, not computed).
    fn member_access_kinds(&self) -> &'static [&'static str] {
        &[]
    }

    /// Identifiers that label something rather than read a variable
    /// (keyword-argument names, object literal keys).
    fn is_label(&self, _node: Node) -> bool {
        false
    }

    /// Map a node onto its data-flow pattern.
    fn classify<'t>(&self, node: Node<'t>) -> Construct<'t>;

    /// Parse source text into a tree.
    ///
    /// Partial parse errors still produce a tree with ERROR nodes.
    fn parse_source(&self, path: &str, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = Parser::new();
        parser.set_language(self.language())?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            anyhow::anyhow!("failed to parse {} source: {}", self.language_id(), path)
        })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string(),
        })
    }

    /// Check if this grammar handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
