//! Integration tests for data-flow extraction across languages.
//!
//! These tests parse the fixtures under `testdata/` and check the graph
//! properties every grammar must satisfy.

use std::path::PathBuf;

use dfgraph::dataflow::{
    assemble, build_dfg, build_dfg_with_state, get_grammar, DfgError, DfgResult, LanguageTag,
    Pipeline, Relation, TokenIndex, VariableState,
};
use dfgraph::DfgConfig;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

/// Every fixture with its language tag.
const FIXTURES: &[(&str, &str)] = &[
    ("loop.py", "python"),
    ("branch.py", "python"),
    ("scope.py", "python"),
    ("Accumulator.java", "java"),
    ("Program.cs", "c_sharp"),
    ("counter.js", "javascript"),
    ("cart.php", "php"),
    ("swap.rb", "ruby"),
    ("sum.go", "go"),
];

fn analyze_source(source: &[u8], language: &str) -> (TokenIndex, DfgResult) {
    let grammar = get_grammar(language).expect("language should be supported");
    let parsed = grammar
        .parse_source("fixture", source)
        .expect("fixture should parse");
    let root = parsed.tree.root_node();
    let tokens = TokenIndex::from_tree(root, &parsed.source, grammar);
    let result = build_dfg(root, &tokens, language).expect("build should succeed");
    (tokens, result)
}

fn analyze(fixture: &str, language: &str) -> (TokenIndex, DfgResult) {
    let source = std::fs::read(testdata_path().join(fixture)).expect("fixture should exist");
    analyze_source(&source, language)
}

fn indices_of(tokens: &TokenIndex, text: &str) -> Vec<usize> {
    tokens
        .iter()
        .filter(|t| t.text == text)
        .map(|t| t.index)
        .collect()
}

// =============================================================================
// Properties shared by all grammars
// =============================================================================

#[test]
fn test_deterministic_for_every_language() {
    for (fixture, language) in FIXTURES {
        let (_, first) = analyze(fixture, language);
        let (_, second) = analyze(fixture, language);
        assert_eq!(first.edges, second.edges, "{fixture}: edges differ");
        assert_eq!(first.state, second.state, "{fixture}: state differs");
    }
}

#[test]
fn test_no_dangling_references() {
    for (fixture, language) in FIXTURES {
        let (tokens, result) = analyze(fixture, language);
        for edge in &result.edges {
            assert!(tokens.contains_index(edge.index), "{fixture}: {edge}");
            for index in &edge.source_indices {
                assert!(tokens.contains_index(*index), "{fixture}: {edge}");
            }
        }
        for indices in result.state.values() {
            assert!(indices.iter().all(|i| tokens.contains_index(*i)));
        }
    }
}

#[test]
fn test_assembled_edges_have_sources_and_are_stable() {
    for (fixture, language) in FIXTURES {
        let (_, result) = analyze(fixture, language);
        let assembled = assemble(&result.edges);
        assert!(!assembled.is_empty(), "{fixture}: no edges");
        assert!(assembled.iter().all(|e| e.has_sources()));
        assert_eq!(assemble(&assembled), assembled, "{fixture}: not idempotent");
    }
}

#[test]
fn test_edges_reference_names_of_their_tokens() {
    for (fixture, language) in FIXTURES {
        let (tokens, result) = analyze(fixture, language);
        for edge in &result.edges {
            let token = tokens.token(edge.index).expect("index exists");
            assert_eq!(token.text, edge.variable, "{fixture}: {edge}");
        }
    }
}

#[test]
fn test_clean_fixtures_do_not_degrade() {
    for (fixture, language) in FIXTURES {
        let (_, result) = analyze(fixture, language);
        assert!(result.degradations.is_empty(), "{fixture}: {:?}", result.degradations);
    }
}

// =============================================================================
// Python reference behavior
// =============================================================================

#[test]
fn test_loop_self_dependency() {
    let (tokens, result) = analyze("loop.py", "python");
    let totals = indices_of(&tokens, "total");

    let inner = result
        .edges_for("total")
        .find(|e| e.index == totals[1])
        .expect("loop assignment edge");
    assert_eq!(inner.relation, Relation::ComputedFrom);
    assert!(inner.source_indices.contains(&totals[1]));
    assert!(inner.source_indices.contains(&totals[0]));

    let product = result.edges_for("result").next().expect("result edge");
    assert_eq!(product.relation, Relation::ComputedFrom);
    assert!(product.has_source_named("total"));
}

#[test]
fn test_branch_union() {
    let (tokens, result) = analyze("branch.py", "python");
    let xs = indices_of(&tokens, "x");

    assert_eq!(result.state["x"], vec![xs[0], xs[1]]);
    let y = result.edges_for("y").next().expect("y edge");
    assert_eq!(y.source_indices, vec![xs[0], xs[1]]);
}

#[test]
fn test_scope_isolation() {
    let (_, result) = analyze("scope.py", "python");
    for local in ["values", "factor", "out", "v"] {
        assert!(!result.state.contains_key(local), "{local} leaked");
    }
    for global in ["scale", "data", "scaled"] {
        assert!(result.state.contains_key(global), "{global} missing");
    }
}

#[test]
fn test_seeded_state_links_sequences() {
    let (_, first) = analyze_source(b"base = 10\n", "python");
    let grammar = get_grammar("python").unwrap();
    let parsed = grammar.parse_source("second", b"derived = base + 1\n").unwrap();
    let root = parsed.tree.root_node();
    let tokens = TokenIndex::from_tree(root, &parsed.source, grammar);

    let result =
        build_dfg_with_state(root, &tokens, "python", VariableState::from(first.state)).unwrap();
    let derived = result.edges_for("derived").next().unwrap();
    assert_eq!(derived.source_names, vec!["base", "1"]);
    assert_eq!(derived.source_indices[0], 0);
}

// =============================================================================
// Other grammars
// =============================================================================

#[test]
fn test_java_branch_inside_loop() {
    let (tokens, result) = analyze("Accumulator.java", "java");
    let totals = indices_of(&tokens, "total");
    let returned = result
        .edges_for("total")
        .find(|e| e.index == totals[4])
        .expect("return read edge");
    assert_eq!(returned.relation, Relation::ComesFrom);
    assert_eq!(returned.source_indices, vec![totals[2], totals[3]]);
}

#[test]
fn test_csharp_decrement_and_member_access() {
    let (tokens, result) = analyze("Program.cs", "c_sharp");
    let ns = indices_of(&tokens, "n");

    let decl = result.edges_for("n").find(|e| e.index == ns[0]).unwrap();
    assert_eq!(decl.relation, Relation::ComesFrom);
    assert!(decl.has_source_named("args"));

    let decrement = result.edges_for("n").find(|e| e.index == ns[3]).unwrap();
    assert_eq!(decrement.relation, Relation::ComputedFrom);
    assert_eq!(decrement.source_indices, vec![ns[0], ns[3]]);
}

#[test]
fn test_javascript_object_literal_reads_loop_result() {
    let (tokens, result) = analyze("counter.js", "javascript");
    let counts = indices_of(&tokens, "count");
    let done = result.edges_for("done").next().unwrap();
    assert_eq!(done.source_names, vec!["count"]);
    assert_eq!(done.source_indices, vec![counts[2]]);
    assert!(!result.state.contains_key("n"));
}

#[test]
fn test_ruby_parallel_assignment() {
    let (tokens, result) = analyze("swap.rb", "ruby");
    let a = indices_of(&tokens, "a");
    let b = indices_of(&tokens, "b");
    let c = result.edges_for("c").next().unwrap();
    assert_eq!(c.relation, Relation::ComputedFrom);
    assert_eq!(c.source_indices, vec![a[1], b[1]]);
}

#[test]
fn test_go_range_and_compound() {
    let (tokens, result) = analyze("sum.go", "go");
    let x = indices_of(&tokens, "x")[0];
    let edge = result.edges_for("x").find(|e| e.index == x).unwrap();
    assert_eq!(edge.source_names, vec!["xs"]);

    let totals = indices_of(&tokens, "total");
    let compound = result.edges_for("total").find(|e| e.index == totals[1]).unwrap();
    assert!(compound.source_indices.contains(&totals[0]));
    assert!(compound.source_indices.contains(&totals[1]));
}

#[test]
fn test_php_average_after_loop() {
    let (tokens, result) = analyze("cart.php", "php");
    let totals = indices_of(&tokens, "$total");
    let avg = result.edges_for("$avg").next().unwrap();
    assert_eq!(avg.source_indices[0], totals[1]);
}

// =============================================================================
// Dispatch and batch runs
// =============================================================================

#[test]
fn test_unsupported_language_fails_the_call() {
    let grammar = get_grammar("python").unwrap();
    let parsed = grammar.parse_source("x", b"x = 1\n").unwrap();
    let root = parsed.tree.root_node();
    let tokens = TokenIndex::from_tree(root, &parsed.source, grammar);

    let err = build_dfg(root, &tokens, "kotlin").unwrap_err();
    assert_eq!(err, DfgError::UnsupportedLanguage("kotlin".to_string()));
}

#[test]
fn test_every_tag_has_a_fixture() {
    for tag in LanguageTag::ALL {
        assert!(
            FIXTURES.iter().any(|(_, language)| *language == tag.as_str()),
            "no fixture for {tag}"
        );
    }
}

#[test]
fn test_pipeline_over_testdata() {
    let config = DfgConfig::parse_file(testdata_path().join("test-config.yaml")).unwrap();
    let pipeline = Pipeline::new(config).threads(Some(2));
    let files = pipeline.collect_files(&testdata_path()).unwrap();
    assert_eq!(files.len(), FIXTURES.len());

    let report = pipeline.run(&files);
    assert!(!report.has_failures());
    assert_eq!(report.extractions.len(), FIXTURES.len());
    let paths: Vec<&str> = report.extractions.iter().map(|e| e.path.as_str()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn test_syntax_errors_still_extract() {
    let pipeline = Pipeline::new(DfgConfig::default());
    let report = pipeline.run(&[testdata_path().join("broken.py")]);
    assert_eq!(report.extractions.len(), 1);
    assert!(report.extractions[0].has_parse_errors);
    assert_eq!(report.degraded_count(), 1);
}
