use grove::{Parser, ParserConfig, TextSize, parse, parse_batch};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::helpers::grammars;
use crate::helpers::tree_assertions::{assert_lossless, edit_and_reparse};

#[rstest]
#[case::single("aa;", "(doc (stmt (word)))")]
#[case::spaced("aa; bb;", "(doc (stmt (word)) (stmt (word)))")]
#[case::leading_whitespace("\n  aa;", "(doc (stmt (word)))")]
#[case::trailing_whitespace("aa;\nbb;\n\n", "(doc (stmt (word)) (stmt (word)))")]
fn test_statements_parse(#[case] text: &str, #[case] expected: &str) {
    let language = grammars::statements();
    let tree = parse(&language, text, None);
    assert!(!tree.has_error(), "{tree:?}");
    assert_eq!(tree.root_node().to_sexp(), expected);
    assert_lossless(&tree, text);
}

#[test]
fn test_root_spans_whole_input() {
    let language = grammars::statements();
    let text = "  aa;  ";
    let tree = parse(&language, text, None);
    let root = tree.root_node();
    assert_eq!(root.start_byte(), 0);
    assert_eq!(root.end_byte(), text.len() as u32);
    assert_eq!(root.kind(), "doc");
    assert_eq!(root.text(), Some(text));
}

#[test]
fn test_long_repetition_is_balanced() {
    let language = grammars::statements();
    let text = grammars::statements_text(4096);
    let tree = parse(&language, &text, None);
    assert!(!tree.has_error());
    assert_eq!(tree.root_node().named_child_count(), 4096);

    fn depth(node: grove::Node<'_>) -> usize {
        1 + node.children().map(depth).max().unwrap_or(0)
    }
    // Hidden repetition nodes are flattened away, so the visible depth is tiny
    assert!(depth(tree.root_node()) <= 4);
    // Statement, word, ";", whitespace and the repetition nodes
    assert!(tree.node_count() > 4096 * 4);
    assert_lossless(&tree, &text);
}

#[test]
fn test_unbalanced_repetition_still_parses() {
    let language = grammars::statements();
    let text = grammars::statements_text(2000);
    let parser = Parser::new(language).with_config(ParserConfig::new().with_balancing(false));
    let tree = parser.parse(&text, None).unwrap();
    assert!(!tree.has_error());
    assert_eq!(tree.root_node().named_child_count(), 2000);
}

#[test]
fn test_empty_input() {
    let language = grammars::statements();
    let tree = parse(&language, "", None);
    assert!(tree.has_error());
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
}

#[test]
fn test_stats_without_old_tree() {
    let language = grammars::statements();
    let tree = parse(&language, "aa; bb;", None);
    let stats = tree.stats();
    assert_eq!(stats.subtrees_reused, 0);
    // aa ; ws bb ; END
    assert_eq!(stats.tokens_lexed, 6);
    assert_eq!(stats.bytes_lexed, 7);
    assert_eq!(stats.recoveries, 0);
    assert!(stats.nodes_allocated >= tree.node_count() as u64);
}

#[test]
fn test_parse_batch_matches_individual_parses() {
    let language = grammars::statements();
    let texts = ["aa;", "aa; bb;", "aa bb;", "", ";;"];
    let trees = parse_batch(&language, &texts);
    assert_eq!(trees.len(), texts.len());
    for (tree, text) in trees.iter().zip(texts) {
        assert_eq!(tree.root_node().to_sexp(), parse(&language, text, None).root_node().to_sexp());
        assert_lossless(tree, text);
    }
}

#[test]
fn test_trees_are_shared_across_threads() {
    let language = grammars::statements();
    let text = grammars::statements_text(200);
    let tree = parse(&language, &text, None);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            let tree = tree.clone();
            scope.spawn(move || {
                assert_eq!(tree.root_node().named_child_count(), 200);
            });
        }
    });
}

#[test]
fn test_deeply_nested_input() {
    const DEPTH: usize = 100_000;
    let language = grammars::nested();
    let text = format!("{}x{}", "(".repeat(DEPTH), ")".repeat(DEPTH));
    let tree = parse(&language, &text, None);
    assert!(!tree.root_node().has_error());
    assert_lossless(&tree, &text);

    let sexp = tree.root_node().to_sexp();
    assert!(sexp.starts_with("(doc (expr (expr"));
    assert_eq!(sexp.matches("(expr").count(), DEPTH + 1);
    assert_eq!(sexp.matches("(atom)").count(), 1);

    let (_, edited, reparsed) = edit_and_reparse(&language, &tree, &text, DEPTH..DEPTH + 1, "x");
    let ranges = reparsed.changed_ranges(&edited);
    assert!(ranges.iter().all(|range| range.len() <= TextSize::new(1)), "{ranges:?}");
    assert!(reparsed.changed_ranges(&tree).iter().all(|range| range.len() <= TextSize::new(1)));
}
