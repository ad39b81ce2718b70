use grove::parse;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::helpers::grammars;
use crate::helpers::tree_assertions::assert_lossless;

#[rstest]
#[case::missing_semicolon("aa bb;", r#"(doc (stmt (word) (MISSING ";")) (stmt (word)))"#)]
#[case::missing_at_end("aa", r#"(doc (stmt (word) (MISSING ";")))"#)]
#[case::unknown_character("aa; %bb;", "(doc (stmt (word)) (ERROR) (stmt (word)))")]
#[case::unknown_run("aa;%%%", "(doc (stmt (word)) (ERROR))")]
fn test_recovery_shapes(#[case] text: &str, #[case] expected: &str) {
    let language = grammars::statements();
    let tree = parse(&language, text, None);
    assert!(tree.has_error());
    assert_eq!(tree.root_node().to_sexp(), expected);
    assert_lossless(&tree, text);
}

#[rstest]
#[case("")]
#[case(";")]
#[case(";;;;")]
#[case("aa;;bb;")]
#[case("%")]
#[case("aa; bb cc dd; ;; % ee")]
#[case("é;ü")]
fn test_any_input_yields_lossless_tree(#[case] text: &str) {
    let language = grammars::statements();
    let tree = parse(&language, text, None);
    assert_lossless(&tree, text);
    assert_eq!(tree.root_node().start_byte(), 0);
    assert_eq!(tree.root_node().end_byte() as usize, text.len());
}

#[test]
fn test_error_nodes_are_reported() {
    let language = grammars::statements();
    let tree = parse(&language, "aa; %bb;", None);
    let error = tree
        .preorder()
        .find(|node| node.is_error())
        .expect("an ERROR node");
    assert_eq!(error.byte_range(), grove::TextRange::new(4.into(), 5.into()));
    assert!(error.is_extra());
    assert!(tree.root_node().has_error());
    assert!(tree.stats().recoveries >= 1);
}

#[test]
fn test_missing_nodes_are_zero_width() {
    let language = grammars::statements();
    let tree = parse(&language, "aa bb;", None);
    let missing = tree.preorder().find(|node| node.is_missing()).expect("a MISSING node");
    assert_eq!(missing.kind(), ";");
    assert_eq!(missing.start_byte(), missing.end_byte());
    // Inserted after the whitespace that precedes the unexpected token
    assert_eq!(missing.start_byte(), 3);
}

#[test]
fn test_valid_prefix_survives_garbage() {
    let language = grammars::statements();
    let text = "aa; bb; cc;\n;;;; %% ;;\n";
    let tree = parse(&language, text, None);
    assert!(tree.has_error());
    let stmts: Vec<_> = tree
        .root_node()
        .named_children()
        .filter(|node| node.kind() == "stmt")
        .map(|node| node.start_byte())
        .collect();
    assert!(stmts.starts_with(&[0, 4, 8]), "{tree:?}");
}

#[test]
fn test_keywords_need_separator() {
    let language = grammars::separated_pair();

    let tree = parse(&language, "a b", None);
    assert!(!tree.has_error());
    assert_eq!(tree.root_node().to_sexp(), "(pair)");
    let kinds: Vec<_> = tree.root_node().children().map(|child| child.kind()).collect();
    assert_eq!(kinds, ["a", "b"]);

    // Without the space the longest match is an identifier, which no state accepts
    let tree = parse(&language, "ab", None);
    assert!(tree.has_error());
    assert!(tree.preorder().any(|node| node.is_error()));
    assert_eq!(tree.root_node().end_byte(), 2);
    assert_lossless(&tree, "ab");
}

#[rstest]
#[case::unterminated("aa; bb")]
#[case::stray_terminator(";")]
#[case::stray_in_middle("aa; ; bb;")]
fn test_malformed_input_spans_everything(#[case] text: &str) {
    let tree = parse(&grammars::statements(), text, None);
    assert!(tree.has_error());
    assert_eq!(tree.root_node().byte_range(), grove::TextRange::up_to((text.len() as u32).into()));
}
