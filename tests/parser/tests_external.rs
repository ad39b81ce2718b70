use grove::parse;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::helpers::grammars;
use crate::helpers::tree_assertions::{assert_lossless, edit_and_reparse};

#[rstest]
#[case::two_lines("ab\ncd\n", "(doc (line (word) (newline)) (line (word) (newline)))")]
#[case::no_final_newline("ab", "(doc (line (word) (newline)))")]
#[case::spaces_in_line("ab  \ncd\n", "(doc (line (word) (newline)) (line (word) (newline)))")]
#[case::blank_lines("ab\n\n\ncd\n", "(doc (line (word) (newline)) (line (word) (newline)))")]
fn test_newlines_come_from_scanner(#[case] text: &str, #[case] expected: &str) {
    let language = grammars::lines();
    let tree = parse(&language, text, None);
    assert!(!tree.has_error(), "{tree:?}");
    assert_eq!(tree.root_node().to_sexp(), expected);
    assert_lossless(&tree, text);
}

#[test]
fn test_newline_owns_following_indentation() {
    let language = grammars::lines();
    let tree = parse(&language, "ab\n  cd\n", None);
    let newline = tree
        .preorder()
        .find(|node| node.kind() == "newline")
        .expect("a newline");
    assert_eq!(newline.start_byte(), 2);
    assert_eq!(newline.end_byte(), 5);
}

#[test]
fn test_zero_width_newline_only_once() {
    let language = grammars::lines();
    let tree = parse(&language, "ab", None);
    let newlines: Vec<_> = tree.preorder().filter(|node| node.kind() == "newline").collect();
    assert_eq!(newlines.len(), 1);
    assert!(newlines[0].byte_range().is_empty());
}

#[test]
fn test_missing_newline_is_inserted() {
    let language = grammars::lines();
    let tree = parse(&language, "ab cd\n", None);
    assert_eq!(
        tree.root_node().to_sexp(),
        "(doc (line (word) (MISSING newline)) (line (word) (newline)))"
    );
}

#[test]
fn test_without_scanner_lines_cannot_end() {
    let language = grammars::lines_without_scanner();
    assert!(!language.has_external_scanner());
    let text = "ab\ncd\n";
    let tree = parse(&language, text, None);
    assert!(tree.has_error());
    assert_lossless(&tree, text);
}

#[rstest]
#[case::edit_word(3..5, "xyz")]
#[case::add_line(3..3, "new\n")]
#[case::remove_newline(2..3, "")]
#[case::indent_line(3..3, "    ")]
fn test_incremental_with_external_tokens(
    #[case] range: std::ops::Range<usize>,
    #[case] replacement: &str,
) {
    let language = grammars::lines();
    let text = "ab\ncd\nef\ngh\n";
    let tree = parse(&language, text, None);
    edit_and_reparse(&language, &tree, text, range, replacement);
}

#[test]
fn test_external_tokens_are_reused() {
    let language = grammars::lines();
    let text: String = (0..200).map(|i| format!("w{}\n", "a".repeat(i % 5 + 1))).collect();
    let tree = parse(&language, &text, None);
    assert!(!tree.has_error());
    let (_, _, reparsed) = edit_and_reparse(&language, &tree, &text, 1..1, "b");
    assert!(reparsed.stats().subtrees_reused > 0);
    assert!(reparsed.stats().tokens_lexed < 10);
}
