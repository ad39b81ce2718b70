//! Assertions over parsed trees.

use grove::{InputEdit, Language, SyntaxTree};

/// The leaves of `tree` cover `text` exactly, in order
pub fn assert_lossless(tree: &SyntaxTree, text: &str) {
    let mut rebuilt = String::with_capacity(text.len());
    let mut end = 0u32;
    for leaf in tree.leaves() {
        assert_eq!(u32::from(leaf.range.start()), end, "gap or overlap before {:?}", leaf.range);
        end = leaf.range.end().into();
        rebuilt.push_str(&text[leaf.range]);
    }
    assert_eq!(rebuilt, text);
    assert_eq!(tree.len() as usize, text.len());
}

/// Apply `replacement` over `range`, re-parse incrementally, and check the
/// result against a fresh parse of the new text
pub fn edit_and_reparse(
    language: &Language,
    tree: &SyntaxTree,
    text: &str,
    range: std::ops::Range<usize>,
    replacement: &str,
) -> (String, SyntaxTree, SyntaxTree) {
    let edit = InputEdit::replace(text, range, replacement);
    let new_text = edit.apply(text, replacement);
    let edited = tree.edit(&edit);
    let reparsed = edited.reparse(&new_text);

    let fresh = grove::parse(language, &new_text, None);
    assert_eq!(reparsed.root_node().to_sexp(), fresh.root_node().to_sexp());
    assert_lossless(&reparsed, &new_text);
    (new_text, edited, reparsed)
}
