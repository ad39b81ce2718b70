use grove::{TextRange, TextSize, parse};

use crate::helpers::grammars;
use crate::helpers::tree_assertions::edit_and_reparse;

fn covers(ranges: &[TextRange], start: u32, end: u32) -> bool {
    let wanted = TextRange::new(TextSize::new(start), TextSize::new(end));
    ranges.iter().any(|range| range.contains_range(wanted))
}

#[test]
fn test_reparse_without_edit_changes_nothing() {
    let language = grammars::statements();
    let text = grammars::statements_text(100);
    let tree = parse(&language, &text, None);
    let reparsed = parse(&language, &text, Some(&tree));
    assert!(reparsed.changed_ranges(&tree).is_empty());
}

#[test]
fn test_independent_parses_of_same_text_agree() {
    let language = grammars::statements();
    let text = "aa; bb;\ncc;";
    let first = parse(&language, text, None);
    let second = parse(&language, text, None);
    assert!(second.changed_ranges(&first).is_empty());
}

#[test]
fn test_relexed_word_is_reported() {
    let language = grammars::statements();
    let text = grammars::statements_text(10);
    let tree = parse(&language, &text, None);
    let (_, edited, reparsed) = edit_and_reparse(&language, &tree, &text, 4..6, "cc");

    let ranges = reparsed.changed_ranges(&edited);
    assert!(covers(&ranges, 4, 6), "{ranges:?}");
    assert!(ranges.iter().all(|range| range.end() <= TextSize::new(8)), "{ranges:?}");
}

#[test]
fn test_removed_statement_is_reported() {
    let language = grammars::statements();
    let text = grammars::statements_text(10);
    let tree = parse(&language, &text, None);
    let (_, edited, reparsed) = edit_and_reparse(&language, &tree, &text, 4..8, "");

    let ranges = reparsed.changed_ranges(&edited);
    assert!(!ranges.is_empty());
    assert!(ranges[0].start() <= TextSize::new(4), "{ranges:?}");
}

#[test]
fn test_ranges_are_sorted_and_disjoint() {
    let language = grammars::statements();
    let text = grammars::statements_text(20);
    let tree = parse(&language, &text, None);
    let (text, _, tree) = edit_and_reparse(&language, &tree, &text, 4..6, "x y");
    let (_, edited, reparsed) = edit_and_reparse(&language, &tree, &text, 40..40, "%");

    let ranges = reparsed.changed_ranges(&edited);
    assert!(!ranges.is_empty());
    for pair in ranges.windows(2) {
        assert!(pair[0].end() < pair[1].start(), "{ranges:?}");
    }
}
