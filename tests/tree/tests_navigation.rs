use grove::{InputEdit, Point, parse};
use pretty_assertions::assert_eq;

use crate::helpers::grammars;

const ASSIGNMENT: &str = "x =\n  42";

#[test]
fn test_fields_in_sexp() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    assert_eq!(
        tree.root_node().to_sexp(),
        "(doc (assignment left: (identifier) right: (number)))"
    );
}

#[test]
fn test_child_by_field_name() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    let assignment = tree.root_node().named_child(0).unwrap();
    assert_eq!(assignment.kind(), "assignment");
    assert_eq!(assignment.child_by_field_name("left").unwrap().text(), Some("x"));
    assert_eq!(assignment.child_by_field_name("right").unwrap().text(), Some("42"));
    assert!(assignment.child_by_field_name("value").is_none());
    assert_eq!(assignment.children_by_field_name("left").count(), 1);
}

#[test]
fn test_children_skip_hidden_whitespace() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    let assignment = tree.root_node().child(0).unwrap();
    let kinds: Vec<_> = assignment.children().map(|child| child.kind()).collect();
    assert_eq!(kinds, ["identifier", "=", "number"]);
    assert_eq!(assignment.child_count(), 3);
    assert_eq!(assignment.named_child_count(), 2);
}

#[test]
fn test_parent_and_siblings() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    let number = tree.preorder().find(|node| node.kind() == "number").unwrap();
    assert_eq!(number.parent().unwrap().kind(), "assignment");
    assert_eq!(number.prev_sibling().unwrap().kind(), "=");
    assert_eq!(number.prev_named_sibling().unwrap().kind(), "identifier");
    assert!(number.next_sibling().is_none());
    assert!(tree.root_node().parent().is_none());
}

#[test]
fn test_cursor_walk_reports_fields() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    let mut cursor = tree.walk();
    assert!(cursor.goto_first_child());
    assert_eq!(cursor.node().kind(), "assignment");
    assert_eq!(cursor.field_name(), None);

    assert!(cursor.goto_first_child());
    assert_eq!(cursor.depth(), 2);
    assert_eq!(cursor.field_name(), Some("left"));
    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.field_name(), None);
    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.field_name(), Some("right"));
    assert!(!cursor.goto_next_sibling());

    assert!(cursor.goto_parent());
    assert!(cursor.goto_parent());
    assert_eq!(cursor.node(), tree.root_node());
    assert!(!cursor.goto_parent());
}

#[test]
fn test_preorder_visits_visible_nodes() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    let kinds: Vec<_> = tree.preorder().map(|node| node.kind()).collect();
    assert_eq!(kinds, ["doc", "assignment", "identifier", "=", "number"]);
}

#[test]
fn test_positions() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    let number = tree.preorder().find(|node| node.kind() == "number").unwrap();
    assert_eq!(number.start_position(), Point::new(1, 2));
    assert_eq!(number.end_position(), Point::new(1, 4));
    assert_eq!(tree.root_node().start_position(), Point::ZERO);
}

#[test]
fn test_smallest_enclosing_node() {
    let tree = parse(&grammars::assignment(), ASSIGNMENT, None);
    let root = tree.root_node();
    assert_eq!(root.descendant_for_byte_range(7, 8).unwrap().kind(), "number");
    assert_eq!(root.descendant_for_byte_range(2, 3).unwrap().kind(), "=");
    assert_eq!(root.named_descendant_for_byte_range(2, 3).unwrap().kind(), "assignment");
    assert_eq!(
        root.descendant_for_point_range(Point::new(1, 2), Point::new(1, 3))
            .unwrap()
            .kind(),
        "number"
    );
    assert!(root.descendant_for_byte_range(0, 100).is_none());
}

#[test]
fn test_rowan_export_is_lossless() {
    let language = grammars::statements();
    let text = "aa; bb;\n%cc;";
    let tree = parse(&language, text, None);
    let root = tree.syntax_node().unwrap();
    assert_eq!(root.text().to_string(), text);
    assert_eq!(root.kind().0, language.symbol_for_name("doc", true).unwrap().0);
}

#[test]
fn test_edited_tree_has_no_source() {
    let text = "aa;";
    let tree = parse(&grammars::statements(), text, None);
    assert_eq!(tree.root_node().text(), Some(text));

    let edited = tree.edit(&InputEdit::insert(text, 3, " bb;"));
    assert!(edited.source().is_none());
    assert!(edited.to_green().is_none());
    assert_eq!(edited.len(), 7);
    assert!(edited.root_node().has_changes());
}
