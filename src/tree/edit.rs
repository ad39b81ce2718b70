//! Applying text edits to subtrees
//!
//! Only the subtrees the edit can affect are rebuilt; everything else is
//! shared with the original tree. A child is affected when the edit starts
//! before the end of the text its lexer examined (its size plus lookahead)
//! and it does not start after the deleted range.
//!
//! ```text
//! old:  [ a ][ b  ][ c ]          edit: replace 2..5 with "xy"
//!            ^^^^^^
//! new:  [ a* ][ b* ][ c ]         * = copied, has_changes
//!                    ^ shared, start shifted implicitly
//! ```

use std::sync::Arc;

use crate::base::{InputEdit, Length};

use super::subtree::{Subtree, SubtreeData};

/// Edit expressed relative to the start of one subtree
#[derive(Debug, Clone, Copy)]
struct LocalEdit {
    start: Length,
    old_end: Length,
    new_end: Length,
}

pub(crate) fn edit_subtree(root: &Subtree, edit: &InputEdit) -> Subtree {
    apply(
        root,
        LocalEdit {
            start: edit.start(),
            old_end: edit.old_end(),
            new_end: edit.new_end(),
        },
    )
}

/// A copied subtree waiting for its affected children
struct Frame {
    data: SubtreeData,
    /// Affected children in reverse order
    edits: Vec<(usize, LocalEdit)>,
    /// Position in the parent's children
    index: usize,
}

fn apply(root: &Subtree, edit: LocalEdit) -> Subtree {
    let mut stack = vec![copy(root, edit, 0)];
    loop {
        let Some(top) = stack.last_mut() else {
            return Arc::clone(root);
        };
        if let Some((index, local)) = top.edits.pop() {
            let child = copy(&top.data.children[index], local, index);
            stack.push(child);
            continue;
        }

        let Some(done) = stack.pop() else {
            return Arc::clone(root);
        };
        let tree = Arc::new(done.data);
        match stack.last_mut() {
            Some(parent) => parent.data.children[done.index] = tree,
            None => return tree,
        }
    }
}

/// Copy `tree` with its new size and work out which children the edit reaches
fn copy(tree: &Subtree, edit: LocalEdit, index: usize) -> Frame {
    let mut data = SubtreeData::clone(tree);
    data.flags.has_changes = true;

    let old_size = tree.size;
    if edit.start.bytes <= old_size.bytes {
        data.size = if edit.old_end.bytes <= old_size.bytes {
            edit.new_end + (old_size - edit.old_end)
        } else {
            edit.new_end
        };
    }

    let mut edits = Vec::new();
    let mut child_start = Length::ZERO;
    let mut touched = false;
    for (child_index, child) in tree.children.iter().enumerate() {
        let start = child_start;
        let end = start + child.size;
        child_start = end;

        if end.byte_len() + child.lookahead_bytes <= edit.start.byte_len() {
            continue;
        }
        if start.bytes > edit.old_end.bytes || (start.bytes == edit.old_end.bytes && touched) {
            break;
        }

        // Inserted text belongs to the first child that reaches the edit start
        let takes_insertion = !touched && end.bytes >= edit.start.bytes;
        let local_start = edit.start.saturating_sub(start);
        edits.push((
            child_index,
            LocalEdit {
                start: local_start,
                old_end: edit.old_end.saturating_sub(start),
                new_end: if takes_insertion {
                    edit.new_end.saturating_sub(start)
                } else {
                    local_start
                },
            },
        ));
        touched |= end.bytes >= edit.start.bytes;
    }
    edits.reverse();

    Frame { data, edits, index }
}
