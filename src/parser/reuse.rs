//! Walking the previous tree for reusable subtrees
//!
//! The cursor follows parse positions: asked for a subtree at byte `p`, it
//! steps over old subtrees that end at or before `p`, descends into those
//! spanning `p`, and only offers a subtree that starts exactly at `p`. A
//! subtree the parser shifts is stepped over by the next query.

use std::sync::Arc;

use crate::language::{GrammarTables, StateId};
use crate::tree::subtree::{Subtree, external_state_eq};

struct Entry {
    tree: Subtree,
    child_index: usize,
    byte_offset: u32,
}

pub(crate) struct ReusableNode {
    stack: Vec<Entry>,
    /// Scanner state after the last external token before the cursor
    last_external: Option<Arc<[u8]>>,
}

impl ReusableNode {
    pub fn new(root: Option<&Subtree>) -> Self {
        Self {
            stack: root
                .map(|tree| Entry {
                    tree: Arc::clone(tree),
                    child_index: 0,
                    byte_offset: 0,
                })
                .into_iter()
                .collect(),
            last_external: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.stack.is_empty()
    }

    /// Step over the current subtree
    fn advance(&mut self) {
        let Some(entry) = self.stack.pop() else {
            return;
        };
        if entry.tree.flags.has_external_tokens {
            self.last_external = entry.tree.last_external_state().cloned();
        }
        let byte_offset = entry.byte_offset + entry.tree.size.byte_len();
        let mut child_index = entry.child_index;
        while let Some(parent) = self.stack.last() {
            if let Some(sibling) = parent.tree.children.get(child_index + 1) {
                let tree = Arc::clone(sibling);
                self.stack.push(Entry {
                    tree,
                    child_index: child_index + 1,
                    byte_offset,
                });
                return;
            }
            if let Some(parent) = self.stack.pop() {
                child_index = parent.child_index;
            }
        }
    }

    /// Move to the first child of the current subtree
    fn descend(&mut self) -> bool {
        let Some(entry) = self.stack.last() else {
            return false;
        };
        let Some(child) = entry.tree.children.first() else {
            return false;
        };
        let child = Entry {
            tree: Arc::clone(child),
            child_index: 0,
            byte_offset: entry.byte_offset,
        };
        self.stack.push(child);
        true
    }

    /// Whether the old subtrees right after the current one, past plain
    /// extras, start with an error. The parser recovered there, so the
    /// reductions that built the current subtree are not the ones a fresh
    /// parse would make.
    fn followed_by_error(&self) -> bool {
        for pair in self.stack.windows(2).rev() {
            let (parent, entry) = (&pair[0], &pair[1]);
            for sibling in parent.tree.children.iter().skip(entry.child_index + 1) {
                if sibling.has_error() {
                    return true;
                }
                if !sibling.is_extra() {
                    return false;
                }
            }
        }
        self.stack.first().is_some_and(|root| root.tree.is_error())
    }

    fn descend_or_advance(&mut self) {
        if !self.descend() {
            self.advance();
        }
    }

    /// The lookahead `tree` could not be used whole; offer its children instead
    pub fn breakdown(&mut self, tree: &Subtree) {
        if self.stack.last().is_some_and(|entry| Arc::ptr_eq(&entry.tree, tree)) {
            self.descend_or_advance();
        }
    }

    /// The largest old subtree starting at `position` that can be shifted
    /// whole in `state`
    pub fn reusable(
        &mut self,
        tables: &GrammarTables,
        text: &str,
        state: StateId,
        position: u32,
        last_external: Option<&Arc<[u8]>>,
    ) -> Option<Subtree> {
        while let Some(entry) = self.stack.last() {
            let tree = Arc::clone(&entry.tree);
            let start = entry.byte_offset;
            let end = start + tree.size.byte_len();

            if end <= position {
                self.advance();
                continue;
            }
            if start > position {
                return None;
            }
            if start < position
                || end as usize > text.len()
                || !text.is_char_boundary(end as usize)
            {
                self.descend_or_advance();
                continue;
            }

            if !external_state_eq(self.last_external.as_ref(), last_external) {
                tracing::trace!(position, "cannot reuse: external scanner state differs");
                self.advance();
                continue;
            }
            if tree.has_changes()
                || tree.has_error()
                || tree.is_missing()
                || tree.is_fragile()
                || tree.is_ambiguous()
                || (tree.is_extra() && !tree.is_leaf())
            {
                self.descend_or_advance();
                continue;
            }
            let first = tree.first_leaf;
            if first.mode != tables.lex_mode(state)
                || tables.actions(state, first.symbol).is_empty()
            {
                tracing::trace!(
                    position,
                    symbol = tree.symbol.0,
                    "cannot reuse: first token not valid here"
                );
                self.advance();
                continue;
            }
            if !tree.is_leaf() && tables.goto(state, tree.symbol).is_none() {
                self.descend_or_advance();
                continue;
            }
            if !tree.is_leaf() && self.followed_by_error() {
                tracing::trace!(
                    position,
                    symbol = tree.symbol.0,
                    "cannot reuse: followed by an error"
                );
                self.descend_or_advance();
                continue;
            }
            return Some(tree);
        }
        None
    }
}
