//! Syntax trees
//!
//! ```text
//! SyntaxTree ──▶ root: Arc<SubtreeData>      shared with older/newer trees
//!            ├─▶ source: Option<Arc<str>>    None after edit() until reparse
//!            ├─▶ language: Language
//!            └─▶ arena: OnceLock<Arena>      visible nodes, built on demand
//! ```
//!
//! Trees are immutable. [`SyntaxTree::edit`] returns a new tree whose damaged
//! path is copied and flagged; everything else is shared. Passing the edited
//! tree to the parser reuses its undamaged subtrees.

mod balance;
mod cst;
mod cursor;
mod edit;
mod node;
pub(crate) mod subtree;

pub use cst::{GroveLanguage, SyntaxNode, SyntaxToken};
pub use cursor::{Preorder, TreeCursor};
pub use node::{Node, NodeId};

pub(crate) use balance::Balancer;

use std::fmt;
use std::sync::{Arc, OnceLock};

use rowan::GreenNode;
use text_size::{TextRange, TextSize};

use crate::base::InputEdit;
use crate::language::{Language, Symbol};
use crate::parser::ParseStats;

use node::Arena;
use subtree::Subtree;

struct TreeInner {
    root: Subtree,
    source: Option<Arc<str>>,
    language: Language,
    stats: ParseStats,
    arena: OnceLock<Arena>,
}

/// An immutable concrete syntax tree
#[derive(Clone)]
pub struct SyntaxTree {
    inner: Arc<TreeInner>,
}

/// A token of the tree, including hidden ones such as whitespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    pub symbol: Symbol,
    pub range: TextRange,
    pub is_extra: bool,
    pub is_missing: bool,
}

impl SyntaxTree {
    pub(crate) fn new(
        root: Subtree,
        source: Option<Arc<str>>,
        language: Language,
        stats: ParseStats,
    ) -> Self {
        Self {
            inner: Arc::new(TreeInner {
                root,
                source,
                language,
                stats,
                arena: OnceLock::new(),
            }),
        }
    }

    pub(crate) fn root_subtree(&self) -> &Subtree {
        &self.inner.root
    }

    pub(crate) fn arena(&self) -> &Arena {
        self.inner
            .arena
            .get_or_init(|| Arena::build(&self.inner.root, self.inner.language.tables()))
    }

    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, NodeId::ROOT)
    }

    pub fn language(&self) -> &Language {
        &self.inner.language
    }

    /// The text this tree was parsed from; `None` for edited trees
    pub fn source(&self) -> Option<&str> {
        self.inner.source.as_deref()
    }

    pub fn stats(&self) -> &ParseStats {
        &self.inner.stats
    }

    pub fn has_error(&self) -> bool {
        self.inner.root.has_error()
    }

    pub fn len(&self) -> u32 {
        self.inner.root.size.byte_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of subtrees, visible or not
    pub fn node_count(&self) -> u32 {
        self.inner.root.node_count
    }

    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self.root_node())
    }

    /// Visible nodes in document order
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder::new(self.root_node())
    }

    /// Apply a text edit, producing a tree to pass to the next parse.
    ///
    /// Subtrees the edit may have invalidated are copied and marked as changed;
    /// all others are shared with `self`.
    pub fn edit(&self, edit: &InputEdit) -> SyntaxTree {
        tracing::trace!(
            start = edit.start_byte,
            old_end = edit.old_end_byte,
            new_end = edit.new_end_byte,
            "editing tree"
        );
        let root = edit::edit_subtree(&self.inner.root, edit);
        SyntaxTree::new(root, None, self.inner.language.clone(), ParseStats::default())
    }

    /// Parse `text` reusing this (edited) tree
    pub fn reparse(&self, text: &str) -> SyntaxTree {
        crate::parser::parse(&self.inner.language, text, Some(self))
    }

    /// All tokens in order; their texts concatenate to the source
    pub fn leaves(&self) -> Vec<Leaf> {
        let mut leaves = Vec::new();
        let mut pending = vec![(self.inner.root.clone(), 0u32)];
        while let Some((tree, start)) = pending.pop() {
            if tree.is_leaf() {
                let end = start + tree.size.byte_len();
                leaves.push(Leaf {
                    symbol: tree.symbol,
                    range: TextRange::new(TextSize::new(start), TextSize::new(end)),
                    is_extra: tree.is_extra(),
                    is_missing: tree.is_missing(),
                });
                continue;
            }
            let mut offset = start;
            let mut children = Vec::with_capacity(tree.children.len());
            for child in &tree.children {
                children.push((child.clone(), offset));
                offset += child.size.byte_len();
            }
            pending.extend(children.into_iter().rev());
        }
        leaves
    }

    /// Byte ranges whose visible structure differs between `old` and `self`.
    ///
    /// `old` must be the edited tree that was passed to the parse producing
    /// `self`, so that both trees use the same coordinates.
    pub fn changed_ranges(&self, old: &SyntaxTree) -> Vec<TextRange> {
        let mut ranges = Vec::new();
        diff(old.root_subtree(), self.root_subtree(), 0, &mut ranges);
        ranges.sort_by_key(|range: &TextRange| range.start());
        let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start() <= last.end() => *last = last.cover(range),
                _ => merged.push(range),
            }
        }
        merged
    }

    /// Lossless rowan green tree; `None` for edited trees without source
    pub fn to_green(&self) -> Option<GreenNode> {
        Some(cst::build_green(&self.inner.root, self.source()?))
    }

    pub fn syntax_node(&self) -> Option<SyntaxNode> {
        self.to_green().map(SyntaxNode::new_root)
    }
}

/// Visible children of `tree` with their start offsets, looking through hidden nodes
fn visible_children(tree: &Subtree, start: u32) -> Vec<(Subtree, u32)> {
    let mut out = Vec::new();
    let mut pending = Vec::new();
    let mut offset = start;
    for child in &tree.children {
        pending.push((child.clone(), offset));
        offset += child.size.byte_len();
    }
    pending.reverse();
    while let Some((child, offset)) = pending.pop() {
        if child.flags.visible {
            out.push((child, offset));
            continue;
        }
        let mut inner = Vec::with_capacity(child.children.len());
        let mut position = offset;
        for grandchild in &child.children {
            inner.push((grandchild.clone(), position));
            position += grandchild.size.byte_len();
        }
        pending.extend(inner.into_iter().rev());
    }
    out
}

fn span(start: u32, tree: &Subtree) -> TextRange {
    TextRange::at(TextSize::new(start), tree.size.bytes)
}

/// Unsorted ranges where `old` and `new` differ
fn diff(old: &Subtree, new: &Subtree, start: u32, out: &mut Vec<TextRange>) {
    let mut pending = vec![(Arc::clone(old), Arc::clone(new), start)];
    while let Some((old, new, start)) = pending.pop() {
        if Arc::ptr_eq(&old, &new) {
            continue;
        }
        if old.symbol != new.symbol || old.size.bytes != new.size.bytes {
            out.push(span(start, &old).cover(span(start, &new)));
            continue;
        }
        // A relexed token may differ in text only
        if old.is_leaf() || new.is_leaf() {
            if old.has_changes() || old.is_leaf() != new.is_leaf() {
                out.push(span(start, &new));
            }
            continue;
        }

        let old_children = visible_children(&old, start);
        let new_children = visible_children(&new, start);
        let (mut i, mut j) = (0, 0);
        while i < old_children.len() && j < new_children.len() {
            let (old_child, old_start) = &old_children[i];
            let (new_child, new_start) = &new_children[j];
            if old_start == new_start
                && old_child.symbol == new_child.symbol
                && old_child.size.bytes == new_child.size.bytes
            {
                pending.push((Arc::clone(old_child), Arc::clone(new_child), *new_start));
                i += 1;
                j += 1;
                continue;
            }
            let old_span = span(*old_start, old_child);
            let new_span = span(*new_start, new_child);
            out.push(old_span.cover(new_span));
            if old_span.end() <= new_span.end() {
                i += 1;
            }
            if new_span.end() <= old_span.end() {
                j += 1;
            }
        }
        for (child, offset) in old_children[i..].iter().chain(&new_children[j..]) {
            out.push(span(*offset, child));
        }
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root_node().to_sexp())
    }
}
