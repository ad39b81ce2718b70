//! Immutable, reference-counted subtrees
//!
//! Subtrees are the storage layer of every syntax tree. Sizes are relative,
//! so a subtree does not know where it starts; this is what lets an edited
//! tree share every node after the edit with its predecessor.
//!
//! ```text
//! SubtreeData
//! ├── symbol, size (bytes + extent), lookahead_bytes
//! ├── summary: error_cost, dynamic_precedence, node_count, first_leaf
//! ├── flags: visible, named, extra, missing, fragile, has_changes, ...
//! └── children: Vec<Arc<SubtreeData>>   (empty for leaves)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::base::Length;
use crate::language::{GrammarTables, LexMode, Symbol};

pub(crate) type Subtree = Arc<SubtreeData>;

// ============================================================================
// Error costs
// ============================================================================

pub(crate) const ERROR_COST_PER_RECOVERY: u32 = 500;
pub(crate) const ERROR_COST_PER_MISSING_TREE: u32 = 110;
pub(crate) const ERROR_COST_PER_SKIPPED_TREE: u32 = 100;
pub(crate) const ERROR_COST_PER_SKIPPED_LINE: u32 = 30;
pub(crate) const ERROR_COST_PER_SKIPPED_CHAR: u32 = 1;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Allocate the generation id of a new parse.
///
/// Nodes remember the generation that created them so that post-parse passes
/// can tell fresh nodes from reused ones.
pub(crate) fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Symbol and lex mode of the first token under a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FirstLeaf {
    pub symbol: Symbol,
    pub mode: LexMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags {
    pub visible: bool,
    pub named: bool,
    pub leaf: bool,
    pub extra: bool,
    pub missing: bool,
    /// Built while several stack versions were alive, or during recovery
    pub fragile: bool,
    pub has_changes: bool,
    pub has_external_tokens: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SubtreeData {
    pub symbol: Symbol,
    pub size: Length,
    /// Bytes past the end examined while lexing the last token
    pub lookahead_bytes: u32,
    pub error_cost: u32,
    pub dynamic_precedence: i32,
    /// This node plus all descendants
    pub node_count: u32,
    pub production_id: u16,
    pub first_leaf: FirstLeaf,
    pub generation: u64,
    pub flags: Flags,
    /// Scanner state after this token (external tokens only)
    pub external_state: Option<Arc<[u8]>>,
    pub children: Vec<Subtree>,
    /// Other derivations of the same text, for ambiguous nodes
    pub alternatives: Vec<Vec<Subtree>>,
}

impl SubtreeData {
    pub fn leaf(
        tables: &GrammarTables,
        symbol: Symbol,
        size: Length,
        lookahead_bytes: u32,
        mode: LexMode,
        external_state: Option<Arc<[u8]>>,
        generation: u64,
    ) -> Self {
        // Unlexable characters only ever appear inside ERROR nodes, which stand for them
        let flags = Flags {
            visible: !symbol.is_error() && tables.is_visible(symbol),
            named: !symbol.is_error() && tables.is_named(symbol),
            leaf: true,
            fragile: symbol.is_error(),
            has_external_tokens: external_state.is_some(),
            ..Flags::default()
        };
        Self {
            symbol,
            size,
            lookahead_bytes: lookahead_bytes.max(1),
            error_cost: 0,
            dynamic_precedence: 0,
            node_count: 1,
            production_id: 0,
            first_leaf: FirstLeaf { symbol, mode },
            generation,
            flags,
            external_state,
            children: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    /// Zero-width token inserted by error recovery
    pub fn missing(tables: &GrammarTables, symbol: Symbol, mode: LexMode, generation: u64) -> Self {
        let mut leaf = Self::leaf(tables, symbol, Length::ZERO, 1, mode, None, generation);
        leaf.flags.missing = true;
        leaf.error_cost = ERROR_COST_PER_MISSING_TREE + ERROR_COST_PER_RECOVERY;
        leaf
    }

    pub fn node(
        tables: &GrammarTables,
        symbol: Symbol,
        children: Vec<Subtree>,
        production_id: u16,
        precedence: i16,
        generation: u64,
    ) -> Self {
        let mut node = Self {
            symbol,
            size: Length::ZERO,
            lookahead_bytes: 0,
            error_cost: 0,
            dynamic_precedence: i32::from(precedence),
            node_count: 1,
            production_id,
            first_leaf: FirstLeaf::default(),
            generation,
            flags: Flags {
                visible: tables.is_visible(symbol),
                named: tables.is_named(symbol),
                fragile: symbol.is_error(),
                ..Flags::default()
            },
            external_state: None,
            children,
            alternatives: Vec::new(),
        };
        node.summarize();
        node
    }

    /// An ERROR node wrapping skipped or unparseable subtrees.
    ///
    /// Nested ERROR nodes are inlined.
    pub fn error(tables: &GrammarTables, children: Vec<Subtree>, generation: u64) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is_error() && !child.is_leaf() {
                flat.extend(child.children.iter().cloned());
            } else {
                flat.push(child);
            }
        }
        Self::node(tables, Symbol::ERROR, flat, 0, 0, generation)
    }

    /// Recompute everything derived from the children
    fn summarize(&mut self) {
        let mut size = Length::ZERO;
        let mut lookahead_end = 0u32;
        let mut error_cost = 0u32;
        let mut dynamic_precedence = 0i32;
        let mut node_count = 1u32;
        let mut has_external_tokens = false;

        for child in &self.children {
            size = size + child.size;
            lookahead_end = lookahead_end.max(size.byte_len() + child.lookahead_bytes);
            error_cost = error_cost.saturating_add(child.error_cost);
            let skipped = !child.is_error() && !child.is_extra() && child.flags.visible;
            if self.symbol.is_error() && skipped {
                error_cost = error_cost.saturating_add(ERROR_COST_PER_SKIPPED_TREE);
            }
            dynamic_precedence += child.dynamic_precedence;
            node_count = node_count.saturating_add(child.node_count);
            has_external_tokens |= child.flags.has_external_tokens;
        }

        if self.symbol.is_error() {
            error_cost = error_cost
                .saturating_add(ERROR_COST_PER_RECOVERY)
                .saturating_add(ERROR_COST_PER_SKIPPED_CHAR.saturating_mul(size.byte_len()))
                .saturating_add(ERROR_COST_PER_SKIPPED_LINE.saturating_mul(size.extent.row));
        }

        self.size = size;
        self.lookahead_bytes = lookahead_end.saturating_sub(size.byte_len());
        self.error_cost = error_cost;
        self.dynamic_precedence += dynamic_precedence;
        self.node_count = node_count;
        self.flags.has_external_tokens = has_external_tokens;
        self.first_leaf = self
            .children
            .first()
            .map(|child| child.first_leaf)
            .unwrap_or(FirstLeaf {
                symbol: self.symbol,
                mode: LexMode::default(),
            });
    }

    /// A copy with new children, re-summarized
    pub fn with_children(&self, children: Vec<Subtree>, generation: u64) -> Self {
        let precedence = self.dynamic_precedence
            - self.children.iter().map(|child| child.dynamic_precedence).sum::<i32>();
        let mut node = self.shallow_clone();
        node.children = children;
        node.generation = generation;
        node.dynamic_precedence = precedence;
        node.summarize();
        node
    }

    /// Record another derivation of this node's text
    pub fn with_alternative(&self, children: Vec<Subtree>) -> Self {
        let mut node = self.clone();
        node.alternatives.push(children);
        node.flags.fragile = true;
        node
    }

    fn shallow_clone(&self) -> Self {
        Self {
            symbol: self.symbol,
            size: self.size,
            lookahead_bytes: self.lookahead_bytes,
            error_cost: self.error_cost,
            dynamic_precedence: self.dynamic_precedence,
            node_count: self.node_count,
            production_id: self.production_id,
            first_leaf: self.first_leaf,
            generation: self.generation,
            flags: self.flags,
            external_state: self.external_state.clone(),
            children: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.flags.leaf
    }

    #[inline]
    pub fn is_extra(&self) -> bool {
        self.flags.extra
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.flags.missing
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.symbol.is_error()
    }

    #[inline]
    pub fn is_fragile(&self) -> bool {
        self.flags.fragile
    }

    #[inline]
    pub fn has_changes(&self) -> bool {
        self.flags.has_changes
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.alternatives.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error_cost > 0 || self.is_error()
    }

    /// Scanner state after the last external token under this subtree
    pub fn last_external_state(&self) -> Option<&Arc<[u8]>> {
        let mut tree = self;
        loop {
            if tree.is_leaf() {
                return tree.external_state.as_ref();
            }
            tree = tree
                .children
                .iter()
                .rev()
                .find(|child| child.flags.has_external_tokens)?;
        }
    }
}

/// Set the extra flag, sharing the subtree when it already matches
pub(crate) fn with_extra(tree: &Subtree, extra: bool) -> Subtree {
    if tree.flags.extra == extra {
        return Arc::clone(tree);
    }
    let mut data = SubtreeData::clone(tree);
    data.flags.extra = extra;
    Arc::new(data)
}

/// Scanner states are compared by content; no state equals the empty state
pub(crate) fn external_state_eq(a: Option<&Arc<[u8]>>, b: Option<&Arc<[u8]>>) -> bool {
    a.map_or(&[][..], |state| &state[..]) == b.map_or(&[][..], |state| &state[..])
}

// Deep left-leaning chains exist until repetitions are balanced; dropping
// them recursively would overflow the stack.
impl Drop for SubtreeData {
    fn drop(&mut self) {
        let mut pending: Vec<Subtree> = std::mem::take(&mut self.children);
        for alternative in self.alternatives.drain(..) {
            pending.extend(alternative);
        }
        while let Some(child) = pending.pop() {
            if let Ok(mut data) = Arc::try_unwrap(child) {
                pending.append(&mut data.children);
                for alternative in data.alternatives.drain(..) {
                    pending.extend(alternative);
                }
            }
        }
    }
}
