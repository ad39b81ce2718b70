//! Rebalancing of repetition chains
//!
//! Repetitions compile to auxiliary symbols with the shape `R → R R | item`.
//! A left-associative parse of a long list produces a chain as deep as the
//! list is long, and an edit near its end would rebuild every link. After each
//! parse, fresh chains are flattened and rebuilt as weight-balanced binary
//! trees so that edits touch O(log n) repetition nodes.
//!
//! ```text
//!         R                       R
//!        / \                    /   \
//!       R   d        ──▶       R     R
//!      / \                    / \   / \
//!     R   c                  a   b c   d
//!    / \
//!   a   b
//! ```
//!
//! Only nodes created by the current parse are rebuilt; reused subtrees are
//! already balanced and become single pieces of the new tree.

use std::sync::Arc;

use crate::language::{GrammarTables, Symbol};

use super::subtree::{Subtree, SubtreeData};

pub(crate) struct Balancer<'a> {
    tables: &'a GrammarTables,
    generation: u64,
    /// Nodes created by balancing
    pub allocated: u64,
}

/// Extras preceding one chain element, and the element
struct Group {
    extras: Vec<Subtree>,
    piece: Subtree,
    weight: u64,
}

/// A flattened repetition chain whose pieces are still being balanced
struct Chain {
    symbol: Symbol,
    production_id: u16,
    fragile: bool,
    /// Extras before each piece, in document order
    extras: Vec<Vec<Subtree>>,
    /// Unbalanced pieces
    pieces: Vec<Subtree>,
    trailing: Vec<Subtree>,
}

enum Task {
    Visit(Subtree),
    /// Rebuild a node from the last `children.len()` results
    Node(Subtree),
    /// Rebuild a chain from the last `pieces.len()` results
    Chain(Chain),
}

impl<'a> Balancer<'a> {
    pub fn new(tables: &'a GrammarTables, generation: u64) -> Self {
        Self {
            tables,
            generation,
            allocated: 0,
        }
    }

    /// Rebalance every fresh chain under `tree`.
    ///
    /// Walks post-order with an explicit stack, so arbitrarily deep trees are
    /// fine.
    pub fn balance(&mut self, tree: &Subtree) -> Subtree {
        let mut tasks = vec![Task::Visit(Arc::clone(tree))];
        let mut results: Vec<Subtree> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(tree) => {
                    if tree.generation != self.generation || tree.is_leaf() {
                        results.push(tree);
                    } else if self.is_chain_link(&tree) {
                        let chain = self.flatten_chain(&tree);
                        let pieces: Vec<Subtree> = chain.pieces.iter().rev().cloned().collect();
                        tasks.push(Task::Chain(chain));
                        tasks.extend(pieces.into_iter().map(Task::Visit));
                    } else {
                        let children: Vec<Subtree> = tree.children.iter().rev().cloned().collect();
                        tasks.push(Task::Node(tree));
                        tasks.extend(children.into_iter().map(Task::Visit));
                    }
                }
                Task::Node(tree) => {
                    let children = results.split_off(results.len() - tree.children.len());
                    let changed = children
                        .iter()
                        .zip(&tree.children)
                        .any(|(balanced, child)| !Arc::ptr_eq(balanced, child));
                    if changed {
                        self.allocated += 1;
                        results.push(Arc::new(tree.with_children(children, self.generation)));
                    } else {
                        results.push(tree);
                    }
                }
                Task::Chain(chain) => {
                    let pieces = results.split_off(results.len() - chain.pieces.len());
                    let tree = self.rebuild_chain(chain, pieces);
                    results.push(tree);
                }
            }
        }

        results.pop().unwrap_or_else(|| Arc::clone(tree))
    }

    /// A fresh `R → R R` node of a repetition symbol
    fn is_chain_link(&self, tree: &SubtreeData) -> bool {
        if tree.is_leaf() || tree.is_ambiguous() || !self.tables.is_repeat(tree.symbol) {
            return false;
        }
        let mut structural = tree.children.iter().filter(|child| !child.is_extra());
        matches!(
            (structural.next(), structural.next(), structural.next()),
            (Some(a), Some(b), None) if a.symbol == tree.symbol && b.symbol == tree.symbol
        )
    }

    /// Collect the elements of the chain rooted at `root`
    fn flatten_chain(&self, root: &Subtree) -> Chain {
        let symbol = root.symbol;
        let mut chain = Chain {
            symbol,
            production_id: root.production_id,
            fragile: false,
            extras: Vec::new(),
            pieces: Vec::new(),
            trailing: Vec::new(),
        };

        let mut extras = Vec::new();
        let mut pending = vec![Arc::clone(root)];
        while let Some(tree) = pending.pop() {
            let fresh = tree.generation == self.generation && tree.symbol == symbol;
            if fresh && self.is_chain_link(&tree) {
                chain.fragile |= tree.is_fragile();
                pending.extend(tree.children.iter().rev().cloned());
                continue;
            }
            if tree.is_extra() {
                extras.push(tree);
                continue;
            }
            chain.extras.push(std::mem::take(&mut extras));
            chain.pieces.push(tree);
        }
        chain.trailing = extras;
        chain
    }

    fn rebuild_chain(&mut self, chain: Chain, pieces: Vec<Subtree>) -> Subtree {
        let Chain {
            symbol,
            production_id,
            fragile,
            extras,
            mut trailing,
            ..
        } = chain;
        let mut groups: Vec<Group> = extras
            .into_iter()
            .zip(pieces)
            .map(|(extras, piece)| {
                let weight = extras.iter().map(|extra| u64::from(extra.node_count)).sum::<u64>()
                    + u64::from(piece.node_count);
                Group { extras, piece, weight }
            })
            .collect();

        tracing::trace!(symbol = symbol.0, pieces = groups.len(), "balancing repetition");
        let (mut leading, tree) = self.build(symbol, production_id, fragile, &mut groups[..]);
        if leading.is_empty() && trailing.is_empty() {
            return tree;
        }

        // Chains never start or end with extras; keep any stray ones inside the root
        leading.push(tree);
        leading.append(&mut trailing);
        self.link(symbol, production_id, fragile, leading)
    }

    /// Build a balanced tree over `groups`; returns the hoisted leading extras
    fn build(
        &mut self,
        symbol: Symbol,
        production_id: u16,
        fragile: bool,
        groups: &mut [Group],
    ) -> (Vec<Subtree>, Subtree) {
        if let [group] = groups {
            return (std::mem::take(&mut group.extras), Arc::clone(&group.piece));
        }

        let total: u64 = groups.iter().map(|group| group.weight).sum();
        let mut prefix = 0;
        let mut split = 1;
        for (idx, group) in groups.iter().enumerate().take(groups.len() - 1) {
            let before = prefix;
            prefix += group.weight;
            if prefix * 2 >= total {
                // Put the boundary on whichever side of this group is closer to the middle
                split = if idx > 0 && total - 2 * before < 2 * prefix - total {
                    idx
                } else {
                    idx + 1
                };
                break;
            }
            split = idx + 1;
        }

        let (left_groups, right_groups) = groups.split_at_mut(split);
        let (leading, left) = self.build(symbol, production_id, fragile, left_groups);
        let (middle, right) = self.build(symbol, production_id, fragile, right_groups);

        let mut children = Vec::with_capacity(middle.len() + 2);
        children.push(left);
        children.extend(middle);
        children.push(right);
        (leading, self.link(symbol, production_id, fragile, children))
    }

    fn link(
        &mut self,
        symbol: Symbol,
        production_id: u16,
        fragile: bool,
        children: Vec<Subtree>,
    ) -> Subtree {
        self.allocated += 1;
        let mut data =
            SubtreeData::node(self.tables, symbol, children, production_id, 0, self.generation);
        data.flags.fragile = fragile;
        Arc::new(data)
    }
}
