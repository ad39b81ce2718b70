//! Error recovery
//!
//! Runs when every version is paused. The cheapest applicable strategy is
//! applied to the best paused version:
//!
//! ```text
//! 1. MISSING   a zero-width token after which the lookahead is valid
//! 2. resync    pop frames into an ERROR until a state accepts the lookahead
//! 3. skip      wrap the lookahead into an ERROR (at end of input: wrap the
//!              whole stack and finish)
//! ```
//!
//! Attempts are counted per position, so a version that keeps failing at the
//! same spot eventually skips, and every skip consumes input.

use std::sync::Arc;

use crate::language::Symbol;
use crate::tree::subtree::{Subtree, SubtreeData};

use super::ParseRun;
use super::config::Interrupt;
use super::stack::{Lookahead, RecoveryState, StackNode, Status};

const MAX_RECOVERY_ATTEMPTS: u32 = 3;
const MAX_MISSING_PER_POSITION: u32 = 1;

impl<I: Interrupt> ParseRun<'_, I> {
    pub(super) fn recover(&mut self, index: usize) -> Result<(), I::Error> {
        self.interrupt.poll()?;
        self.stats.recoveries += 1;

        let version = &mut self.versions[index];
        version.status = Status::Active;
        let Some(lookahead) = version.lookahead.clone() else {
            return Ok(());
        };
        let position = version.position().byte_len();
        if version.recovery.position != position {
            version.recovery = RecoveryState {
                position,
                ..RecoveryState::default()
            };
        }
        version.recovery.attempts += 1;
        let exhausted = version.recovery.attempts > MAX_RECOVERY_ATTEMPTS;
        tracing::debug!(
            position,
            symbol = self.tables.symbol_name(lookahead.subtree.symbol),
            attempt = self.versions[index].recovery.attempts,
            "recovering from syntax error"
        );

        let symbol = lookahead.subtree.symbol;
        let recovered = !exhausted
            && (self.insert_missing(index, symbol)
                || self.resynchronize(index, &lookahead.subtree));
        if recovered {
            return Ok(());
        }
        if symbol == Symbol::END {
            self.wrap_stack(index);
        } else {
            self.skip_lookahead(index, lookahead);
        }
        Ok(())
    }

    /// Shift a zero-width token of the first kind after which `lookahead`
    /// can be consumed
    fn insert_missing(&mut self, index: usize, lookahead: Symbol) -> bool {
        let version = &self.versions[index];
        if lookahead.is_error() || version.recovery.missing >= MAX_MISSING_PER_POSITION {
            return false;
        }
        let state = version.state();
        let tables = self.tables;
        let Some((missing, next)) = tables
            .shiftable_terminals(state)
            .find(|&(_, next)| tables.accepts(next, lookahead))
        else {
            return false;
        };

        tracing::trace!(symbol = tables.symbol_name(missing), state, "inserting missing token");
        let mode = tables.lex_mode(state);
        let leaf = Arc::new(SubtreeData::missing(tables, missing, mode, self.generation));
        self.stats.nodes_allocated += 1;
        let version = &mut self.versions[index];
        version.recovery.missing += 1;
        version.top = StackNode::push(Arc::clone(&version.top), next, leaf);
        true
    }

    /// Pop frames into an ERROR extra until a state that accepts `lookahead`
    /// is on top, unless skipping the lookahead is cheaper
    fn resynchronize(&mut self, index: usize, lookahead_tree: &Subtree) -> bool {
        let lookahead = lookahead_tree.symbol;
        if lookahead.is_error() {
            return false;
        }
        let top = Arc::clone(&self.versions[index].top);
        let mut popped = Vec::new();
        let mut frame = &top;
        loop {
            let (Some(subtree), Some(prev)) = (&frame.subtree, &frame.prev) else {
                return false;
            };
            popped.push(Arc::clone(subtree));
            frame = prev;
            if self.tables.accepts(frame.state, lookahead) {
                break;
            }
        }
        popped.reverse();
        let base = Arc::clone(frame);

        let error = self.error_extra(popped);
        if lookahead != Symbol::END {
            let skipped = vec![Arc::clone(lookahead_tree)];
            let skip = SubtreeData::error(self.tables, skipped, self.generation);
            if skip.error_cost < error.error_cost {
                return false;
            }
        }
        tracing::trace!(state = base.state, cost = error.error_cost, "resynchronizing stack");
        let state = base.state;
        self.versions[index].top = StackNode::push(base, state, error);
        true
    }

    /// Skip the lookahead, extending an ERROR right below it if there is one
    fn skip_lookahead(&mut self, index: usize, lookahead: Lookahead) {
        let version = &self.versions[index];
        let mut frame = &version.top;
        let mut trailing = Vec::new();
        while let (Some(subtree), Some(prev)) = (&frame.subtree, &frame.prev) {
            if !subtree.is_extra() || subtree.is_error() {
                break;
            }
            trailing.push(Arc::clone(subtree));
            frame = prev;
        }

        let (base, children) = match (&frame.subtree, &frame.prev) {
            (Some(previous), Some(prev)) if previous.is_error() && previous.is_extra() => {
                let mut children = vec![Arc::clone(previous)];
                children.extend(trailing.into_iter().rev());
                children.push(Arc::clone(&lookahead.subtree));
                (Arc::clone(prev), children)
            }
            _ => (Arc::clone(&version.top), vec![Arc::clone(&lookahead.subtree)]),
        };
        tracing::trace!(
            symbol = self.tables.symbol_name(lookahead.subtree.symbol),
            bytes = lookahead.subtree.size.byte_len(),
            "skipping token"
        );

        let error = self.error_extra(children);
        let state = base.state;
        let version = &mut self.versions[index];
        if lookahead.subtree.flags.has_external_tokens {
            version.last_external = lookahead.subtree.last_external_state().cloned();
        }
        version.top = StackNode::push(base, state, error);
        version.lookahead = None;
    }

    /// Finish with everything on the stack under an ERROR root
    fn wrap_stack(&mut self, index: usize) {
        let subtrees = StackNode::subtrees(&self.versions[index].top);
        tracing::trace!(subtrees = subtrees.len(), "wrapping stack at end of input");
        let root = Arc::new(SubtreeData::error(self.tables, subtrees, self.generation));
        self.stats.nodes_allocated += 1;
        self.finish(root);
        self.versions[index].status = Status::Halted;
    }

    fn error_extra(&mut self, children: Vec<Subtree>) -> Subtree {
        let mut error = SubtreeData::error(self.tables, children, self.generation);
        error.flags.extra = true;
        self.stats.nodes_allocated += 1;
        Arc::new(error)
    }
}
