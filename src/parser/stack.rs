//! Persistent parse stacks
//!
//! Every stack version is a linked list of frames sharing its tail with the
//! versions it was forked from:
//!
//! ```text
//! v0: [s0] ← [s3 a] ← [s5 b]
//!                  ↖
//! v1:               [s4 B] ← [s6 c]
//! ```
//!
//! Frames carry cumulative error cost and dynamic precedence so versions can
//! be compared without walking their stacks.

use std::sync::Arc;

use crate::base::Length;
use crate::language::StateId;
use crate::tree::subtree::Subtree;

/// Frames inspected below two merged tops when looking for an ambiguity
const MAX_AMBIGUITY_DEPTH: usize = 8;

pub(crate) struct StackNode {
    pub state: StateId,
    /// End of this frame's subtree
    pub position: Length,
    /// `None` only for the bottom frame
    pub subtree: Option<Subtree>,
    pub prev: Option<Arc<StackNode>>,
    pub error_cost: u32,
    pub dynamic_precedence: i32,
}

impl StackNode {
    pub fn bottom(state: StateId) -> Arc<Self> {
        Arc::new(Self {
            state,
            position: Length::ZERO,
            subtree: None,
            prev: None,
            error_cost: 0,
            dynamic_precedence: 0,
        })
    }

    pub fn push(prev: Arc<Self>, state: StateId, subtree: Subtree) -> Arc<Self> {
        Arc::new(Self {
            state,
            position: prev.position + subtree.size,
            error_cost: prev.error_cost.saturating_add(subtree.error_cost),
            dynamic_precedence: prev.dynamic_precedence + subtree.dynamic_precedence,
            subtree: Some(subtree),
            prev: Some(prev),
        })
    }

    /// All subtrees from the bottom of the stack to `top`
    pub fn subtrees(top: &Arc<Self>) -> Vec<Subtree> {
        let mut subtrees = Vec::new();
        let mut frame = Some(top);
        while let Some(node) = frame {
            subtrees.extend(node.subtree.iter().cloned());
            frame = node.prev.as_ref();
        }
        subtrees.reverse();
        subtrees
    }
}

// Unbalanced stacks can be as deep as the input is long.
impl Drop for StackNode {
    fn drop(&mut self) {
        let mut next = self.prev.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.prev.take(),
                Err(_) => break,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Active,
    /// No action for the lookahead; waiting for error recovery
    Paused,
    /// Accepted or abandoned
    Halted,
}

/// A token or reused subtree waiting to be consumed
#[derive(Clone)]
pub(crate) struct Lookahead {
    pub subtree: Subtree,
    pub reused: bool,
}

/// Recovery attempts at the version's current position
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RecoveryState {
    pub position: u32,
    pub attempts: u32,
    pub missing: u32,
}

#[derive(Clone)]
pub(crate) struct Version {
    pub top: Arc<StackNode>,
    pub status: Status,
    /// Scanner state after the last external token shifted
    pub last_external: Option<Arc<[u8]>>,
    pub lookahead: Option<Lookahead>,
    /// Position where a zero-width external token was shifted
    pub empty_external_at: Option<u32>,
    pub recovery: RecoveryState,
}

impl Version {
    pub fn new(start_state: StateId) -> Self {
        Self {
            top: StackNode::bottom(start_state),
            status: Status::Active,
            last_external: None,
            lookahead: None,
            empty_external_at: None,
            recovery: RecoveryState::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> StateId {
        self.top.state
    }

    #[inline]
    pub fn position(&self) -> Length {
        self.top.position
    }

    pub fn error_cost(&self) -> u32 {
        match self.status {
            Status::Paused => self
                .top
                .error_cost
                .saturating_add(crate::tree::subtree::ERROR_COST_PER_RECOVERY),
            _ => self.top.error_cost,
        }
    }

    pub fn dynamic_precedence(&self) -> i32 {
        self.top.dynamic_precedence
    }

    /// Whether `self` should survive over `other`, all else being equal
    pub fn is_better_than(&self, other: &Version) -> bool {
        (self.error_cost(), std::cmp::Reverse(self.dynamic_precedence()))
            < (other.error_cost(), std::cmp::Reverse(other.dynamic_precedence()))
    }
}

/// Record the derivation on `other`'s stack as an alternative on `keep`'s.
///
/// Both stacks end in the same state at the same position. Walking down from
/// the tops past frames holding the same token, the first frame where the two
/// subtrees differ but cover the same text with the same symbol gets the other
/// subtree's children as an alternative. Returns the rebuilt stack, or `None`
/// when no such frame exists.
pub(crate) fn merge_alternatives(
    keep: &Arc<StackNode>,
    other: &Arc<StackNode>,
) -> Option<Arc<StackNode>> {
    let mut above: Vec<Arc<StackNode>> = Vec::new();
    let mut a = Arc::clone(keep);
    let mut b = Arc::clone(other);

    for _ in 0..MAX_AMBIGUITY_DEPTH {
        if Arc::ptr_eq(&a, &b) || a.state != b.state || a.position.bytes != b.position.bytes {
            return None;
        }
        let (Some(x), Some(y)) = (&a.subtree, &b.subtree) else {
            return None;
        };

        let same_token = x.is_leaf() && y.is_leaf() && x.symbol == y.symbol && x.size == y.size;
        if Arc::ptr_eq(x, y) || same_token {
            let (Some(next_a), Some(next_b)) = (a.prev.clone(), b.prev.clone()) else {
                return None;
            };
            above.push(a);
            a = next_a;
            b = next_b;
            continue;
        }

        if x.symbol != y.symbol || x.size != y.size || x.is_leaf() || y.is_leaf() {
            return None;
        }
        tracing::trace!(symbol = x.symbol.0, "recording ambiguous derivation");
        let merged = Arc::new(x.with_alternative(y.children.clone()));
        let mut top = StackNode::push(a.prev.clone()?, a.state, merged);
        for frame in above.iter().rev() {
            top = StackNode::push(top, frame.state, frame.subtree.clone()?);
        }
        return Some(top);
    }
    None
}
