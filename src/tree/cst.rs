//! Export to rowan green trees
//!
//! Hosts that already work with rowan can convert a parsed tree into a
//! lossless green tree. Raw kinds are grammar symbol ids; hidden interior
//! nodes are flattened, every leaf becomes a token so the text round-trips.

use rowan::{GreenNode, GreenNodeBuilder};

use crate::language::Symbol;

use super::subtree::Subtree;

/// Rowan language whose kinds are raw grammar symbol ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroveLanguage {}

impl rowan::Language for GroveLanguage {
    type Kind = rowan::SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind
    }
}

pub type SyntaxNode = rowan::SyntaxNode<GroveLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<GroveLanguage>;

impl From<Symbol> for rowan::SyntaxKind {
    fn from(symbol: Symbol) -> Self {
        Self(symbol.0)
    }
}

/// Build the green tree of `root` over `source`
pub(crate) fn build_green(root: &Subtree, source: &str) -> GreenNode {
    enum Step {
        Enter(Subtree, usize),
        Exit,
    }

    let mut builder = GreenNodeBuilder::new();
    builder.start_node(root.symbol.into());
    let mut pending: Vec<Step> = Vec::new();
    push_children(&mut pending, root, 0);

    while let Some(step) = pending.pop() {
        match step {
            Step::Enter(tree, start) => {
                if tree.is_leaf() {
                    let end = start + tree.size.byte_len() as usize;
                    builder.token(tree.symbol.into(), source.get(start..end).unwrap_or(""));
                } else if tree.flags.visible {
                    builder.start_node(tree.symbol.into());
                    pending.push(Step::Exit);
                    push_children(&mut pending, &tree, start);
                } else {
                    push_children(&mut pending, &tree, start);
                }
            }
            Step::Exit => builder.finish_node(),
        }
    }

    fn push_children(pending: &mut Vec<Step>, tree: &Subtree, start: usize) {
        let mut offset = start;
        let mut steps = Vec::with_capacity(tree.children.len());
        for child in &tree.children {
            steps.push(Step::Enter(child.clone(), offset));
            offset += child.size.byte_len() as usize;
        }
        pending.extend(steps.into_iter().rev());
    }

    builder.finish_node();
    builder.finish()
}
