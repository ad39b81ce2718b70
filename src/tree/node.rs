//! Read-only node handles
//!
//! Subtrees know neither their position nor their parent. The first time a
//! tree is inspected, its visible nodes are laid out in an arena with absolute
//! positions and index-based parent links; [`Node`] is a (tree, index) pair
//! into that arena.
//!
//! Hidden nodes are transparent: their visible descendants become children of
//! the nearest visible ancestor, and a field on a hidden node is inherited by
//! those descendants.

use std::fmt::{self, Write as _};

use text_size::{TextRange, TextSize};

use crate::base::{Length, Point};
use crate::language::{FieldId, GrammarTables, Symbol};

use super::SyntaxTree;
use super::cursor::TreeCursor;
use super::subtree::Subtree;

/// Index of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub subtree: Subtree,
    pub start: Length,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub field: Option<FieldId>,
    /// Position among the parent's children
    pub index: u32,
}

#[derive(Debug)]
pub(crate) struct Arena {
    nodes: Vec<NodeData>,
}

impl Arena {
    pub fn build(root: &Subtree, tables: &GrammarTables) -> Self {
        let mut nodes = vec![NodeData {
            subtree: root.clone(),
            start: Length::ZERO,
            parent: None,
            children: Vec::new(),
            field: None,
            index: 0,
        }];

        // (subtree, absolute start, visible parent, field)
        let mut pending: Vec<(Subtree, Length, NodeId, Option<FieldId>)> = Vec::new();
        push_children(&mut pending, root, Length::ZERO, NodeId::ROOT, None, tables);

        while let Some((tree, start, parent, field)) = pending.pop() {
            if tree.flags.visible {
                let id = NodeId(nodes.len() as u32);
                let previous_end = nodes[parent.index()].children.last().map(|last| {
                    let sibling = &nodes[last.index()];
                    (sibling.start + sibling.subtree.size).bytes
                });
                debug_assert!(
                    previous_end.is_none_or(|end| end <= start.bytes),
                    "siblings overlap"
                );
                let siblings = &mut nodes[parent.index()].children;
                let index = siblings.len() as u32;
                siblings.push(id);
                nodes.push(NodeData {
                    subtree: tree.clone(),
                    start,
                    parent: Some(parent),
                    children: Vec::new(),
                    field,
                    index,
                });
                push_children(&mut pending, &tree, start, id, None, tables);
            } else {
                push_children(&mut pending, &tree, start, parent, field, tables);
            }
        }

        Self { nodes }
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// Queue the children of `tree` so that they pop in document order
fn push_children(
    pending: &mut Vec<(Subtree, Length, NodeId, Option<FieldId>)>,
    tree: &Subtree,
    start: Length,
    parent: NodeId,
    inherited: Option<FieldId>,
    tables: &GrammarTables,
) {
    if tree.children.is_empty() {
        return;
    }
    let field_map = tables.field_map(tree.production_id);
    let mut items = Vec::with_capacity(tree.children.len());
    let mut offset = start;
    let mut structural = 0u16;
    for child in &tree.children {
        let field = if child.is_extra() {
            None
        } else {
            let field = field_map
                .iter()
                .find(|(index, _)| *index == structural)
                .map(|(_, field)| *field);
            structural += 1;
            field
        };
        items.push((child.clone(), offset, parent, field.or(inherited)));
        offset = offset + child.size;
    }
    pending.extend(items.into_iter().rev());
}

/// A visible node of a [`SyntaxTree`]
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl<'t> Node<'t> {
    pub(crate) fn new(tree: &'t SyntaxTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    #[inline]
    fn data(&self) -> &'t NodeData {
        self.tree.arena().get(self.id)
    }

    #[inline]
    fn tables(&self) -> &'t GrammarTables {
        self.tree.language().tables()
    }

    fn node(&self, id: NodeId) -> Node<'t> {
        Node::new(self.tree, id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn symbol(&self) -> Symbol {
        self.data().subtree.symbol
    }

    /// Grammar name of the node's symbol (`ERROR` for error nodes)
    pub fn kind(&self) -> &'t str {
        self.tables().symbol_name(self.symbol())
    }

    pub fn is_named(&self) -> bool {
        self.data().subtree.flags.named
    }

    pub fn is_error(&self) -> bool {
        self.data().subtree.is_error()
    }

    pub fn is_missing(&self) -> bool {
        self.data().subtree.is_missing()
    }

    pub fn is_extra(&self) -> bool {
        self.data().subtree.is_extra()
    }

    /// Whether this node or a descendant is an error or missing node
    pub fn has_error(&self) -> bool {
        self.data().subtree.has_error()
    }

    pub fn has_changes(&self) -> bool {
        self.data().subtree.has_changes()
    }

    pub fn start_byte(&self) -> u32 {
        self.data().start.byte_len()
    }

    pub fn end_byte(&self) -> u32 {
        self.end().byte_len()
    }

    pub fn byte_range(&self) -> TextRange {
        TextRange::new(TextSize::new(self.start_byte()), TextSize::new(self.end_byte()))
    }

    pub fn start_position(&self) -> Point {
        self.data().start.extent
    }

    pub fn end_position(&self) -> Point {
        self.end().extent
    }

    fn end(&self) -> Length {
        let data = self.data();
        data.start + data.subtree.size
    }

    /// Source text of the node, when the tree still has its source
    pub fn text(&self) -> Option<&'t str> {
        let range = self.byte_range();
        self.tree.source()?.get(usize::from(range.start())..usize::from(range.end()))
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|id| self.node(id))
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        self.data().children.get(index).map(|id| self.node(*id))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = Node<'t>> + use<'t> {
        let tree = self.tree;
        self.data().children.iter().map(move |id| Node::new(tree, *id))
    }

    pub fn named_children(&self) -> impl DoubleEndedIterator<Item = Node<'t>> + use<'t> {
        self.children().filter(Node::is_named)
    }

    pub fn named_child_count(&self) -> usize {
        self.named_children().count()
    }

    pub fn named_child(&self, index: usize) -> Option<Node<'t>> {
        self.named_children().nth(index)
    }

    fn sibling(&self, delta: isize) -> Option<Node<'t>> {
        let data = self.data();
        let parent = self.tree.arena().get(data.parent?);
        let index = (data.index as isize).checked_add(delta)?;
        let index = usize::try_from(index).ok()?;
        parent.children.get(index).map(|id| self.node(*id))
    }

    pub fn next_sibling(&self) -> Option<Node<'t>> {
        self.sibling(1)
    }

    pub fn prev_sibling(&self) -> Option<Node<'t>> {
        self.sibling(-1)
    }

    pub fn next_named_sibling(&self) -> Option<Node<'t>> {
        let mut node = self.next_sibling()?;
        while !node.is_named() {
            node = node.next_sibling()?;
        }
        Some(node)
    }

    pub fn prev_named_sibling(&self) -> Option<Node<'t>> {
        let mut node = self.prev_sibling()?;
        while !node.is_named() {
            node = node.prev_sibling()?;
        }
        Some(node)
    }

    // ------------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------------

    pub fn field_id(&self) -> Option<FieldId> {
        self.data().field
    }

    /// Name of the field this node fills in its parent
    pub fn field_name(&self) -> Option<&'t str> {
        self.tables().field_name(self.data().field?)
    }

    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'t>> {
        self.children().find(|child| child.field_id() == Some(field))
    }

    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'t>> {
        self.child_by_field_id(self.tables().field_id_for_name(name)?)
    }

    pub fn children_by_field_name(&self, name: &str) -> impl Iterator<Item = Node<'t>> + use<'t> {
        let field = self.tables().field_id_for_name(name);
        self.children()
            .filter(move |child| field.is_some() && child.field_id() == field)
    }

    // ------------------------------------------------------------------------
    // Descendant lookup
    // ------------------------------------------------------------------------

    /// Smallest node that spans `start..end`
    pub fn descendant_for_byte_range(&self, start: u32, end: u32) -> Option<Node<'t>> {
        self.descend(false, |node| (node.start_byte(), node.end_byte()), (start, end))
    }

    /// Smallest named node that spans `start..end`
    pub fn named_descendant_for_byte_range(&self, start: u32, end: u32) -> Option<Node<'t>> {
        self.descend(true, |node| (node.start_byte(), node.end_byte()), (start, end))
    }

    pub fn descendant_for_point_range(&self, start: Point, end: Point) -> Option<Node<'t>> {
        self.descend(false, |node| (node.start_position(), node.end_position()), (start, end))
    }

    pub fn named_descendant_for_point_range(&self, start: Point, end: Point) -> Option<Node<'t>> {
        self.descend(true, |node| (node.start_position(), node.end_position()), (start, end))
    }

    fn descend<P: Ord + Copy>(
        &self,
        named: bool,
        span: impl Fn(&Node<'t>) -> (P, P),
        range: (P, P),
    ) -> Option<Node<'t>> {
        let (start, end) = range;
        let (own_start, own_end) = span(self);
        if start < own_start || end > own_end {
            return None;
        }

        let mut node = *self;
        let mut last_named = *self;
        'descend: loop {
            for child in node.children() {
                let (child_start, child_end) = span(&child);
                // The child must reach the end of the range and extend past its start
                if child_end < end || child_end <= start {
                    continue;
                }
                if child_start > start {
                    break;
                }
                node = child;
                if node.is_named() {
                    last_named = node;
                }
                continue 'descend;
            }
            break;
        }
        Some(if named { last_named } else { node })
    }

    pub fn walk(&self) -> TreeCursor<'t> {
        TreeCursor::new(*self)
    }

    /// Render the named structure as an S-expression
    ///
    /// Anonymous nodes are omitted unless they are missing; missing nodes
    /// render as `(MISSING kind)`.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        // `None` closes the innermost open node
        let mut stack = vec![Some((*self, false))];
        while let Some(item) = stack.pop() {
            let Some((node, nested)) = item else {
                out.push(')');
                continue;
            };
            if nested {
                out.push(' ');
                if let Some(field) = node.field_name() {
                    out.push_str(field);
                    out.push_str(": ");
                }
            }
            if node.is_missing() {
                if node.is_named() {
                    let _ = write!(out, "(MISSING {})", node.kind());
                } else {
                    let _ = write!(out, "(MISSING {:?})", node.kind());
                }
                continue;
            }
            out.push('(');
            out.push_str(node.kind());
            stack.push(None);
            let children: Vec<Node<'_>> = node
                .children()
                .filter(|child| child.is_named() || child.is_missing())
                .collect();
            stack.extend(children.into_iter().rev().map(|child| Some((child, true))));
        }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Node {} {} - {}}}",
            self.kind(),
            self.start_position(),
            self.end_position()
        )
    }
}
