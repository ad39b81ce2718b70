//! Stateful tree walking

use super::node::{Node, NodeId};

/// Cursor over the visible nodes below the node it was created from
#[derive(Clone)]
pub struct TreeCursor<'t> {
    root: Node<'t>,
    node: Node<'t>,
    depth: u32,
}

impl<'t> TreeCursor<'t> {
    pub fn new(root: Node<'t>) -> Self {
        Self {
            root,
            node: root,
            depth: 0,
        }
    }

    pub fn node(&self) -> Node<'t> {
        self.node
    }

    /// Depth relative to the cursor's root
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn field_name(&self) -> Option<&'t str> {
        if self.node == self.root {
            return None;
        }
        self.node.field_name()
    }

    pub fn goto_first_child(&mut self) -> bool {
        match self.node.child(0) {
            Some(child) => {
                self.node = child;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    pub fn goto_last_child(&mut self) -> bool {
        match self.node.children().next_back() {
            Some(child) => {
                self.node = child;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    pub fn goto_parent(&mut self) -> bool {
        if self.node == self.root {
            return false;
        }
        match self.node.parent() {
            Some(parent) => {
                self.node = parent;
                self.depth -= 1;
                true
            }
            None => false,
        }
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        if self.node == self.root {
            return false;
        }
        match self.node.next_sibling() {
            Some(sibling) => {
                self.node = sibling;
                true
            }
            None => false,
        }
    }

    pub fn goto_previous_sibling(&mut self) -> bool {
        if self.node == self.root {
            return false;
        }
        match self.node.prev_sibling() {
            Some(sibling) => {
                self.node = sibling;
                true
            }
            None => false,
        }
    }

    /// Move to the first child that extends past `byte`; returns its index
    pub fn goto_first_child_for_byte(&mut self, byte: u32) -> Option<usize> {
        let (index, child) = self
            .node
            .children()
            .enumerate()
            .find(|(_, child)| child.end_byte() > byte)?;
        self.node = child;
        self.depth += 1;
        Some(index)
    }

    /// Jump to `node`, which becomes the new root of the cursor
    pub fn reset(&mut self, node: Node<'t>) {
        self.root = node;
        self.node = node;
        self.depth = 0;
    }

    pub fn node_id(&self) -> NodeId {
        self.node.id()
    }
}

/// Preorder iterator over visible nodes
pub struct Preorder<'t> {
    cursor: TreeCursor<'t>,
    done: bool,
}

impl<'t> Preorder<'t> {
    pub(crate) fn new(root: Node<'t>) -> Self {
        Self {
            cursor: TreeCursor::new(root),
            done: false,
        }
    }
}

impl<'t> Iterator for Preorder<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        if self.done {
            return None;
        }
        let node = self.cursor.node();
        if !self.cursor.goto_first_child() {
            loop {
                if self.cursor.goto_next_sibling() {
                    break;
                }
                if !self.cursor.goto_parent() {
                    self.done = true;
                    break;
                }
            }
        }
        Some(node)
    }
}
