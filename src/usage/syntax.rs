//! Index-addressed syntax tree
//!
//! The named nodes of a tree-sitter tree are copied into a flat arena in
//! pre-order. Children and parents are plain indices, so visitors are loops
//! over the arena rather than recursive descents sharing one cursor.

use tree_sitter::Tree;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: &'static str,
    /// Field name under which the node hangs off its parent
    pub field: Option<&'static str>,
    pub start_byte: usize,
    pub end_byte: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in bytes)
    pub column: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct SyntaxTree<'src> {
    source: &'src str,
    nodes: Vec<SyntaxNode>,
    /// Position of the first ERROR or MISSING node, if any
    first_error: Option<(usize, usize)>,
}

impl<'src> SyntaxTree<'src> {
    /// Flatten `tree`, which must have been parsed from `source`.
    pub fn from_tree(tree: &Tree, source: &'src str) -> Self {
        let mut nodes: Vec<SyntaxNode> = Vec::new();
        let mut first_error = None;
        let mut cursor = tree.walk();
        // Arena id of every node on the cursor path (None for anonymous nodes)
        let mut path: Vec<Option<NodeId>> = Vec::new();

        'walk: loop {
            let node = cursor.node();
            let start = node.start_position();

            if first_error.is_none() && (node.is_error() || node.is_missing()) {
                first_error = Some((start.row + 1, start.column + 1));
            }

            let id = if node.is_named() {
                let id = nodes.len();
                let parent = path.iter().rev().find_map(|ancestor| *ancestor);
                nodes.push(SyntaxNode {
                    kind: node.kind(),
                    field: cursor.field_name(),
                    start_byte: node.start_byte(),
                    end_byte: node.end_byte(),
                    line: start.row + 1,
                    column: start.column + 1,
                    parent,
                    children: Vec::new(),
                });
                if let Some(parent) = parent {
                    nodes[parent].children.push(id);
                }
                Some(id)
            } else {
                None
            };

            if cursor.goto_first_child() {
                path.push(id);
                continue;
            }

            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    break 'walk;
                }
                path.pop();
            }
        }

        if first_error.is_none() && tree.root_node().has_error() {
            first_error = Some((1, 1));
        }

        Self {
            source,
            nodes,
            first_error,
        }
    }

    pub fn first_error(&self) -> Option<(usize, usize)> {
        self.first_error
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    /// All nodes in pre-order (source order)
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn text(&self, id: NodeId) -> &'src str {
        let node = &self.nodes[id];
        self.source.get(node.start_byte..node.end_byte).unwrap_or("")
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children_by_field(id, field).next()
    }

    pub fn children_by_field<'a>(
        &'a self,
        id: NodeId,
        field: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(move |child| self.nodes[*child].field == Some(field))
    }
}
