//! Interface to the syntax-tree provider.
//!
//! The assembler never mutates a tree; it only needs positions, ordered
//! children, a parent link and a node identity. `tree_sitter::Node` is the
//! provider used by this crate, but any parser can plug in by implementing
//! [`SyntaxNode`].

use serde::{Deserialize, Serialize};

/// A zero-based row/column position. Columns are byte offsets within the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    #[must_use]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl From<tree_sitter::Point> for Point {
    fn from(point: tree_sitter::Point) -> Self {
        Self::new(point.row, point.column)
    }
}

/// Read-only view of a node in a concrete syntax tree.
pub trait SyntaxNode: Clone {
    /// Grammar type tag
    fn kind(&self) -> &str;
    fn start_byte(&self) -> usize;
    fn end_byte(&self) -> usize;
    fn start_point(&self) -> Point;
    fn end_point(&self) -> Point;
    /// Children in source order
    fn children(&self) -> Vec<Self>;
    fn parent(&self) -> Option<Self>;
    /// Identity of the node within its tree
    fn id(&self) -> usize;
    /// This node is an error-recovery node
    fn is_error(&self) -> bool;
    /// This node was inserted by the parser to recover from a missing token
    fn is_missing(&self) -> bool;
    /// This node or any descendant is an error or missing node
    fn has_error(&self) -> bool;

    fn child_count(&self) -> usize {
        self.children().len()
    }

    fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }
}

impl<'tree> SyntaxNode for tree_sitter::Node<'tree> {
    fn kind(&self) -> &str {
        tree_sitter::Node::kind(self)
    }

    fn start_byte(&self) -> usize {
        tree_sitter::Node::start_byte(self)
    }

    fn end_byte(&self) -> usize {
        tree_sitter::Node::end_byte(self)
    }

    fn start_point(&self) -> Point {
        self.start_position().into()
    }

    fn end_point(&self) -> Point {
        self.end_position().into()
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.walk();
        tree_sitter::Node::children(self, &mut cursor).collect()
    }

    fn parent(&self) -> Option<Self> {
        tree_sitter::Node::parent(self)
    }

    fn id(&self) -> usize {
        tree_sitter::Node::id(self)
    }

    fn is_error(&self) -> bool {
        tree_sitter::Node::is_error(self)
    }

    fn is_missing(&self) -> bool {
        tree_sitter::Node::is_missing(self)
    }

    fn has_error(&self) -> bool {
        tree_sitter::Node::has_error(self)
    }

    fn child_count(&self) -> usize {
        tree_sitter::Node::child_count(self)
    }
}

/// Maximum number of error sites recorded in a [`ParseErrorInfo`].
pub const MAX_ERROR_SITES: usize = 32;

/// Location of one syntax error reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSite {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: Point,
    pub end: Point,
    /// The parser inserted a token that is absent from the text
    pub missing: bool,
}

/// Non-fatal annotation telling consumers the tree was recovered from syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseErrorInfo {
    /// First error sites in source order
    pub sites: Vec<ErrorSite>,
    /// Sites found beyond [`MAX_ERROR_SITES`]
    pub truncated: usize,
}

impl ParseErrorInfo {
    /// Total number of error sites in the tree
    #[must_use]
    pub fn count(&self) -> usize {
        self.sites.len() + self.truncated
    }
}

/// Collect error and missing nodes under `root`, or `None` for a clean tree.
///
/// Only subtrees that report `has_error` are descended into.
pub fn collect_parse_errors<N: SyntaxNode>(root: &N) -> Option<ParseErrorInfo> {
    if !root.has_error() {
        return None;
    }

    let mut sites = Vec::new();
    let mut truncated = 0usize;
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            if sites.len() < MAX_ERROR_SITES {
                sites.push(ErrorSite {
                    start_byte: node.start_byte(),
                    end_byte: node.end_byte(),
                    start: node.start_point(),
                    end: node.end_point(),
                    missing: node.is_missing(),
                });
            } else {
                truncated += 1;
            }
            // Nested errors inside an ERROR node add no information.
            if node.is_error() {
                continue;
            }
        }

        let children = node.children();
        for child in children.into_iter().rev() {
            if child.has_error() || child.is_missing() {
                stack.push(child);
            }
        }
    }

    if sites.is_empty() && truncated == 0 {
        // has_error was set but no concrete site surfaced; report the root.
        sites.push(ErrorSite {
            start_byte: root.start_byte(),
            end_byte: root.end_byte(),
            start: root.start_point(),
            end: root.end_point(),
            missing: false,
        });
    }

    Some(ParseErrorInfo { sites, truncated })
}
