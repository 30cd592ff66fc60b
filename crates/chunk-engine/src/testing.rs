//! Hand-built syntax trees for unit tests that need exact node shapes.

use crate::syntax::{Point, SyntaxNode};

/// Shape of a node to build: leaves carry explicit byte ranges, branches span their children.
pub(crate) enum Shape {
    Leaf(&'static str, usize, usize),
    Branch(&'static str, Vec<Shape>),
}

pub(crate) fn leaf(kind: &'static str, start: usize, end: usize) -> Shape {
    Shape::Leaf(kind, start, end)
}

pub(crate) fn branch(kind: &'static str, children: Vec<Shape>) -> Shape {
    Shape::Branch(kind, children)
}

/// Leaf covering the first occurrence of `needle` in `text`.
pub(crate) fn leaf_of(text: &str, kind: &'static str, needle: &str) -> Shape {
    let start = text.find(needle).expect("needle not in text");
    Shape::Leaf(kind, start, start + needle.len())
}

#[derive(Debug)]
struct NodeData {
    kind: &'static str,
    start: usize,
    end: usize,
    start_point: Point,
    end_point: Point,
    children: Vec<usize>,
    parent: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct MockTree {
    nodes: Vec<NodeData>,
}

impl MockTree {
    /// Build a tree whose root spans all of `text` and has `children` as top-level nodes.
    pub(crate) fn build(text: &str, children: Vec<Shape>) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.nodes.push(NodeData {
            kind: "root",
            start: 0,
            end: text.len(),
            start_point: point_at(text, 0),
            end_point: point_at(text, text.len()),
            children: Vec::new(),
            parent: None,
        });
        for shape in children {
            let child = tree.add(text, shape, 0);
            tree.nodes[0].children.push(child);
        }
        tree
    }

    fn add(&mut self, text: &str, shape: Shape, parent: usize) -> usize {
        let idx = self.nodes.len();
        match shape {
            Shape::Leaf(kind, start, end) => {
                self.nodes.push(NodeData {
                    kind,
                    start,
                    end,
                    start_point: point_at(text, start),
                    end_point: point_at(text, end),
                    children: Vec::new(),
                    parent: Some(parent),
                });
            }
            Shape::Branch(kind, shapes) => {
                self.nodes.push(NodeData {
                    kind,
                    start: 0,
                    end: 0,
                    start_point: Point::default(),
                    end_point: Point::default(),
                    children: Vec::new(),
                    parent: Some(parent),
                });
                let mut children = Vec::new();
                for shape in shapes {
                    children.push(self.add(text, shape, idx));
                }
                let start = children.first().map_or(0, |&c| self.nodes[c].start);
                let end = children.last().map_or(0, |&c| self.nodes[c].end);
                let node = &mut self.nodes[idx];
                node.start = start;
                node.end = end;
                node.start_point = point_at(text, start);
                node.end_point = point_at(text, end);
                node.children = children;
            }
        }
        idx
    }

    pub(crate) fn root(&self) -> MockNode<'_> {
        MockNode { tree: self, idx: 0 }
    }
}

fn point_at(text: &str, offset: usize) -> Point {
    let before = &text[..offset];
    let row = before.matches('\n').count();
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1);
    Point::new(row, column)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MockNode<'t> {
    tree: &'t MockTree,
    idx: usize,
}

impl<'t> MockNode<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.idx]
    }
}

impl SyntaxNode for MockNode<'_> {
    fn kind(&self) -> &str {
        self.data().kind
    }

    fn start_byte(&self) -> usize {
        self.data().start
    }

    fn end_byte(&self) -> usize {
        self.data().end
    }

    fn start_point(&self) -> Point {
        self.data().start_point
    }

    fn end_point(&self) -> Point {
        self.data().end_point
    }

    fn children(&self) -> Vec<Self> {
        self.data()
            .children
            .iter()
            .map(|&idx| MockNode {
                tree: self.tree,
                idx,
            })
            .collect()
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|idx| MockNode {
            tree: self.tree,
            idx,
        })
    }

    fn id(&self) -> usize {
        self.idx
    }

    fn is_error(&self) -> bool {
        self.data().kind == "ERROR"
    }

    fn is_missing(&self) -> bool {
        false
    }

    fn has_error(&self) -> bool {
        self.is_error() || self.children().iter().any(SyntaxNode::has_error)
    }
}
