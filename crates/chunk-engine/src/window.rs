//! Greedy packing of syntax nodes into size-bounded windows.
//!
//! The assigner walks sibling nodes in source order and packs them while the
//! NWS size of the packed span fits the budget. A node that is oversized on
//! its own is descended into when its children carry all of its text; any
//! other oversized node is split at line boundaries. The merger then
//! coalesces adjacent windows whose combined span still fits.

use crate::size::SizeModel;
use crate::syntax::SyntaxNode;
use crate::types::LineRange;
use std::collections::VecDeque;
use std::sync::Arc;

/// Nodes assigned to one future chunk
#[derive(Debug, Clone)]
pub(crate) struct Window<N> {
    pub nodes: Vec<N>,
    /// NWS size of the text the window rebuilds to
    pub size: usize,
    /// The window holds a line-split fragment of a single oversized node
    pub is_partial: bool,
    /// Lines covered by a partial window; empty for normal windows
    pub line_ranges: Vec<LineRange>,
}

impl<N> Default for Window<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            size: 0,
            is_partial: false,
            line_ranges: Vec::new(),
        }
    }
}

impl<N: SyntaxNode> Window<N> {
    fn partial(node: N, lines: LineRange, size: usize) -> Self {
        Self {
            nodes: vec![node],
            size,
            is_partial: true,
            line_ranges: vec![lines],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Byte span a normal window rebuilds to: first node start to last node end
    fn span(&self) -> Option<(usize, usize)> {
        Some((self.nodes.first()?.start_byte(), self.nodes.last()?.end_byte()))
    }

    /// Add `node`; `joined_size` is the NWS size of the span once it is added.
    fn push(&mut self, node: N, joined_size: usize) {
        self.nodes.push(node);
        self.size = joined_size;
    }

    /// Normal windows merge when the joined span fits, gap text included.
    /// Partial fragments only merge with the next fragment of the same node.
    fn can_merge(&self, next: &Self, sizes: &SizeModel, max_size: usize) -> bool {
        match (self.is_partial, next.is_partial) {
            (false, false) => match (self.span(), next.span()) {
                (Some((start, _)), Some((_, end))) => sizes.query(start, end) <= max_size,
                _ => false,
            },
            (true, true) => {
                let same_node = match (self.nodes.last(), next.nodes.first()) {
                    (Some(a), Some(b)) => a.id() == b.id(),
                    _ => false,
                };
                let contiguous = match (self.line_ranges.last(), next.line_ranges.first()) {
                    (Some(a), Some(b)) => a.end + 1 == b.start,
                    _ => false,
                };
                same_node && contiguous && self.size + next.size <= max_size
            }
            _ => false,
        }
    }

    fn merge(&mut self, other: Self, sizes: &SizeModel) {
        for node in other.nodes {
            let duplicate = self.is_partial
                && self.nodes.last().is_some_and(|last| last.id() == node.id());
            if !duplicate {
                self.nodes.push(node);
            }
        }
        self.line_ranges.extend(other.line_ranges);

        if self.is_partial {
            self.size += other.size;
        } else if let Some((start, end)) = self.span() {
            self.size = sizes.query(start, end);
        }
    }
}

/// NWS characters carried by `nodes` themselves, gaps between them excluded
pub(crate) fn covered_size<N: SyntaxNode>(nodes: &[N], sizes: &SizeModel) -> usize {
    nodes
        .iter()
        .map(|node| sizes.query(node.start_byte(), node.end_byte()))
        .sum()
}

/// One level of sibling nodes being packed
struct Frame<N> {
    nodes: Vec<N>,
    next: usize,
    acc: Window<N>,
}

impl<N> Frame<N> {
    fn new(nodes: Vec<N>) -> Self {
        Self {
            nodes,
            next: 0,
            acc: Window::default(),
        }
    }
}

/// Lazily yields windows in source order.
///
/// Descending into an oversized node pushes a frame with its own accumulator,
/// so the walk uses an explicit stack rather than recursion.
pub(crate) struct WindowAssigner<'a, N> {
    text: &'a str,
    sizes: Arc<SizeModel>,
    max_size: usize,
    stack: Vec<Frame<N>>,
    ready: VecDeque<Window<N>>,
}

impl<'a, N: SyntaxNode> WindowAssigner<'a, N> {
    pub fn new(text: &'a str, sizes: Arc<SizeModel>, max_size: usize, nodes: Vec<N>) -> Self {
        Self {
            text,
            sizes,
            max_size,
            stack: vec![Frame::new(nodes)],
            ready: VecDeque::new(),
        }
    }

    fn emit(&mut self, window: Window<N>) {
        if window.is_empty() {
            return;
        }
        log::trace!(
            "window flushed: {} node(s), size {}",
            window.nodes.len(),
            window.size
        );
        self.ready.push_back(window);
    }

    /// Children to pack in place of an oversized node, or `None` when the
    /// node has to be split by lines.
    ///
    /// Line is the granularity floor: a one-line node is never descended
    /// into. Neither is a node whose children leave non-whitespace text
    /// uncovered, such as a block comment whose body sits between its `/*`
    /// and `*/` tokens.
    fn descend(&self, node: &N, size: usize) -> Option<Vec<N>> {
        if node.is_leaf() || node.start_point().row == node.end_point().row {
            return None;
        }
        let children = node.children();
        (covered_size(&children, &self.sizes) == size).then_some(children)
    }

    /// Split an oversized node into partial windows of whole lines.
    fn split_leaf(&mut self, node: N) {
        let start = node.start_byte();
        let end = node.end_byte();
        let first_row = node.start_point().row;

        let Some(body) = self.text.get(start..end) else {
            // Positions do not fit the text; keep the node whole.
            let size = self.sizes.query(start, end);
            let lines = LineRange::new(first_row, node.end_point().row.max(first_row));
            self.ready.push_back(Window::partial(node, lines, size));
            return;
        };

        let mut pieces: Vec<(LineRange, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        let mut offset = start;
        let mut row = first_row;

        for line in body.split_inclusive('\n') {
            let line_size = self.sizes.query(offset, offset + line.len());
            current = match current {
                Some((first, acc)) if acc + line_size <= self.max_size => {
                    Some((first, acc + line_size))
                }
                Some((first, acc)) => {
                    pieces.push((LineRange::new(first, row - 1), acc));
                    Some((row, line_size))
                }
                None => Some((row, line_size)),
            };
            offset += line.len();
            row += 1;
        }
        if let Some((first, acc)) = current {
            pieces.push((LineRange::new(first, row.saturating_sub(1).max(first)), acc));
        }

        log::trace!(
            "split oversized {} at bytes {start}..{end} into {} piece(s)",
            node.kind(),
            pieces.len()
        );

        for (lines, size) in pieces {
            self.ready
                .push_back(Window::partial(node.clone(), lines, size));
        }
    }
}

impl<N: SyntaxNode> Iterator for WindowAssigner<'_, N> {
    type Item = Window<N>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(window) = self.ready.pop_front() {
                return Some(window);
            }

            let top = self.stack.len().checked_sub(1)?;
            let frame = &mut self.stack[top];

            let Some(node) = frame.nodes.get(frame.next).cloned() else {
                let finished = std::mem::take(&mut frame.acc);
                self.emit(finished);
                self.stack.pop();
                continue;
            };
            frame.next += 1;

            let size = self.sizes.query(node.start_byte(), node.end_byte());
            let joined = frame
                .acc
                .span()
                .map_or(size, |(start, _)| self.sizes.query(start, node.end_byte()));
            if joined <= self.max_size {
                frame.acc.push(node, joined);
                continue;
            }

            let flushed = std::mem::take(&mut frame.acc);
            self.emit(flushed);

            if size > self.max_size {
                match self.descend(&node, size) {
                    Some(children) => self.stack.push(Frame::new(children)),
                    None => self.split_leaf(node),
                }
            } else {
                self.stack[top].acc.push(node, size);
            }
        }
    }
}

/// Coalesces adjacent windows while their combined span fits the budget
pub(crate) struct WindowMerger<N, I> {
    inner: I,
    sizes: Arc<SizeModel>,
    max_size: usize,
    pending: Option<Window<N>>,
}

impl<N, I> WindowMerger<N, I> {
    pub fn new(inner: I, sizes: Arc<SizeModel>, max_size: usize) -> Self {
        Self {
            inner,
            sizes,
            max_size,
            pending: None,
        }
    }
}

impl<N, I> Iterator for WindowMerger<N, I>
where
    N: SyntaxNode,
    I: Iterator<Item = Window<N>>,
{
    type Item = Window<N>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(window) = self.inner.next() else {
                return self.pending.take();
            };

            match self.pending.take() {
                None => self.pending = Some(window),
                Some(mut acc) => {
                    if acc.can_merge(&window, &self.sizes, self.max_size) {
                        acc.merge(window, &self.sizes);
                        self.pending = Some(acc);
                    } else {
                        self.pending = Some(window);
                        return Some(acc);
                    }
                }
            }
        }
    }
}
