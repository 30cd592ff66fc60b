//! Containment hierarchy of structural declarations.
//!
//! Nodes live in an arena and refer to each other by [`ScopeId`]; a parent
//! link is an index, never an owner.

use crate::declaration::{Declaration, DeclarationKind};
use serde::{Deserialize, Serialize};

/// Index of a node in a [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// One structural declaration in the hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeNode {
    pub declaration: Declaration,
    /// Children in source order
    pub children: Vec<ScopeId>,
    pub parent: Option<ScopeId>,
}

/// Scope hierarchy plus the flat declaration lists of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
    roots: Vec<ScopeId>,
    imports: Vec<Declaration>,
    exports: Vec<Declaration>,
    /// Every declaration, sorted by start offset
    all: Vec<Declaration>,
}

impl ScopeTree {
    /// Build the hierarchy from a flat declaration list.
    ///
    /// Structural declarations are inserted in start order under the deepest
    /// existing node whose range contains them; uncontained ones become roots.
    #[must_use]
    pub fn build(declarations: &[Declaration]) -> Self {
        let mut tree = Self::default();
        let mut structural = Vec::new();

        for decl in declarations {
            match decl.kind {
                DeclarationKind::Import => tree.imports.push(decl.clone()),
                DeclarationKind::Export => tree.exports.push(decl.clone()),
                _ => structural.push(decl.clone()),
            }
        }

        // Equal starts: the wider range first, so a container precedes its content.
        structural.sort_by(|a, b| {
            a.byte_range
                .start
                .cmp(&b.byte_range.start)
                .then_with(|| b.byte_range.end.cmp(&a.byte_range.end))
        });

        for decl in structural {
            tree.insert(decl);
        }

        tree.all = declarations.to_vec();
        tree.all.sort_by_key(|d| (d.byte_range.start, std::cmp::Reverse(d.byte_range.end)));

        log::debug!(
            "scope tree: {} structural ({} roots), {} imports, {} exports",
            tree.nodes.len(),
            tree.roots.len(),
            tree.imports.len(),
            tree.exports.len()
        );

        tree
    }

    fn insert(&mut self, declaration: Declaration) {
        let parent = self.find_container(&declaration);
        let id = ScopeId(self.nodes.len() as u32);
        self.nodes.push(ScopeNode {
            declaration,
            children: Vec::new(),
            parent,
        });
        match parent {
            Some(parent) => self.nodes[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
    }

    /// Deepest node whose range fully contains `inner`
    fn find_container(&self, inner: &Declaration) -> Option<ScopeId> {
        let mut candidates = &self.roots;
        let mut found = None;

        // Siblings never overlap, so at most one candidate per level matches;
        // start order means it is usually the last one.
        while let Some(&next) = candidates
            .iter()
            .rev()
            .find(|&&id| self.node(id).declaration.byte_range.contains_range(&inner.byte_range))
        {
            found = Some(next);
            candidates = &self.node(next).children;
        }

        found
    }

    #[must_use]
    pub fn node(&self, id: ScopeId) -> &ScopeNode {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> Option<&ScopeNode> {
        self.nodes.get(id.index())
    }

    /// Top-level structural declarations in source order
    #[must_use]
    pub fn roots(&self) -> &[ScopeId] {
        &self.roots
    }

    #[must_use]
    pub fn imports(&self) -> &[Declaration] {
        &self.imports
    }

    #[must_use]
    pub fn exports(&self) -> &[Declaration] {
        &self.exports
    }

    /// Every declaration, imports and exports included, in source order
    #[must_use]
    pub fn all_declarations(&self) -> &[Declaration] {
        &self.all
    }

    /// Number of structural nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deepest structural node whose `[start, end)` contains `offset`
    #[must_use]
    pub fn find_scope_at_offset(&self, offset: usize) -> Option<ScopeId> {
        let mut candidates = &self.roots;
        let mut found = None;

        while let Some(&next) = candidates
            .iter()
            .find(|&&id| self.node(id).declaration.byte_range.contains_offset(offset))
        {
            found = Some(next);
            candidates = &self.node(next).children;
        }

        found
    }

    /// Parents of `id` from the immediate parent outward
    #[must_use]
    pub fn ancestor_chain(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent).parent;
        }
        chain
    }

    /// Nodes sharing a level with `id` (the roots for a top-level node), `id` included
    #[must_use]
    pub fn level_of(&self, id: ScopeId) -> &[ScopeId] {
        match self.get(id).and_then(|node| node.parent) {
            Some(parent) => &self.node(parent).children,
            None => &self.roots,
        }
    }
}
