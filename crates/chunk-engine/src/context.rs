//! Resolving the semantic context of a chunk from the scope tree.

use crate::config::{ChunkerConfig, SiblingDetail};
use crate::declaration::Declaration;
use crate::scope::{ScopeId, ScopeTree};
use crate::types::{
    ByteRange, ChunkContext, ChunkEntity, EntityInfo, ImportInfo, SiblingInfo, SiblingPosition,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("identifier pattern is valid")
});

fn entity_info(decl: &Declaration) -> EntityInfo {
    EntityInfo {
        name: decl.name.clone(),
        kind: decl.kind,
        signature: decl.signature_text().map(str::to_string),
    }
}

/// Scope at `offset` followed by its ancestors, innermost first
#[must_use]
pub fn scope_chain(tree: &ScopeTree, offset: usize) -> Vec<EntityInfo> {
    let Some(scope) = tree.find_scope_at_offset(offset) else {
        return Vec::new();
    };

    std::iter::once(scope)
        .chain(tree.ancestor_chain(scope))
        .map(|id| entity_info(&tree.node(id).declaration))
        .collect()
}

/// Every declaration overlapping `range`, imports and exports included.
///
/// An entity is partial unless its whole range lies inside `range`.
#[must_use]
pub fn entities_in_range(range: ByteRange, tree: &ScopeTree) -> Vec<ChunkEntity> {
    tree.all_declarations()
        .iter()
        .filter(|decl| decl.byte_range.overlaps(&range))
        .map(|decl| ChunkEntity {
            name: decl.name.clone(),
            kind: decl.kind,
            signature: decl.signature_text().map(str::to_string),
            docstring: decl.docstring.clone(),
            byte_range: decl.byte_range,
            line_range: decl.line_range,
            is_partial: !range.contains_range(&decl.byte_range),
        })
        .collect()
}

/// Declarations next to `range` at the nesting level of the scope it starts in.
///
/// At most `max_siblings` per side, nearest first; `distance` counts
/// declarations, not bytes. Output is the `before` side then the `after`
/// side, each in source order.
#[must_use]
pub fn siblings(
    range: ByteRange,
    tree: &ScopeTree,
    detail: SiblingDetail,
    max_siblings: usize,
) -> Vec<SiblingInfo> {
    if detail == SiblingDetail::None || max_siblings == 0 {
        return Vec::new();
    }

    let level: &[ScopeId] = match tree.find_scope_at_offset(range.start) {
        Some(scope) => tree.level_of(scope),
        None => tree.roots(),
    };

    let describe = |id: ScopeId, position: SiblingPosition, distance: usize| {
        let decl = &tree.node(id).declaration;
        SiblingInfo {
            name: decl.name.clone(),
            kind: decl.kind,
            signature: match detail {
                SiblingDetail::Signatures => decl.signature_text().map(str::to_string),
                _ => None,
            },
            position,
            distance,
        }
    };

    let mut before: Vec<SiblingInfo> = level
        .iter()
        .rev()
        .filter(|&&id| tree.node(id).declaration.byte_range.end <= range.start)
        .take(max_siblings)
        .enumerate()
        .map(|(i, &id)| describe(id, SiblingPosition::Before, i + 1))
        .collect();
    before.reverse();

    let after = level
        .iter()
        .filter(|&&id| tree.node(id).declaration.byte_range.start >= range.end)
        .take(max_siblings)
        .enumerate()
        .map(|(i, &id)| describe(id, SiblingPosition::After, i + 1));

    before.extend(after);
    before
}

/// Imports worth carrying with a chunk.
///
/// Unfiltered, every import of the file is returned. Filtered, an import is
/// kept when its bound name appears among the identifiers of the chunk's
/// entity names, signatures or text. Glob imports are always kept.
#[must_use]
pub fn relevant_imports(
    entities: &[ChunkEntity],
    chunk_text: &str,
    tree: &ScopeTree,
    filter_imports: bool,
) -> Vec<ImportInfo> {
    let to_info = |decl: &Declaration| ImportInfo {
        name: decl.name.clone(),
        source: decl.source.clone(),
    };

    if !filter_imports {
        return tree.imports().iter().map(to_info).collect();
    }

    let mut used: HashSet<&str> = HashSet::new();
    for entity in entities {
        used.insert(entity.name.as_str());
        if let Some(signature) = &entity.signature {
            used.extend(IDENTIFIER.find_iter(signature).map(|m| m.as_str()));
        }
    }
    used.extend(IDENTIFIER.find_iter(chunk_text).map(|m| m.as_str()));

    tree.imports()
        .iter()
        .filter(|decl| decl.name == "*" || used.contains(decl.name.as_str()))
        .map(to_info)
        .collect()
}

/// Resolve the context of one chunk according to the configured mode
#[must_use]
pub fn resolve_context(
    range: ByteRange,
    chunk_text: &str,
    tree: &ScopeTree,
    config: &ChunkerConfig,
) -> ChunkContext {
    let mut context = ChunkContext::default();
    if !config.context_mode.resolves_scope() {
        return context;
    }

    context.scope = scope_chain(tree, range.start);
    context.entities = entities_in_range(range, tree);

    if config.context_mode.resolves_neighbours() {
        context.siblings = siblings(range, tree, config.sibling_detail, config.max_siblings);
        context.imports =
            relevant_imports(&context.entities, chunk_text, tree, config.filter_imports);
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextMode;
    use crate::declaration::DeclarationKind;
    use crate::types::LineRange;
    use pretty_assertions::assert_eq;

    fn decl(kind: DeclarationKind, name: &str, start: usize, end: usize) -> Declaration {
        Declaration::new(kind, name, ByteRange::new(start, end), LineRange::new(0, 0))
            .signature(format!("{kind} {name}"))
    }

    fn import(name: &str, source: &str, start: usize, end: usize) -> Declaration {
        Declaration::new(
            DeclarationKind::Import,
            name,
            ByteRange::new(start, end),
            LineRange::new(0, 0),
        )
        .source(source)
    }

    // imports 0..40, class 50..300 with four methods, two functions after
    fn sample() -> ScopeTree {
        ScopeTree::build(&[
            import("HashMap", "std::collections", 0, 20),
            import("Arc", "std::sync", 20, 40),
            decl(DeclarationKind::Class, "Cache", 50, 300),
            decl(DeclarationKind::Method, "get", 60, 100),
            decl(DeclarationKind::Method, "put", 110, 150),
            decl(DeclarationKind::Method, "evict", 160, 200),
            decl(DeclarationKind::Method, "clear", 210, 290),
            decl(DeclarationKind::Function, "build", 310, 350),
            decl(DeclarationKind::Function, "drop_all", 360, 400),
        ])
    }

    fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
        items.iter().map(|i| name(i).to_string()).collect()
    }

    #[test]
    fn scope_chain_is_innermost_first() {
        let tree = sample();
        let chain = scope_chain(&tree, 70);
        assert_eq!(names(&chain, |e| &e.name), vec!["get", "Cache"]);
        assert_eq!(chain[1].signature.as_deref(), Some("class Cache"));
        assert!(scope_chain(&tree, 45).is_empty());
    }

    #[test]
    fn entities_flag_partial_overlap() {
        let tree = sample();
        let entities = entities_in_range(ByteRange::new(105, 180), &tree);

        let flags: Vec<(String, bool)> = entities
            .iter()
            .map(|e| (e.name.clone(), e.is_partial))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("Cache".to_string(), true),
                ("put".to_string(), false),
                ("evict".to_string(), true),
            ]
        );
    }

    #[test]
    fn entities_include_imports() {
        let tree = sample();
        let entities = entities_in_range(ByteRange::new(0, 45), &tree);
        assert_eq!(names(&entities, |e| &e.name), vec!["HashMap", "Arc"]);
        assert!(entities.iter().all(|e| !e.is_partial));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let tree = sample();
        let entities = entities_in_range(ByteRange::new(100, 110), &tree);
        // Only the class spans the gap between `get` and `put`
        assert_eq!(names(&entities, |e| &e.name), vec!["Cache"]);
    }

    #[test]
    fn siblings_at_method_level() {
        let tree = sample();
        let found = siblings(
            ByteRange::new(160, 200),
            &tree,
            SiblingDetail::Names,
            3,
        );

        let summary: Vec<(String, SiblingPosition, usize)> = found
            .iter()
            .map(|s| (s.name.clone(), s.position, s.distance))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("get".to_string(), SiblingPosition::Before, 2),
                ("put".to_string(), SiblingPosition::Before, 1),
                ("clear".to_string(), SiblingPosition::After, 1),
            ]
        );
        assert!(found.iter().all(|s| s.signature.is_none()));
    }

    #[test]
    fn siblings_are_capped_per_side() {
        let tree = sample();
        let found = siblings(
            ByteRange::new(210, 290),
            &tree,
            SiblingDetail::Signatures,
            1,
        );

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "evict");
        assert_eq!(found[0].signature.as_deref(), Some("method evict"));
    }

    #[test]
    fn top_level_chunk_sees_root_siblings() {
        let tree = sample();
        let found = siblings(ByteRange::new(50, 300), &tree, SiblingDetail::Names, 3);
        assert_eq!(names(&found, |s| &s.name), vec!["build", "drop_all"]);
        assert!(found.iter().all(|s| s.position == SiblingPosition::After));
    }

    #[test]
    fn sibling_detail_none_disables_siblings() {
        let tree = sample();
        assert!(siblings(ByteRange::new(160, 200), &tree, SiblingDetail::None, 3).is_empty());
    }

    #[test]
    fn unfiltered_imports_return_everything() {
        let tree = sample();
        let imports = relevant_imports(&[], "", &tree, false);
        assert_eq!(names(&imports, |i| &i.name), vec!["HashMap", "Arc"]);
        assert_eq!(imports[0].source.as_deref(), Some("std::collections"));
    }

    #[test]
    fn filtered_imports_follow_identifiers() {
        let tree = sample();
        let entities = vec![ChunkEntity {
            name: "get".to_string(),
            kind: DeclarationKind::Method,
            signature: Some("fn get(&self, key: &str) -> Option<Arc<Value>>".to_string()),
            docstring: None,
            byte_range: ByteRange::new(60, 100),
            line_range: LineRange::new(0, 0),
            is_partial: false,
        }];

        let imports = relevant_imports(&entities, "", &tree, true);
        assert_eq!(names(&imports, |i| &i.name), vec!["Arc"]);

        let imports = relevant_imports(&entities, "let m = HashMap::new();", &tree, true);
        assert_eq!(names(&imports, |i| &i.name), vec!["HashMap", "Arc"]);

        // identifiers must match whole words
        let imports = relevant_imports(&[], "ArcSwap", &tree, true);
        assert!(imports.is_empty());
    }

    #[test]
    fn glob_imports_survive_filtering() {
        let tree = ScopeTree::build(&[import("*", "crate::prelude", 0, 25)]);
        let imports = relevant_imports(&[], "nothing here", &tree, true);
        assert_eq!(imports.len(), 1);
    }

    #[test]
    fn context_modes_gate_resolution() {
        let tree = sample();
        let range = ByteRange::new(60, 100);

        let none = ChunkerConfig {
            context_mode: ContextMode::None,
            ..Default::default()
        };
        assert_eq!(resolve_context(range, "", &tree, &none), ChunkContext::default());

        let minimal = ChunkerConfig {
            context_mode: ContextMode::Minimal,
            ..Default::default()
        };
        let ctx = resolve_context(range, "", &tree, &minimal);
        assert_eq!(ctx.scope.len(), 2);
        assert!(!ctx.entities.is_empty());
        assert!(ctx.siblings.is_empty());
        assert!(ctx.imports.is_empty());

        let full = resolve_context(range, "", &tree, &ChunkerConfig::default());
        assert_eq!(full.imports.len(), 2);
        assert_eq!(names(&full.siblings, |s| &s.name), vec!["put", "evict", "clear"]);
    }
}
