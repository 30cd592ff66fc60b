//! Rendering chunks for embedding models.

use crate::types::{Chunk, SiblingInfo, SiblingPosition};
use std::fmt::Write as _;

/// Chunk text prefixed with a comment header describing its context.
///
/// ```text
/// # src/cache.rs
/// # Scope: Cache > get
/// # Defines: pub fn get(&self, key: &str) -> Option<u32>
/// # Uses: HashMap
/// # Before: new
/// # After: put, evict
///
/// <chunk text>
/// ```
///
/// Header lines with nothing to report are left out. A chunk without any
/// context renders as its bare text.
#[must_use]
pub fn contextualized_text(chunk: &Chunk) -> String {
    let context = &chunk.context;
    let mut header = String::new();

    if let Some(path) = &context.filepath {
        let _ = writeln!(header, "# {path}");
    }

    if !context.scope.is_empty() {
        let chain: Vec<&str> = context.scope.iter().rev().map(|e| e.name.as_str()).collect();
        let _ = writeln!(header, "# Scope: {}", chain.join(" > "));
    }

    let defines: Vec<&str> = context
        .entities
        .iter()
        .filter(|e| !e.is_partial && e.kind.is_structural())
        .map(|e| e.signature.as_deref().unwrap_or(&e.name))
        .collect();
    if !defines.is_empty() {
        let _ = writeln!(header, "# Defines: {}", defines.join(", "));
    }

    if !context.imports.is_empty() {
        let uses: Vec<&str> = context.imports.iter().map(|i| i.name.as_str()).collect();
        let _ = writeln!(header, "# Uses: {}", uses.join(", "));
    }

    for (label, position) in [
        ("Before", SiblingPosition::Before),
        ("After", SiblingPosition::After),
    ] {
        let names = sibling_names(&context.siblings, position);
        if !names.is_empty() {
            let _ = writeln!(header, "# {label}: {}", names.join(", "));
        }
    }

    if header.is_empty() {
        return chunk.text.clone();
    }

    header.push('\n');
    header.push_str(&chunk.text);
    header
}

fn sibling_names(siblings: &[SiblingInfo], position: SiblingPosition) -> Vec<&str> {
    siblings
        .iter()
        .filter(|s| s.position == position)
        .map(|s| s.name.as_str())
        .collect()
}
