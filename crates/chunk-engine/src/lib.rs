//! # Context Chunk Engine
//!
//! Syntax-aware chunk assembly for semantic search and AI context.
//!
//! ## Philosophy
//!
//! The engine splits source files into chunks that:
//! - Never end in the middle of a syntax node when a node boundary fits
//! - Stay within a non-whitespace (NWS) character budget
//! - Map back to the exact source bytes and lines they came from
//! - Carry their enclosing scopes, neighbouring declarations and imports
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Tree-sitter Parsing → syntax tree
//!     │    └─> Declaration extraction → ScopeTree
//!     │
//!     ├──> SizeModel (NWS prefix sums)
//!     │
//!     ├──> Window Assignment
//!     │    ├─> Pack siblings greedily up to the budget
//!     │    ├─> Descend into oversized nodes
//!     │    └─> Split oversized leaves by lines
//!     │
//!     ├──> Window Merging (adjacent windows that still fit)
//!     │
//!     └──> Chunk Assembly
//!          ├─> Rebuild exact text and byte/line ranges
//!          ├─> Resolve scope chain, entities, siblings, imports
//!          └─> Emit Chunk[] eagerly or as a lazy ChunkStream
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_chunk_engine::{Chunker, ChunkerConfig};
//!
//! let config = ChunkerConfig {
//!     max_chunk_size: 200,
//!     ..ChunkerConfig::default()
//! };
//! let chunker = Chunker::new(config).unwrap();
//!
//! let code = r#"
//! fn process_data(input: &str) -> String {
//!     let cleaned = input.trim();
//!     cleaned.to_uppercase()
//! }
//! "#;
//!
//! let chunks = chunker.chunk_str(code, Some("example.rs")).unwrap();
//! for chunk in &chunks {
//!     println!(
//!         "Chunk {} at lines {}-{}: {} entities",
//!         chunk.index,
//!         chunk.line_range.start,
//!         chunk.line_range.end,
//!         chunk.context.entities.len()
//!     );
//! }
//! ```

mod chunker;
mod config;
mod context;
mod declaration;
mod error;
mod extractor;
mod format;
mod language;
mod rebuild;
mod scope;
mod size;
mod syntax;
mod types;
mod window;

#[cfg(test)]
mod testing;

pub use chunker::{ChunkStream, Chunker, ChunkingStats, ParsedSource, SourceMeta};
pub use config::{ChunkerConfig, ContextMode, SiblingDetail};
pub use context::{entities_in_range, relevant_imports, resolve_context, scope_chain, siblings};
pub use declaration::{Declaration, DeclarationKind};
pub use error::{ChunkerError, Result};
pub use extractor::extract_declarations;
pub use format::contextualized_text;
pub use language::Language;
pub use rebuild::LineIndex;
pub use scope::{ScopeId, ScopeNode, ScopeTree};
pub use size::{nws_count, SizeModel};
pub use syntax::{collect_parse_errors, ErrorSite, ParseErrorInfo, Point, SyntaxNode, MAX_ERROR_SITES};
pub use types::{
    ByteRange, Chunk, ChunkContext, ChunkEntity, EntityInfo, ImportInfo, LineRange, SiblingInfo,
    SiblingPosition,
};
