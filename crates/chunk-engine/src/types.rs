use crate::declaration::DeclarationKind;
use crate::syntax::ParseErrorInfo;
use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into the source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// `other` lies entirely inside this range
    #[must_use]
    pub const fn contains_range(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub const fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// The ranges share at least one byte
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Inclusive, zero-based line range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of lines covered
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

/// A size-bounded, syntactically coherent segment of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Exact slice of the source: `source[byte_range.start..byte_range.end]`
    pub text: String,

    pub byte_range: ByteRange,

    pub line_range: LineRange,

    /// Semantic context attached to this chunk
    pub context: ChunkContext,

    /// Zero-based position in the file's chunk sequence
    pub index: usize,

    /// Number of chunks in the file, `None` while produced lazily
    pub total_chunks: Option<usize>,
}

impl Chunk {
    /// Non-whitespace size of the chunk text
    #[must_use]
    pub fn nws_size(&self) -> usize {
        crate::size::nws_count(&self.text)
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_range.line_count()
    }

    /// The parser recovered from syntax errors while producing this chunk's tree
    #[must_use]
    pub const fn has_parse_errors(&self) -> bool {
        self.context.parse_errors.is_some()
    }
}

/// Semantic context of a chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkContext {
    /// Source file path, when known
    pub filepath: Option<String>,

    /// Language name, when known
    pub language: Option<String>,

    /// Enclosing scopes, innermost first
    #[serde(default)]
    pub scope: Vec<EntityInfo>,

    /// Declarations overlapping the chunk, in source order
    #[serde(default)]
    pub entities: Vec<ChunkEntity>,

    /// Nearby declarations at the same nesting level, outside the chunk
    #[serde(default)]
    pub siblings: Vec<SiblingInfo>,

    /// Imports relevant to the chunk
    #[serde(default)]
    pub imports: Vec<ImportInfo>,

    /// Present when the tree was recovered from syntax errors
    #[serde(default)]
    pub parse_errors: Option<ParseErrorInfo>,
}

/// Summary of a declaration used in scope chains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    pub kind: DeclarationKind,
    pub signature: Option<String>,
}

/// A declaration overlapping a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntity {
    pub name: String,
    pub kind: DeclarationKind,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub byte_range: ByteRange,
    pub line_range: LineRange,
    /// Part of the declaration lies outside the chunk
    pub is_partial: bool,
}

/// Which side of the chunk a sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    Before,
    After,
}

/// A declaration next to the chunk at the same nesting level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingInfo {
    pub name: String,
    pub kind: DeclarationKind,
    /// Only filled for signature-level sibling detail
    pub signature: Option<String>,
    pub position: SiblingPosition,
    /// Number of declarations between the chunk and this sibling, plus one
    pub distance: usize,
}

/// An import binding carried as chunk context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    /// Name bound in the importing file
    pub name: String,
    /// Module the name comes from
    pub source: Option<String>,
}
