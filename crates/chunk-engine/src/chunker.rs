use crate::config::ChunkerConfig;
use crate::context::resolve_context;
use crate::declaration::Declaration;
use crate::error::{ChunkerError, Result};
use crate::extractor::extract_declarations;
use crate::language::Language;
use crate::rebuild::{rebuild_window, LineIndex};
use crate::scope::ScopeTree;
use crate::size::SizeModel;
use crate::syntax::{collect_parse_errors, ParseErrorInfo, SyntaxNode};
use crate::types::Chunk;
use crate::window::{covered_size, Window, WindowAssigner, WindowMerger};
use std::path::Path;
use std::sync::Arc;

/// Main chunker interface for processing code
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

/// A parsed file: text, syntax tree and extracted declarations
#[derive(Debug, Clone)]
pub struct ParsedSource {
    source: String,
    tree: tree_sitter::Tree,
    language: Language,
    filepath: Option<String>,
    declarations: Vec<Declaration>,
}

impl ParsedSource {
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn tree(&self) -> &tree_sitter::Tree {
        &self.tree
    }

    #[must_use]
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn filepath(&self) -> Option<&str> {
        self.filepath.as_deref()
    }

    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Syntax errors the parser recovered from, if any
    #[must_use]
    pub fn parse_errors(&self) -> Option<ParseErrorInfo> {
        collect_parse_errors(&self.root())
    }
}

/// Descriptive fields copied into every chunk's context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMeta {
    pub filepath: Option<String>,
    pub language: Option<String>,
}

impl SourceMeta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filepath(mut self, filepath: impl Into<String>) -> Self {
        self.filepath = Some(filepath.into());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Parse `source` and extract its declarations.
    ///
    /// The language comes from the config override, else from `file_path`.
    pub fn parse(&self, source: &str, file_path: Option<&str>) -> Result<ParsedSource> {
        let language = self
            .config
            .language
            .or_else(|| file_path.and_then(Language::from_path))
            .ok_or_else(|| {
                ChunkerError::unsupported_language(file_path.unwrap_or("<unknown>"))
            })?;

        let mut parser = language.parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ChunkerError::parse(format!("{language} parser returned no tree")))?;
        let declarations = extract_declarations(language, source, tree.root_node())?;

        log::debug!(
            "parsed {} as {language}: {} bytes, {} declarations",
            file_path.unwrap_or("<memory>"),
            source.len(),
            declarations.len()
        );

        Ok(ParsedSource {
            source: source.to_string(),
            tree,
            language,
            filepath: file_path.map(str::to_string),
            declarations,
        })
    }

    /// Chunk code from a string
    pub fn chunk_str(&self, source: &str, file_path: Option<&str>) -> Result<Vec<Chunk>> {
        let parsed = self.parse(source, file_path)?;
        self.chunk(&parsed)
    }

    /// Chunk code from a file
    pub fn chunk_file(&self, path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let file_path = path.to_string_lossy();
        self.chunk_str(&source, Some(&file_path))
    }

    /// Chunk a parsed file eagerly
    pub fn chunk(&self, parsed: &ParsedSource) -> Result<Vec<Chunk>> {
        collect_eager(self.stream(parsed))
    }

    /// Chunk a parsed file lazily
    #[must_use]
    pub fn stream<'a>(&self, parsed: &'a ParsedSource) -> ChunkStream<'a, tree_sitter::Node<'a>> {
        let mut meta = SourceMeta::new().with_language(parsed.language.as_str());
        meta.filepath = parsed.filepath.clone();
        self.stream_tree(&parsed.source, parsed.root(), &parsed.declarations, meta)
    }

    /// Chunk a tree from any parser eagerly
    pub fn chunk_tree<N: SyntaxNode>(
        &self,
        source: &str,
        root: N,
        declarations: &[Declaration],
        meta: SourceMeta,
    ) -> Result<Vec<Chunk>> {
        collect_eager(self.stream_tree(source, root, declarations, meta))
    }

    /// Chunk a tree from any parser lazily.
    ///
    /// Packing starts from the root's children. A root with content that its
    /// children do not carry (no children, or text between them that belongs
    /// to no node) is packed as a single node instead.
    pub fn stream_tree<'a, N: SyntaxNode>(
        &self,
        source: &'a str,
        root: N,
        declarations: &[Declaration],
        meta: SourceMeta,
    ) -> ChunkStream<'a, N> {
        let parse_errors = collect_parse_errors(&root);
        if let Some(errors) = &parse_errors {
            log::warn!(
                "{}: syntax tree has {} error site(s); chunks are approximate",
                meta.filepath.as_deref().unwrap_or("<memory>"),
                errors.count()
            );
        }

        let sizes = Arc::new(SizeModel::new(source));
        let root_size = sizes.query(root.start_byte(), root.end_byte());
        let mut nodes = root.children();
        if root_size > 0 && (nodes.is_empty() || covered_size(&nodes, &sizes) != root_size) {
            log::debug!(
                "{}: root children leave text uncovered; packing the root whole",
                meta.filepath.as_deref().unwrap_or("<memory>")
            );
            nodes = vec![root];
        }

        let scopes = if self.config.context_mode.resolves_scope() {
            ScopeTree::build(declarations)
        } else {
            ScopeTree::default()
        };

        let max_size = self.config.max_chunk_size;
        let assigner = WindowAssigner::new(source, Arc::clone(&sizes), max_size, nodes);

        ChunkStream {
            source,
            windows: WindowMerger::new(assigner, sizes, max_size),
            lines: LineIndex::new(source),
            scopes,
            config: self.config.clone(),
            meta,
            parse_errors,
            next_index: 0,
            total: None,
            done: false,
        }
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn stats(chunks: &[Chunk]) -> ChunkingStats {
        let sizes: Vec<usize> = chunks.iter().map(Chunk::nws_size).collect();
        let total_nws: usize = sizes.iter().sum();

        ChunkingStats {
            total_chunks: chunks.len(),
            total_lines: chunks.iter().map(Chunk::line_count).sum(),
            total_nws,
            avg_nws_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_nws / chunks.len()
            },
            min_nws: sizes.iter().copied().min().unwrap_or(0),
            max_nws: sizes.iter().copied().max().unwrap_or(0),
            partial_entities: chunks
                .iter()
                .flat_map(|c| &c.context.entities)
                .filter(|e| e.is_partial)
                .count(),
        }
    }
}

fn collect_eager<N: SyntaxNode>(stream: ChunkStream<'_, N>) -> Result<Vec<Chunk>> {
    let mut chunks = stream.collect::<Result<Vec<_>>>()?;
    let total = chunks.len();
    for chunk in &mut chunks {
        chunk.total_chunks = Some(total);
    }
    Ok(chunks)
}

/// Lazily produced chunks of one file.
///
/// Yielded chunks carry `total_chunks == None`; the count is known through
/// [`ChunkStream::total_chunks`] once the stream is exhausted. After an
/// error the stream ends.
pub struct ChunkStream<'a, N: SyntaxNode> {
    source: &'a str,
    windows: WindowMerger<N, WindowAssigner<'a, N>>,
    lines: LineIndex,
    scopes: ScopeTree,
    config: ChunkerConfig,
    meta: SourceMeta,
    parse_errors: Option<ParseErrorInfo>,
    next_index: usize,
    total: Option<usize>,
    done: bool,
}

impl<N: SyntaxNode> ChunkStream<'_, N> {
    /// Number of chunks, once the stream has been drained without error
    #[must_use]
    pub const fn total_chunks(&self) -> Option<usize> {
        self.total
    }

    /// Scope tree the chunk contexts are resolved against
    #[must_use]
    pub const fn scope_tree(&self) -> &ScopeTree {
        &self.scopes
    }

    fn assemble(&mut self, window: &Window<N>) -> Result<Chunk> {
        let rebuilt = rebuild_window(self.source, &self.lines, window)?;

        let mut context =
            resolve_context(rebuilt.byte_range, &rebuilt.text, &self.scopes, &self.config);
        context.filepath = self.meta.filepath.clone();
        context.language = self.meta.language.clone();
        context.parse_errors = self.parse_errors.clone();

        let chunk = Chunk {
            text: rebuilt.text,
            byte_range: rebuilt.byte_range,
            line_range: rebuilt.line_range,
            context,
            index: self.next_index,
            total_chunks: None,
        };
        self.next_index += 1;
        Ok(chunk)
    }
}

impl<N: SyntaxNode> Iterator for ChunkStream<'_, N> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let Some(window) = self.windows.next() else {
                self.done = true;
                self.total = Some(self.next_index);
                log::debug!(
                    "{}: {} chunk(s) at budget {}",
                    self.meta.filepath.as_deref().unwrap_or("<memory>"),
                    self.next_index,
                    self.config.max_chunk_size
                );
                return None;
            };

            if window.size == 0 {
                log::trace!("dropping whitespace-only window of {} node(s)", window.nodes.len());
                continue;
            }

            let assembled = self.assemble(&window);
            if assembled.is_err() {
                self.done = true;
            }
            return Some(assembled);
        }
    }
}

impl<N: SyntaxNode> std::iter::FusedIterator for ChunkStream<'_, N> {}

/// Statistics about chunking results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_nws: usize,
    pub avg_nws_per_chunk: usize,
    pub min_nws: usize,
    pub max_nws: usize,
    /// Entities cut by a chunk boundary, summed over chunks
    pub partial_entities: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Lines: {} | NWS: {} | Avg: {} | Range: {}-{} | Partial entities: {}",
            self.total_chunks,
            self.total_lines,
            self.total_nws,
            self.avg_nws_per_chunk,
            self.min_nws,
            self.max_nws,
            self.partial_entities
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextMode;
    use crate::declaration::DeclarationKind;
    use crate::testing::{branch, leaf, leaf_of, MockTree};
    use crate::types::{ByteRange, LineRange};
    use pretty_assertions::assert_eq;

    const RUST_CODE: &str = r#"
use std::collections::HashMap;

/// Main function
fn main() {
    println!("Hello, world!");
}

struct Point {
    x: i32,
    y: i32,
}

impl Point {
    fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
"#;

    fn chunker(max_chunk_size: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            max_chunk_size,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_chunk_str() {
        let chunks = Chunker::default().chunk_str(RUST_CODE, Some("test.rs")).unwrap();
        assert_eq!(chunks.len(), 1);

        let chunk = &chunks[0];
        assert_eq!(chunk.total_chunks, Some(1));
        assert_eq!(chunk.context.filepath.as_deref(), Some("test.rs"));
        assert_eq!(chunk.context.language.as_deref(), Some("rust"));
        assert_eq!(chunk.text, RUST_CODE.trim());
        assert!(chunk.context.parse_errors.is_none());
    }

    #[test]
    fn test_chunk_empty_content() {
        let chunker = Chunker::default();
        assert!(chunker.chunk_str("", Some("test.rs")).unwrap().is_empty());
        assert!(chunker.chunk_str("  \n\t\n", Some("test.rs")).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let result = Chunker::new(ChunkerConfig {
            max_chunk_size: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(ChunkerError::InvalidConfig(_))));
    }

    #[test]
    fn test_language_detection() {
        let chunker = Chunker::default();
        assert!(matches!(
            chunker.chunk_str("fn main() {}", None),
            Err(ChunkerError::UnsupportedLanguage(_))
        ));
        assert!(matches!(
            chunker.chunk_str("main :: IO ()", Some("Main.hs")),
            Err(ChunkerError::UnsupportedLanguage(_))
        ));

        let forced = Chunker::new(ChunkerConfig {
            language: Some(Language::Python),
            ..Default::default()
        })
        .unwrap();
        let chunks = forced.chunk_str("def f():\n    pass\n", None).unwrap();
        assert_eq!(chunks[0].context.language.as_deref(), Some("python"));
    }

    #[test]
    fn test_small_budget_splits_and_indexes() {
        let chunks = chunker(40).chunk_str(RUST_CODE, Some("test.rs")).unwrap();
        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.total_chunks, Some(chunks.len()));
            assert_eq!(
                chunk.text,
                &RUST_CODE[chunk.byte_range.start..chunk.byte_range.end]
            );
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].byte_range.end <= pair[1].byte_range.start);
        }
    }

    #[test]
    fn test_stream_matches_eager() {
        let chunker = chunker(40);
        let parsed = chunker.parse(RUST_CODE, Some("test.rs")).unwrap();
        let eager = chunker.chunk(&parsed).unwrap();

        let mut stream = chunker.stream(&parsed);
        assert_eq!(stream.total_chunks(), None);
        let mut lazy = Vec::new();
        for chunk in stream.by_ref() {
            let chunk = chunk.unwrap();
            assert_eq!(chunk.total_chunks, None);
            lazy.push(chunk);
        }
        assert_eq!(stream.total_chunks(), Some(eager.len()));
        assert!(stream.next().is_none());

        for (lazy, eager) in lazy.iter().zip(&eager) {
            assert_eq!(lazy.text, eager.text);
            assert_eq!(lazy.byte_range, eager.byte_range);
            assert_eq!(lazy.context, eager.context);
        }
        assert_eq!(lazy.len(), eager.len());
    }

    #[test]
    fn test_context_mode_none_leaves_context_bare() {
        let chunker = Chunker::new(ChunkerConfig {
            context_mode: ContextMode::None,
            ..Default::default()
        })
        .unwrap();
        let chunks = chunker.chunk_str(RUST_CODE, Some("test.rs")).unwrap();

        let context = &chunks[0].context;
        assert!(context.entities.is_empty());
        assert!(context.scope.is_empty());
        assert!(context.imports.is_empty());
        assert_eq!(context.filepath.as_deref(), Some("test.rs"));
    }

    #[test]
    fn test_chunking_stats() {
        let chunks = chunker(40).chunk_str(RUST_CODE, Some("test.rs")).unwrap();
        let stats = Chunker::stats(&chunks);

        assert_eq!(stats.total_chunks, chunks.len());
        assert_eq!(
            stats.total_nws,
            chunks.iter().map(Chunk::nws_size).sum::<usize>()
        );
        assert!(stats.min_nws <= stats.avg_nws_per_chunk);
        assert!(stats.avg_nws_per_chunk <= stats.max_nws);
        assert!(stats.to_string().starts_with(&format!("Chunks: {}", chunks.len())));

        let empty = Chunker::stats(&[]);
        assert_eq!(empty.total_chunks, 0);
        assert_eq!(empty.max_nws, 0);
    }

    #[test]
    fn test_chunk_tree_with_foreign_nodes() {
        let text = "alpha();\nbeta();\ngamma();\n";
        let tree = MockTree::build(
            text,
            vec![
                leaf_of(text, "call", "alpha();"),
                leaf_of(text, "call", "beta();"),
                leaf_of(text, "call", "gamma();"),
            ],
        );
        let declarations = vec![Declaration::new(
            DeclarationKind::Function,
            "beta",
            ByteRange::new(9, 16),
            LineRange::new(1, 1),
        )];

        let chunks = chunker(15)
            .chunk_tree(
                text,
                tree.root(),
                &declarations,
                SourceMeta::new().with_filepath("calls.txt"),
            )
            .unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha();\nbeta();", "gamma();"]);
        assert_eq!(chunks[0].context.entities.len(), 1);
        assert!(!chunks[0].context.entities[0].is_partial);
        assert_eq!(chunks[1].context.filepath.as_deref(), Some("calls.txt"));
        assert_eq!(chunks[1].context.language, None);
    }

    #[test]
    fn test_parse_errors_annotate_every_chunk() {
        let text = "ok();\n)(\n";
        let tree = MockTree::build(
            text,
            vec![
                leaf_of(text, "call", "ok();"),
                branch("ERROR", vec![leaf_of(text, "junk", ")(")]),
            ],
        );
        let chunks = chunker(4)
            .chunk_tree(text, tree.root(), &[], SourceMeta::new())
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(Chunk::has_parse_errors));
    }

    #[test]
    fn test_leaf_root_is_chunked_whole() {
        let text = "just one token";
        let tree = MockTree::build(text, vec![]);
        let chunks = chunker(100)
            .chunk_tree(text, tree.root(), &[], SourceMeta::new())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_internal_error_aborts_eager_chunking() {
        // the tree describes more text than the source holds
        let tree_text = "first();\nsecond();\nthird();";
        let tree = MockTree::build(
            tree_text,
            vec![
                leaf_of(tree_text, "call", "first();"),
                leaf_of(tree_text, "call", "second();"),
                leaf_of(tree_text, "call", "third();"),
            ],
        );
        let source = "first();\nsecond();";
        let chunker = chunker(9);

        let mut stream = chunker.stream_tree(source, tree.root(), &[], SourceMeta::new());
        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.text, "first();");
        assert!(matches!(stream.next(), Some(Err(ChunkerError::Internal(_)))));
        assert!(stream.next().is_none());

        let eager = chunker.chunk_tree(source, tree.root(), &[], SourceMeta::new());
        assert!(matches!(eager, Err(ChunkerError::Internal(_))));
    }

    #[test]
    fn test_uncovered_root_text_is_kept() {
        let text = "a();\n/* kept\ncomment */\nb();";
        let open = text.find("/*").unwrap();
        let tree = MockTree::build(
            text,
            vec![
                leaf_of(text, "call", "a();"),
                leaf("/*", open, open + 2),
                leaf_of(text, "call", "b();"),
            ],
        );

        for budget in [3, 8, 100] {
            let chunks = chunker(budget)
                .chunk_tree(text, tree.root(), &[], SourceMeta::new())
                .unwrap();
            let covered: usize = chunks.iter().map(Chunk::nws_size).sum();
            assert_eq!(covered, crate::size::nws_count(text), "budget {budget}");
            for chunk in &chunks {
                assert!(chunk.nws_size() <= budget || chunk.line_count() == 1);
            }
        }
    }

    #[test]
    fn test_out_of_range_tree_is_internal_error() {
        let tree_text = "first();\nsecond();";
        let tree = MockTree::build(tree_text, vec![leaf("call", 0, tree_text.len())]);

        let mut stream = chunker(100).stream_tree("first();", tree.root(), &[], SourceMeta::new());
        assert!(matches!(stream.next(), Some(Err(ChunkerError::Internal(_)))));
        assert!(stream.next().is_none());
        assert_eq!(stream.total_chunks(), None);
    }
}
