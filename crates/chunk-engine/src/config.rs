use crate::error::{ChunkerError, Result};
use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for chunk assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Non-whitespace character budget per chunk (soft limit: a single
    /// oversized line still becomes one chunk)
    pub max_chunk_size: usize,

    /// How much semantic context to attach
    pub context_mode: ContextMode,

    /// How siblings are described in full context mode
    pub sibling_detail: SiblingDetail,

    /// Maximum siblings reported on each side of a chunk
    pub max_siblings: usize,

    /// Keep only imports whose bound name appears in the chunk
    pub filter_imports: bool,

    /// Language override; detected from the file path when unset
    pub language: Option<Language>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1500,
            context_mode: ContextMode::Full,
            sibling_detail: SiblingDetail::Signatures,
            max_siblings: 3,
            filter_imports: false,
            language: None,
        }
    }
}

impl ChunkerConfig {
    /// Create config optimized for embeddings (smaller, focused chunks)
    pub fn for_embeddings() -> Self {
        Self {
            max_chunk_size: 1000,
            context_mode: ContextMode::Minimal,
            filter_imports: true,
            ..Default::default()
        }
    }

    /// Create config optimized for LLM context (larger, comprehensive chunks)
    pub fn for_llm_context() -> Self {
        Self {
            max_chunk_size: 4000,
            context_mode: ContextMode::Full,
            sibling_detail: SiblingDetail::Signatures,
            max_siblings: 5,
            ..Default::default()
        }
    }

    /// Parse a config from TOML; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ChunkerError::invalid_config(format!("malformed TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(ChunkerError::invalid_config("max_chunk_size must be > 0"));
        }

        if self.max_siblings == 0
            && self.context_mode == ContextMode::Full
            && self.sibling_detail != SiblingDetail::None
        {
            return Err(ChunkerError::invalid_config(
                "max_siblings must be > 0 when sibling_detail is enabled",
            ));
        }

        Ok(())
    }
}

/// Amount of context resolved for each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    /// No context: text and positions only
    None,
    /// Scope chain and entities in range
    Minimal,
    /// Scope chain, entities, siblings and imports
    #[default]
    Full,
}

impl ContextMode {
    #[must_use]
    pub const fn resolves_scope(self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn resolves_neighbours(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Detail level for sibling declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingDetail {
    /// Do not report siblings
    None,
    /// Bare names
    Names,
    /// Names plus signature text
    #[default]
    Signatures,
}
