use crate::types::{ByteRange, LineRange};
use serde::{Deserialize, Serialize};

/// Kind of an extracted declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Enum,
    Import,
    Export,
}

impl DeclarationKind {
    /// Declarations that take part in the scope hierarchy
    #[must_use]
    pub const fn is_structural(self) -> bool {
        !matches!(self, Self::Import | Self::Export)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Import => "import",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declaration emitted by the entity extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Declaration header text (no body)
    pub signature: String,
    pub docstring: Option<String>,
    pub byte_range: ByteRange,
    pub line_range: LineRange,
    /// Name of the enclosing declaration
    pub parent: Option<String>,
    /// Module an import comes from
    pub source: Option<String>,
}

impl Declaration {
    /// Create a declaration with an empty signature and no parent
    pub fn new(
        kind: DeclarationKind,
        name: impl Into<String>,
        byte_range: ByteRange,
        line_range: LineRange,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            signature: String::new(),
            docstring: None,
            byte_range,
            line_range,
            parent: None,
            source: None,
        }
    }

    /// Builder: set signature text
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Builder: set docstring
    #[must_use]
    pub fn docstring(mut self, doc: impl Into<String>) -> Self {
        self.docstring = Some(doc.into());
        self
    }

    /// Builder: set parent declaration name
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder: set import source module
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Signature text, or `None` when the extractor produced none
    #[must_use]
    pub fn signature_text(&self) -> Option<&str> {
        let sig = self.signature.trim();
        (!sig.is_empty()).then_some(sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_kinds() {
        assert!(DeclarationKind::Function.is_structural());
        assert!(DeclarationKind::Class.is_structural());
        assert!(DeclarationKind::Enum.is_structural());
        assert!(!DeclarationKind::Import.is_structural());
        assert!(!DeclarationKind::Export.is_structural());
    }

    #[test]
    fn builder_fills_optional_fields() {
        let decl = Declaration::new(
            DeclarationKind::Method,
            "drive",
            ByteRange::new(10, 40),
            LineRange::new(2, 4),
        )
        .signature("pub fn drive(&self)")
        .parent("Car")
        .docstring("/// Moves the car");

        assert_eq!(decl.signature_text(), Some("pub fn drive(&self)"));
        assert_eq!(decl.parent.as_deref(), Some("Car"));
        assert!(decl.source.is_none());
        assert_eq!(decl.kind.to_string(), "method");
    }

    #[test]
    fn blank_signature_is_none() {
        let decl = Declaration::new(
            DeclarationKind::Import,
            "HashMap",
            ByteRange::new(0, 30),
            LineRange::new(0, 0),
        )
        .signature("   ");
        assert_eq!(decl.signature_text(), None);
    }
}
