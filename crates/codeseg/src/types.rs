use crate::text::{self, SourceLines};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A bounded, typed slice of source content.
///
/// Chunks are values: every "modification" in the pipeline builds a new chunk
/// that replaces the old one in the list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeChunk {
    content: String,
    metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Create a new code chunk
    #[must_use]
    pub const fn new(content: String, metadata: ChunkMetadata) -> Self {
        Self { content, metadata }
    }

    /// Build a chunk covering `start..=end` of `source`
    #[must_use]
    pub fn from_lines(source: &SourceLines<'_>, metadata: ChunkMetadata) -> Self {
        let content = source.slice(metadata.start_line, metadata.end_line);
        let complexity = text::complexity(&content);
        Self::new(content, metadata.complexity(complexity))
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub const fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn start_line(&self) -> usize {
        self.metadata.start_line
    }

    #[must_use]
    pub const fn end_line(&self) -> usize {
        self.metadata.end_line
    }

    #[must_use]
    pub const fn chunk_type(&self) -> ChunkType {
        self.metadata.chunk_type
    }

    #[must_use]
    pub fn strategy(&self) -> &str {
        &self.metadata.strategy
    }

    /// Content length in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.metadata.end_line.saturating_sub(self.metadata.start_line) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.metadata.start_line && line <= self.metadata.end_line
    }

    /// True when `next` starts on the line right after this chunk ends
    #[must_use]
    pub const fn is_adjacent_to(&self, next: &Self) -> bool {
        self.metadata.end_line + 1 == next.metadata.start_line
    }

    /// True once an overlap pass has injected context into this chunk
    #[must_use]
    pub fn has_overlap(&self) -> bool {
        self.metadata.extensions.contains_key(OVERLAP_LEADING)
            || self.metadata.extensions.contains_key(OVERLAP_TRAILING)
    }

    /// Same metadata, new line range. Content is re-sliced from `source`.
    #[must_use]
    pub fn with_range(&self, source: &SourceLines<'_>, start_line: usize, end_line: usize) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.start_line = start_line;
        metadata.end_line = end_line;
        Self::from_lines(source, metadata)
    }

    /// Copy of this chunk carrying an extra extension field
    #[must_use]
    pub fn with_extension(&self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.extensions.insert(key.to_string(), value.into());
        Self::new(self.content.clone(), metadata)
    }

    /// Union of two chunks over the source lines they span.
    ///
    /// Scalar metadata that no longer describes a single symbol is dropped;
    /// the chunk type with the higher priority wins.
    #[must_use]
    pub fn merged(first: &Self, second: &Self, source: &SourceLines<'_>) -> Self {
        let (a, b) = (&first.metadata, &second.metadata);
        let start_line = a.start_line.min(b.start_line);
        let end_line = a.end_line.max(b.end_line);

        let chunk_type = if a.chunk_type.priority() >= b.chunk_type.priority() {
            a.chunk_type
        } else {
            b.chunk_type
        };
        let strategy = if a.strategy == b.strategy {
            a.strategy.clone()
        } else {
            format!("{}+{}", a.strategy, b.strategy)
        };

        let node_ids = match (&a.node_ids, &b.node_ids) {
            (None, None) => None,
            (left, right) => Some(
                left.iter()
                    .chain(right.iter())
                    .flat_map(|ids| ids.iter().cloned())
                    .collect(),
            ),
        };

        let mut extensions = a.extensions.clone();
        for (key, value) in &b.extensions {
            extensions.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let metadata = ChunkMetadata {
            start_line,
            end_line,
            language: a.language.clone(),
            file_path: a.file_path.clone(),
            chunk_type,
            strategy,
            complexity: 0,
            node_ids,
            symbol_name: (a.symbol_name == b.symbol_name)
                .then(|| a.symbol_name.clone())
                .flatten(),
            parent_scope: (a.parent_scope == b.parent_scope)
                .then(|| a.parent_scope.clone())
                .flatten(),
            extensions,
        };

        Self::from_lines(source, metadata)
    }

    #[must_use]
    pub fn into_parts(self) -> (String, ChunkMetadata) {
        (self.content, self.metadata)
    }
}

/// Extension key written by the overlap pass (lines of leading context)
pub const OVERLAP_LEADING: &str = "overlapLeading";
/// Extension key written by the overlap pass (lines of trailing context)
pub const OVERLAP_TRAILING: &str = "overlapTrailing";
/// Extension key set when symbol balancing could not repair a chunk
pub const UNBALANCED: &str = "unbalanced";

/// Metadata about a code chunk. Field names are the external contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Programming language
    pub language: String,

    /// Source file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// Chunk type
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,

    /// Name of the producing strategy
    pub strategy: String,

    pub complexity: u32,

    /// AST nodes this chunk subsumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids: Option<BTreeSet<String>>,

    /// Symbol name (function name, class name, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,

    /// Parent scope (class name for methods)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_scope: Option<String>,

    /// Free-form extension fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ChunkMetadata {
    pub fn new(
        start_line: usize,
        end_line: usize,
        language: impl Into<String>,
        chunk_type: ChunkType,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            start_line,
            end_line,
            language: language.into(),
            file_path: None,
            chunk_type,
            strategy: strategy.into(),
            complexity: 0,
            node_ids: None,
            symbol_name: None,
            parent_scope: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Builder: set file path
    #[must_use]
    pub fn file_path(mut self, path: Option<&str>) -> Self {
        self.file_path = path.map(str::to_string);
        self
    }

    /// Builder: set complexity
    #[must_use]
    pub const fn complexity(mut self, complexity: u32) -> Self {
        self.complexity = complexity;
        self
    }

    /// Builder: set subsumed AST node ids
    #[must_use]
    pub fn node_ids(mut self, ids: BTreeSet<String>) -> Self {
        self.node_ids = (!ids.is_empty()).then_some(ids);
        self
    }

    /// Builder: set symbol name
    #[must_use]
    pub fn symbol_name(mut self, name: Option<String>) -> Self {
        self.symbol_name = name;
        self
    }

    /// Builder: set parent scope
    #[must_use]
    pub fn parent_scope(mut self, scope: Option<String>) -> Self {
        self.parent_scope = scope;
        self
    }
}

/// Type of code chunk based on semantic meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkType {
    Function,
    Method,
    Class,
    Interface,
    Enum,
    Variable,
    Import,
    Export,
    Type,
    TypeDef,
    ControlFlow,
    Expression,
    Block,
    Array,
    Table,
    Section,
    Key,
    Value,
    Dependency,
    Call,
    DataFlow,
    ParameterFlow,
    Union,
    Annotation,
    ConfigItem,
    Documentation,
    Comment,
    Module,
    Generic,
}

impl ChunkType {
    /// Priority when two chunks merge (higher wins)
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Function | Self::Method => 100,
            Self::Class | Self::Interface => 90,
            Self::Enum | Self::Union | Self::Type | Self::TypeDef => 85,
            Self::Module => 60,
            Self::Variable | Self::Export | Self::Annotation => 50,
            Self::Import | Self::Dependency => 40,
            Self::ControlFlow | Self::Call | Self::DataFlow | Self::ParameterFlow => 35,
            Self::Section | Self::Table | Self::Array | Self::ConfigItem => 30,
            Self::Key | Self::Value | Self::Expression => 25,
            Self::Documentation | Self::Comment => 20,
            Self::Block => 15,
            Self::Generic => 10,
        }
    }

    /// Structural chunks carry meaningful boundaries; post-processing never
    /// moves lines across them.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        !matches!(
            self,
            Self::Generic | Self::Block | Self::ControlFlow | Self::Expression
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Method => "METHOD",
            Self::Class => "CLASS",
            Self::Interface => "INTERFACE",
            Self::Enum => "ENUM",
            Self::Variable => "VARIABLE",
            Self::Import => "IMPORT",
            Self::Export => "EXPORT",
            Self::Type => "TYPE",
            Self::TypeDef => "TYPE_DEF",
            Self::ControlFlow => "CONTROL_FLOW",
            Self::Expression => "EXPRESSION",
            Self::Block => "BLOCK",
            Self::Array => "ARRAY",
            Self::Table => "TABLE",
            Self::Section => "SECTION",
            Self::Key => "KEY",
            Self::Value => "VALUE",
            Self::Dependency => "DEPENDENCY",
            Self::Call => "CALL",
            Self::DataFlow => "DATA_FLOW",
            Self::ParameterFlow => "PARAMETER_FLOW",
            Self::Union => "UNION",
            Self::Annotation => "ANNOTATION",
            Self::ConfigItem => "CONFIG_ITEM",
            Self::Documentation => "DOCUMENTATION",
            Self::Comment => "COMMENT",
            Self::Module => "MODULE",
            Self::Generic => "GENERIC",
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics about a chunk list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_size: usize,
    pub avg_size: usize,
    pub min_size: usize,
    pub max_size: usize,
}

impl ChunkingStats {
    #[must_use]
    pub fn from_chunks(chunks: &[CodeChunk]) -> Self {
        let total_size: usize = chunks.iter().map(CodeChunk::size).sum();
        Self {
            total_chunks: chunks.len(),
            total_lines: chunks.iter().map(CodeChunk::line_count).sum(),
            total_size,
            avg_size: if chunks.is_empty() {
                0
            } else {
                total_size / chunks.len()
            },
            min_size: chunks.iter().map(CodeChunk::size).min().unwrap_or(0),
            max_size: chunks.iter().map(CodeChunk::size).max().unwrap_or(0),
        }
    }
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Lines: {} | Size: {} | Avg: {} | Range: {}-{}",
            self.total_chunks,
            self.total_lines,
            self.total_size,
            self.avg_size,
            self.min_size,
            self.max_size
        )
    }
}
