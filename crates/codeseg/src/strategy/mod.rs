//! Splitting strategies.
//!
//! Every variant implements the full [`SplitStrategy`] trait and is built in
//! one place, [`build`]. The executor only ever sees `dyn SplitStrategy`.

mod ast_structural;
mod bracket;
mod emergency;
mod line;
mod markdown;
mod semantic;
mod syntax_aware;
mod xml;

pub use ast_structural::AstStructuralStrategy;
pub use bracket::BracketBalancedStrategy;
pub use emergency::EmergencyStrategy;
pub use line::LineBasedStrategy;
pub use markdown::MarkdownStrategy;
pub use semantic::SemanticStrategy;
pub use syntax_aware::SyntaxAwareStrategy;
pub use xml::XmlStrategy;

use crate::ast::{AstNode, ParseResult};
use crate::config::{ChunkingConfig, ProcessingConfig, StrategyConfig};
use crate::error::Result;
use crate::language::Language;
use crate::text::SourceLines;
use crate::type_map::{LanguageFamily, NodeRole, StructuralType};
use crate::types::{ChunkMetadata, ChunkType, CodeChunk};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Closed set of strategy identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyName {
    AstStructural,
    SyntaxAware,
    Semantic,
    SemanticFine,
    BracketBalanced,
    LineBased,
    Markdown,
    Xml,
    Emergency,
}

impl StrategyName {
    pub const ALL: [Self; 9] = [
        Self::AstStructural,
        Self::SyntaxAware,
        Self::Semantic,
        Self::SemanticFine,
        Self::BracketBalanced,
        Self::LineBased,
        Self::Markdown,
        Self::Xml,
        Self::Emergency,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AstStructural => "ast-structural",
            Self::SyntaxAware => "syntax-aware",
            Self::Semantic => "semantic",
            Self::SemanticFine => "semantic-fine",
            Self::BracketBalanced => "bracket-balanced",
            Self::LineBased => "line-based",
            Self::Markdown => "markdown",
            Self::Xml => "xml",
            Self::Emergency => "emergency",
        }
    }

    /// Terminal strategies end every fallback path and have no successors
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::LineBased | Self::Emergency)
    }

    /// Strategies that walk a syntax tree
    pub const fn needs_ast(self) -> bool {
        matches!(self, Self::AstStructural)
    }

    /// Priority used when the global table has no row for this strategy
    pub const fn default_priority(self) -> u32 {
        match self {
            Self::AstStructural | Self::Markdown | Self::Xml => 1,
            Self::SyntaxAware => 2,
            Self::Semantic | Self::SemanticFine => 3,
            Self::BracketBalanced => 4,
            Self::LineBased => 5,
            Self::Emergency => 1000,
        }
    }
}

impl std::fmt::Display for StrategyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of one `split()` call
#[derive(Debug, Clone, Copy)]
pub struct SplitRequest<'a> {
    pub content: &'a str,
    /// Language name as supplied by detection
    pub language: &'a str,
    pub file_path: Option<&'a str>,
    pub parse: Option<&'a ParseResult>,
}

impl<'a> SplitRequest<'a> {
    pub const fn new(content: &'a str, language: &'a str) -> Self {
        Self {
            content,
            language,
            file_path: None,
            parse: None,
        }
    }

    #[must_use]
    pub const fn with_file_path(mut self, path: Option<&'a str>) -> Self {
        self.file_path = path;
        self
    }

    #[must_use]
    pub const fn with_parse(mut self, parse: Option<&'a ParseResult>) -> Self {
        self.parse = parse;
        self
    }

    pub fn lang(&self) -> Language {
        Language::from_name(self.language)
    }

    /// Parse result, only if it succeeded
    pub fn successful_parse(&self) -> Option<&'a ParseResult> {
        self.parse.filter(|parse| parse.is_success())
    }

    /// Metadata for lines `start..=end` produced by `strategy`
    pub fn metadata(
        &self,
        start_line: usize,
        end_line: usize,
        chunk_type: ChunkType,
        strategy: StrategyName,
    ) -> ChunkMetadata {
        ChunkMetadata::new(start_line, end_line, self.language, chunk_type, strategy.as_str())
            .file_path(self.file_path)
    }

    /// Chunk over lines `start..=end`
    pub fn chunk(
        &self,
        source: &SourceLines<'_>,
        start_line: usize,
        end_line: usize,
        chunk_type: ChunkType,
        strategy: StrategyName,
    ) -> CodeChunk {
        CodeChunk::from_lines(source, self.metadata(start_line, end_line, chunk_type, strategy))
    }
}

/// What `can_handle` looks at
#[derive(Debug, Clone, Copy)]
pub struct SplitContext<'a> {
    pub language: &'a str,
    pub known_language: Language,
    pub line_count: usize,
    pub content_length: usize,
    pub has_ast: bool,
}

impl<'a> SplitContext<'a> {
    pub fn of(request: &SplitRequest<'a>) -> Self {
        let known_language = request.lang();
        Self {
            // Canonical name for known languages, so "rs" matches "rust"
            language: match known_language {
                Language::Unknown => request.language,
                known => known.as_str(),
            },
            known_language,
            line_count: request.content.lines().count(),
            content_length: request.content.len(),
            has_ast: request.successful_parse().is_some(),
        }
    }
}

/// Common contract of every splitting algorithm
pub trait SplitStrategy: Send + Sync {
    fn name(&self) -> StrategyName;

    /// Lower = higher precedence
    fn priority(&self) -> u32;

    fn supported_languages(&self) -> &[String];

    /// Effective options that shape the output; part of every cache key
    fn options(&self) -> serde_json::Value;

    fn can_handle(&self, context: &SplitContext<'_>) -> bool;

    /// Split content. Empty content yields an empty list; an `Err` or an
    /// empty list for non-empty content advances the fallback chain.
    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>>;
}

/// Build the undecorated strategy for `name`
pub fn build(name: StrategyName, config: &ProcessingConfig) -> Box<dyn SplitStrategy> {
    let profile = profile_for(name, config);
    match name {
        StrategyName::AstStructural => Box::new(AstStructuralStrategy::new(profile, &config.ast)),
        StrategyName::SyntaxAware => Box::new(SyntaxAwareStrategy::new(profile, config)),
        StrategyName::Semantic => Box::new(SemanticStrategy::normal(profile, &config.semantic)),
        StrategyName::SemanticFine => Box::new(SemanticStrategy::fine(profile, &config.semantic)),
        StrategyName::BracketBalanced => Box::new(BracketBalancedStrategy::new(profile, config)),
        StrategyName::LineBased => Box::new(LineBasedStrategy::new(profile, &config.line)),
        StrategyName::Markdown => Box::new(MarkdownStrategy::new(profile, config)),
        StrategyName::Xml => Box::new(XmlStrategy::new(profile, config)),
        StrategyName::Emergency => Box::new(EmergencyStrategy::new(profile)),
    }
}

/// Row of the global table for `name`, or a catch-all default
fn profile_for(name: StrategyName, config: &ProcessingConfig) -> StrategyConfig {
    config
        .strategy(name)
        .cloned()
        .unwrap_or_else(|| StrategyConfig::new(name, name.default_priority(), &["*"]))
}

/// Size limits of one strategy after parameter overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeLimits {
    pub min_size: usize,
    pub max_size: usize,
    pub max_lines: usize,
}

impl SizeLimits {
    pub fn resolve(profile: &StrategyConfig, chunking: &ChunkingConfig) -> Self {
        Self {
            min_size: profile
                .param_usize("minChunkSize")
                .unwrap_or(chunking.min_chunk_size),
            max_size: profile
                .param_usize("maxChunkSize")
                .unwrap_or(chunking.max_chunk_size)
                .max(1),
            max_lines: profile
                .param_usize("maxLinesPerChunk")
                .unwrap_or(chunking.max_lines_per_chunk)
                .max(1),
        }
    }
}

/// Declaration resolved from a tree node, with wrappers unwrapped
#[derive(Debug, Clone, Copy)]
pub(crate) struct Declared<'t> {
    pub structural: StructuralType,
    /// Node carrying the name and body
    pub inner: AstNode<'t>,
    /// Node whose range the chunk covers (the wrapper, if any)
    pub outer: AstNode<'t>,
}

/// Classify `node`, looking through export/decorator wrappers
pub(crate) fn declared<'t>(node: AstNode<'t>, family: LanguageFamily) -> Option<Declared<'t>> {
    match family.classify(node.kind()) {
        NodeRole::Declaration(structural) => Some(Declared {
            structural,
            inner: node,
            outer: node,
        }),
        NodeRole::Wrapper => {
            let inner = node.children().into_iter().find_map(|child| {
                match family.classify(child.kind()) {
                    NodeRole::Declaration(structural) if !structural.is_attachable() => {
                        Some((structural, child))
                    }
                    _ => None,
                }
            });
            match inner {
                Some((structural, inner)) => Some(Declared {
                    structural,
                    inner,
                    outer: node,
                }),
                None if node.kind() == "export_statement" => Some(Declared {
                    structural: StructuralType::Export,
                    inner: node,
                    outer: node,
                }),
                None => None,
            }
        }
        NodeRole::Other => None,
    }
}

/// Strategies by name, each possibly decorated
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<StrategyName, Arc<dyn SplitStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every strategy, passing each through `decorate`
    pub fn from_config(
        config: &ProcessingConfig,
        mut decorate: impl FnMut(Box<dyn SplitStrategy>) -> Box<dyn SplitStrategy>,
    ) -> Self {
        let mut registry = Self::new();
        for name in StrategyName::ALL {
            registry.register(Arc::from(decorate(build(name, config))));
        }
        registry
    }

    /// Register (or replace) a strategy under its own name
    pub fn register(&mut self, strategy: Arc<dyn SplitStrategy>) {
        self.strategies.insert(strategy.name(), strategy);
    }

    pub fn get(&self, name: StrategyName) -> Option<Arc<dyn SplitStrategy>> {
        self.strategies.get(&name).cloned()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.strategies.keys().collect();
        names.sort();
        f.debug_struct("StrategyRegistry")
            .field("strategies", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_serde() {
        for name in StrategyName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn test_terminals() {
        assert!(StrategyName::LineBased.is_terminal());
        assert!(StrategyName::Emergency.is_terminal());
        assert!(!StrategyName::BracketBalanced.is_terminal());
    }

    #[test]
    fn test_build_matches_name() {
        let config = ProcessingConfig::default();
        for name in StrategyName::ALL {
            assert_eq!(build(name, &config).name(), name);
        }
    }

    #[test]
    fn test_registry_from_config_holds_every_strategy() {
        let registry = StrategyRegistry::from_config(&ProcessingConfig::default(), |s| s);
        assert_eq!(registry.len(), StrategyName::ALL.len());
        assert!(registry.get(StrategyName::Markdown).is_some());
    }

    #[test]
    fn test_size_limit_overrides() {
        let mut profile = StrategyConfig::new(StrategyName::BracketBalanced, 4, &["*"]);
        profile
            .parameters
            .insert("maxChunkSize".to_string(), serde_json::json!(640));
        let limits = SizeLimits::resolve(&profile, &ChunkingConfig::default());
        assert_eq!(limits.max_size, 640);
        assert_eq!(limits.min_size, ChunkingConfig::default().min_chunk_size);
    }

    #[test]
    fn test_every_strategy_returns_empty_for_empty_content() {
        let config = ProcessingConfig::default();
        let request = SplitRequest::new("", "rust");
        for name in StrategyName::ALL {
            let chunks = build(name, &config).split(&request).unwrap();
            assert!(chunks.is_empty(), "{name} produced chunks for empty input");
        }
    }
}
