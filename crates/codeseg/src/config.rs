use crate::error::{Result, SegmenterError};
use crate::strategy::StrategyName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Everything the core reads at runtime. Owned by the caller, validated once
/// and then shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub chunking: ChunkingConfig,

    /// Global strategy priority table
    pub strategies: Vec<StrategyConfig>,

    /// Per-language priority tables, keyed by language name
    pub language_priorities: BTreeMap<String, Vec<PriorityEntry>>,

    /// File-type overrides, checked before any priority table
    pub file_overrides: Vec<FileOverride>,

    pub fallback_paths: FallbackPaths,
    pub selection: SelectionConfig,
    pub performance: PerformanceLimits,

    pub ast: AstConfig,
    pub syntax: SyntaxConfig,
    pub semantic: SemanticConfig,
    pub bracket: BracketConfig,
    pub line: LineConfig,
    pub markdown: MarkdownConfig,
    pub xml: XmlConfig,

    pub overlap: OverlapConfig,
    pub decorators: DecoratorConfig,
    pub post_processing: PostProcessingConfig,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl ProcessingConfig {
    /// Balanced defaults: structure-aware strategies, no advanced merge
    pub fn balanced() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            strategies: default_strategies(),
            language_priorities: default_language_priorities(),
            file_overrides: default_file_overrides(),
            fallback_paths: FallbackPaths::default(),
            selection: SelectionConfig::default(),
            performance: PerformanceLimits::default(),
            ast: AstConfig::default(),
            syntax: SyntaxConfig::default(),
            semantic: SemanticConfig::default(),
            bracket: BracketConfig::default(),
            line: LineConfig::default(),
            markdown: MarkdownConfig::default(),
            xml: XmlConfig::default(),
            overlap: OverlapConfig::default(),
            decorators: DecoratorConfig::default(),
            post_processing: PostProcessingConfig::default(),
        }
    }

    /// Create config optimized for speed (text strategies, minimal post-processing)
    pub fn fast() -> Self {
        let mut config = Self::balanced();
        for strategy in &mut config.strategies {
            if matches!(
                strategy.name,
                StrategyName::AstStructural | StrategyName::SyntaxAware
            ) {
                strategy.enabled = false;
            }
        }
        config.semantic.enable_fine_mode = false;
        config.post_processing = PostProcessingConfig {
            symbol_balance: false,
            smart_rebalance: false,
            advanced_merge: false,
            boundary_optimization: false,
            overlap: false,
            max_processing_rounds: 1,
            ..PostProcessingConfig::default()
        };
        config
    }

    /// Create config optimized for chunk quality (advanced merge, more rounds)
    pub fn quality() -> Self {
        let mut config = Self::balanced();
        config.ast.levels.inner = true;
        config.post_processing.advanced_merge = true;
        config.post_processing.max_processing_rounds = 5;
        config
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Strategy entry from the global table
    pub fn strategy(&self, name: StrategyName) -> Option<&StrategyConfig> {
        self.strategies.iter().find(|s| s.name == name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SegmenterError::invalid_config(msg));

        if self.chunking.max_chunk_size <= self.chunking.min_chunk_size {
            return fail(format!(
                "max_chunk_size ({}) must exceed min_chunk_size ({})",
                self.chunking.max_chunk_size, self.chunking.min_chunk_size
            ));
        }
        if self.chunking.max_lines_per_chunk == 0 {
            return fail("chunking.max_lines_per_chunk must be > 0".to_string());
        }
        if self.line.max_lines_per_chunk == 0 {
            return fail("line.max_lines_per_chunk must be > 0".to_string());
        }
        if self.line.overlap_lines >= self.line.max_lines_per_chunk {
            return fail(format!(
                "line.overlap_lines ({}) must be smaller than line.max_lines_per_chunk ({})",
                self.line.overlap_lines, self.line.max_lines_per_chunk
            ));
        }

        for (mode, thresholds) in [("normal", &self.semantic.normal), ("fine", &self.semantic.fine)]
        {
            if thresholds.max_chunk_size <= thresholds.min_chunk_size {
                return fail(format!(
                    "semantic.{mode}: max_chunk_size ({}) must exceed min_chunk_size ({})",
                    thresholds.max_chunk_size, thresholds.min_chunk_size
                ));
            }
            if thresholds.max_lines == 0 || thresholds.score_threshold <= 0.0 {
                return fail(format!(
                    "semantic.{mode}: max_lines and score_threshold must be positive"
                ));
            }
        }

        for (kind, thresholds) in [
            ("function", &self.ast.function),
            ("class", &self.ast.class),
            ("import", &self.ast.import),
            ("other", &self.ast.other),
        ] {
            if thresholds.max_lines < thresholds.min_lines
                || thresholds.max_size <= thresholds.min_size
            {
                return fail(format!("ast.{kind}: max thresholds must exceed min thresholds"));
            }
        }

        if self.bracket.imbalance_tolerance == 0 {
            return fail("bracket.imbalance_tolerance must be > 0".to_string());
        }

        let post = &self.post_processing;
        if post.max_processing_rounds == 0 {
            return fail("post_processing.max_processing_rounds must be >= 1".to_string());
        }
        if post.max_chunk_size_threshold <= post.min_chunk_size_threshold {
            return fail(format!(
                "max_chunk_size_threshold ({}) must exceed min_chunk_size_threshold ({})",
                post.max_chunk_size_threshold, post.min_chunk_size_threshold
            ));
        }
        if !(0.0..=1.0).contains(&post.merge_threshold) {
            return fail("post_processing.merge_threshold must be within [0, 1]".to_string());
        }
        if post.rebalance_ratio < 1.0 {
            return fail("post_processing.rebalance_ratio must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.overlap.max_overlap_ratio) {
            return fail("overlap.max_overlap_ratio must be within [0, 1]".to_string());
        }
        if self.decorators.cache && self.decorators.cache_capacity == 0 {
            return fail("decorators.cache_capacity must be > 0 when caching".to_string());
        }
        if !(0.0..=1.0).contains(&self.selection.min_language_confidence)
            || !(0.0..=1.0).contains(&self.selection.hint_confidence)
        {
            return fail("selection confidences must be within [0, 1]".to_string());
        }

        let mut seen = BTreeSet::new();
        for strategy in &self.strategies {
            if !seen.insert(strategy.name) {
                return fail(format!("strategy {} listed twice", strategy.name));
            }
        }

        self.fallback_paths.validate()
    }
}

/// Size limits shared by the text strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub max_lines_per_chunk: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 100,
            max_chunk_size: 3000,
            max_lines_per_chunk: 100,
        }
    }
}

/// One row of the global priority table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub name: StrategyName,
    /// Lower = higher precedence
    pub priority: u32,
    /// Language names, `"*"` = all
    pub supported_languages: Vec<String>,
    /// Per-strategy overrides (`maxLinesPerChunk`, `maxChunkSize`, `minChunkSize`)
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub enabled: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::new(StrategyName::LineBased, 100, &["*"])
    }
}

impl StrategyConfig {
    pub fn new(name: StrategyName, priority: u32, languages: &[&str]) -> Self {
        Self {
            name,
            priority,
            supported_languages: languages.iter().map(|l| (*l).to_string()).collect(),
            parameters: BTreeMap::new(),
            enabled: true,
        }
    }

    pub fn supports(&self, language: &str) -> bool {
        self.supported_languages
            .iter()
            .any(|l| l == "*" || l.eq_ignore_ascii_case(language))
    }

    /// Numeric parameter override
    pub fn param_usize(&self, key: &str) -> Option<usize> {
        self.parameters
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
    }
}

/// Entry of a language-specific priority table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub strategy: StrategyName,
    pub priority: u32,
}

/// What a file override matches on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "match", content = "value")]
pub enum OverrideMatch {
    /// File extension without the dot
    Extension(String),
    /// Test files (detection flag or test-like path)
    TestFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOverride {
    #[serde(rename = "when")]
    pub matcher: OverrideMatch,
    pub strategy: StrategyName,
}

/// Successor lists per strategy. Must form a DAG ending in a terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FallbackPaths(BTreeMap<StrategyName, Vec<StrategyName>>);

impl Default for FallbackPaths {
    fn default() -> Self {
        use StrategyName as S;
        let table = [
            (
                S::AstStructural,
                vec![S::SyntaxAware, S::Semantic, S::BracketBalanced, S::LineBased],
            ),
            (S::SyntaxAware, vec![S::Semantic, S::BracketBalanced, S::LineBased]),
            (S::Semantic, vec![S::BracketBalanced, S::LineBased]),
            (
                S::SemanticFine,
                vec![S::Semantic, S::BracketBalanced, S::LineBased],
            ),
            (S::BracketBalanced, vec![S::LineBased]),
            (S::Markdown, vec![S::LineBased]),
            (S::Xml, vec![S::BracketBalanced, S::LineBased]),
            (S::LineBased, vec![]),
            (S::Emergency, vec![]),
        ];
        Self(table.into_iter().collect())
    }
}

impl FallbackPaths {
    pub fn new(paths: BTreeMap<StrategyName, Vec<StrategyName>>) -> Self {
        Self(paths)
    }

    pub fn successors(&self, name: StrategyName) -> &[StrategyName] {
        self.0.get(&name).map_or(&[], Vec::as_slice)
    }

    /// Fallback chain for `primary`, always ending in the emergency strategy
    pub fn chain_for(&self, primary: StrategyName) -> Vec<StrategyName> {
        let mut chain: Vec<StrategyName> = self
            .successors(primary)
            .iter()
            .copied()
            .filter(|s| *s != primary)
            .collect();
        if chain.last() != Some(&StrategyName::Emergency) {
            chain.push(StrategyName::Emergency);
        }
        chain
    }

    /// Reject cycles, non-terminal ends and terminals with successors
    pub fn validate(&self) -> Result<()> {
        for (from, successors) in &self.0 {
            if from.is_terminal() && !successors.is_empty() {
                return Err(SegmenterError::invalid_config(format!(
                    "terminal strategy {from} cannot have fallback successors"
                )));
            }
            if let Some(last) = successors.last() {
                if !last.is_terminal() {
                    return Err(SegmenterError::invalid_config(format!(
                        "fallback path of {from} must end in line-based or emergency, ends in {last}"
                    )));
                }
            }
        }

        // Depth-first search for back edges.
        let mut state: BTreeMap<StrategyName, VisitState> = BTreeMap::new();
        for start in self.0.keys() {
            self.visit(*start, &mut state)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        node: StrategyName,
        state: &mut BTreeMap<StrategyName, VisitState>,
    ) -> Result<()> {
        match state.get(&node) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                return Err(SegmenterError::invalid_config(format!(
                    "fallback paths contain a cycle through {node}"
                )));
            }
            None => {}
        }
        state.insert(node, VisitState::InProgress);
        for next in self.successors(node) {
            self.visit(*next, state)?;
        }
        state.insert(node, VisitState::Done);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Confidence gates for detector input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Below this the detected language is treated as unknown
    pub min_language_confidence: f64,
    /// Minimum confidence before a detector strategy hint is honoured
    pub hint_confidence: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_language_confidence: 0.5,
            hint_confidence: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceLimits {
    /// Larger files go straight to line-based splitting
    pub max_file_size: usize,
    /// AST strategies are skipped above this many lines
    pub max_ast_lines: usize,
}

impl Default for PerformanceLimits {
    fn default() -> Self {
        Self {
            max_file_size: 2 * 1024 * 1024,
            max_ast_lines: 20_000,
        }
    }
}

/// Nesting levels the AST walk may emit at
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NestingLevels {
    pub top_level: bool,
    /// Members of classes, impls, traits
    pub nested: bool,
    /// Declarations and control flow inside oversized function bodies
    pub inner: bool,
}

impl Default for NestingLevels {
    fn default() -> Self {
        Self {
            top_level: true,
            nested: true,
            inner: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KindThresholds {
    pub min_lines: usize,
    pub max_lines: usize,
    pub min_size: usize,
    pub max_size: usize,
}

impl KindThresholds {
    pub const fn new(min_lines: usize, max_lines: usize, min_size: usize, max_size: usize) -> Self {
        Self {
            min_lines,
            max_lines,
            min_size,
            max_size,
        }
    }

    pub const fn accepts(&self, lines: usize, size: usize) -> bool {
        lines >= self.min_lines
            && lines <= self.max_lines
            && size >= self.min_size
            && size <= self.max_size
    }
}

impl Default for KindThresholds {
    fn default() -> Self {
        Self::new(1, 200, 10, 6000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AstConfig {
    /// Parse grammar-backed languages when the caller supplies no parse result
    pub auto_parse: bool,
    pub levels: NestingLevels,
    /// Glue directly preceding comments/attributes onto declarations
    pub attach_comments: bool,
    /// Emit runs of adjacent imports as one chunk
    pub group_imports: bool,
    pub function: KindThresholds,
    pub class: KindThresholds,
    pub import: KindThresholds,
    pub other: KindThresholds,
}

impl Default for AstConfig {
    fn default() -> Self {
        Self {
            auto_parse: true,
            levels: NestingLevels::default(),
            attach_comments: true,
            group_imports: true,
            function: KindThresholds::new(1, 200, 10, 6000),
            class: KindThresholds::new(2, 300, 20, 8000),
            import: KindThresholds::new(1, 100, 5, 4000),
            other: KindThresholds::new(1, 80, 10, 3000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    /// Adjacent chunks below this size are merged
    pub small_chunk_size: usize,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            small_chunk_size: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticThresholds {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub max_lines: usize,
    pub score_threshold: f32,
}

impl Default for SemanticThresholds {
    fn default() -> Self {
        Self {
            min_chunk_size: 100,
            max_chunk_size: 2000,
            max_lines: 50,
            score_threshold: 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub normal: SemanticThresholds,
    pub fine: SemanticThresholds,
    /// Switch to fine mode for mid-sized files
    pub enable_fine_mode: bool,
    pub fine_mode_min_lines: usize,
    pub fine_mode_max_lines: usize,
    /// Score multiplier for comment lines
    pub comment_damping: f32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            normal: SemanticThresholds::default(),
            fine: SemanticThresholds {
                min_chunk_size: 50,
                max_chunk_size: 800,
                max_lines: 20,
                score_threshold: 12.0,
            },
            enable_fine_mode: true,
            fine_mode_min_lines: 50,
            fine_mode_max_lines: 500,
            comment_damping: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketConfig {
    /// Depth beyond +/- this value forces a split
    pub imbalance_tolerance: u32,
    /// Count `<tag>` / `</tag>` as brackets
    pub track_tags: bool,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            imbalance_tolerance: 16,
            track_tags: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub max_lines_per_chunk: usize,
    pub overlap_lines: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_lines_per_chunk: 50,
            overlap_lines: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Headings up to this level open a new section
    pub split_heading_level: usize,
    /// Merge adjacent same-section same-type chunks at the end
    pub merge_sections: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            split_heading_level: 3,
            merge_sections: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    /// Element depth at which a closed element ends a chunk
    pub split_depth: usize,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self { split_depth: 1 }
    }
}

/// Context injected between neighbouring chunks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlapConfig {
    pub lines: usize,
    /// Overlap may not exceed this fraction of the chunk size
    pub max_overlap_ratio: f64,
    /// Also append the first lines of the next chunk
    pub trailing: bool,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            lines: 2,
            max_overlap_ratio: 0.3,
            trailing: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoratorConfig {
    pub cache: bool,
    pub cache_capacity: usize,
    /// Per-strategy overlap (the pipeline overlap runs regardless)
    pub overlap: bool,
    pub monitor: bool,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            cache: true,
            cache_capacity: 256,
            overlap: false,
            monitor: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessingConfig {
    pub enabled: bool,
    pub max_processing_rounds: usize,

    pub symbol_balance: bool,
    pub intelligent_filter: bool,
    pub smart_rebalance: bool,
    pub advanced_merge: bool,
    pub boundary_optimization: bool,
    pub overlap: bool,

    pub min_chunk_size_threshold: usize,
    pub max_chunk_size_threshold: usize,

    pub conservative_rebalance: bool,
    /// Pairs whose size ratio exceeds this are rebalanced
    pub rebalance_ratio: f64,
    pub max_shift_lines: usize,

    pub merge_threshold: f64,
    pub boundary_search_window: usize,
    pub max_borrow_lines: usize,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_processing_rounds: 3,
            symbol_balance: true,
            intelligent_filter: true,
            smart_rebalance: true,
            advanced_merge: false,
            boundary_optimization: true,
            overlap: true,
            min_chunk_size_threshold: 20,
            max_chunk_size_threshold: 4000,
            conservative_rebalance: true,
            rebalance_ratio: 3.0,
            max_shift_lines: 3,
            merge_threshold: 0.7,
            boundary_search_window: 3,
            max_borrow_lines: 10,
        }
    }
}

const AST_LANGUAGES: &[&str] = &["rust", "python", "javascript", "typescript"];
const CODE_LANGUAGES: &[&str] = &[
    "rust",
    "python",
    "javascript",
    "typescript",
    "go",
    "java",
    "c",
    "cpp",
    "csharp",
    "ruby",
];

fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::new(StrategyName::AstStructural, 1, AST_LANGUAGES),
        StrategyConfig::new(StrategyName::Markdown, 1, &["markdown"]),
        StrategyConfig::new(StrategyName::Xml, 1, &["xml", "html"]),
        StrategyConfig::new(StrategyName::SyntaxAware, 2, CODE_LANGUAGES),
        StrategyConfig::new(StrategyName::Semantic, 3, &["*"]),
        StrategyConfig::new(StrategyName::SemanticFine, 3, &["*"]),
        StrategyConfig::new(StrategyName::BracketBalanced, 4, &["*"]),
        StrategyConfig::new(StrategyName::LineBased, 5, &["*"]),
        StrategyConfig::new(StrategyName::Emergency, 1000, &["*"]),
    ]
}

fn default_language_priorities() -> BTreeMap<String, Vec<PriorityEntry>> {
    let entry = |strategy, priority| PriorityEntry { strategy, priority };
    BTreeMap::from([
        (
            "markdown".to_string(),
            vec![entry(StrategyName::Markdown, 1), entry(StrategyName::LineBased, 2)],
        ),
        (
            "json".to_string(),
            vec![
                entry(StrategyName::BracketBalanced, 1),
                entry(StrategyName::LineBased, 2),
            ],
        ),
        (
            "yaml".to_string(),
            vec![entry(StrategyName::Semantic, 1), entry(StrategyName::LineBased, 2)],
        ),
        (
            "html".to_string(),
            vec![entry(StrategyName::Xml, 1), entry(StrategyName::BracketBalanced, 2)],
        ),
    ])
}

fn default_file_overrides() -> Vec<FileOverride> {
    vec![
        FileOverride {
            matcher: OverrideMatch::Extension("json".to_string()),
            strategy: StrategyName::BracketBalanced,
        },
        FileOverride {
            matcher: OverrideMatch::Extension("lock".to_string()),
            strategy: StrategyName::LineBased,
        },
        FileOverride {
            matcher: OverrideMatch::TestFile,
            strategy: StrategyName::Semantic,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ProcessingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(ProcessingConfig::fast().validate().is_ok());
        assert!(ProcessingConfig::balanced().validate().is_ok());
        assert!(ProcessingConfig::quality().validate().is_ok());
        assert!(ProcessingConfig::quality().post_processing.advanced_merge);
        assert!(!ProcessingConfig::balanced().post_processing.advanced_merge);
    }

    #[test]
    fn test_max_not_above_min_rejected() {
        let mut config = ProcessingConfig::default();
        config.chunking.min_chunk_size = 500;
        config.chunking.max_chunk_size = 500;
        assert!(matches!(
            config.validate(),
            Err(SegmenterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let mut config = ProcessingConfig::default();
        config.post_processing.max_processing_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cyclic_fallback_rejected() {
        let mut config = ProcessingConfig::default();
        config.fallback_paths = FallbackPaths::new(BTreeMap::from([
            (
                StrategyName::Semantic,
                vec![StrategyName::BracketBalanced, StrategyName::LineBased],
            ),
            (
                StrategyName::BracketBalanced,
                vec![StrategyName::Semantic, StrategyName::LineBased],
            ),
        ]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_non_terminal_path_rejected() {
        let paths = FallbackPaths::new(BTreeMap::from([(
            StrategyName::Semantic,
            vec![StrategyName::BracketBalanced],
        )]));
        assert!(paths.validate().is_err());
    }

    #[test]
    fn test_terminal_with_successors_rejected() {
        let paths = FallbackPaths::new(BTreeMap::from([(
            StrategyName::LineBased,
            vec![StrategyName::Emergency],
        )]));
        assert!(paths.validate().is_err());
    }

    #[test]
    fn test_chain_ends_in_emergency() {
        let paths = FallbackPaths::default();
        assert_eq!(
            paths.chain_for(StrategyName::BracketBalanced),
            vec![StrategyName::LineBased, StrategyName::Emergency]
        );
        assert_eq!(
            paths.chain_for(StrategyName::LineBased),
            vec![StrategyName::Emergency]
        );
    }

    #[test]
    fn test_strategy_config_supports() {
        let any = StrategyConfig::new(StrategyName::LineBased, 5, &["*"]);
        assert!(any.supports("cobol"));
        let rust_only = StrategyConfig::new(StrategyName::AstStructural, 1, &["rust"]);
        assert!(rust_only.supports("Rust"));
        assert!(!rust_only.supports("python"));
    }

    #[test]
    fn test_param_override() {
        let mut strategy = StrategyConfig::new(StrategyName::LineBased, 5, &["*"]);
        strategy
            .parameters
            .insert("maxLinesPerChunk".to_string(), serde_json::json!(7));
        assert_eq!(strategy.param_usize("maxLinesPerChunk"), Some(7));
        assert_eq!(strategy.param_usize("missing"), None);
    }

    #[test]
    fn test_from_toml_str() {
        let raw = r#"
            [chunking]
            min_chunk_size = 10
            max_chunk_size = 500

            [line]
            max_lines_per_chunk = 20

            [post_processing]
            advanced_merge = true
        "#;
        let config = ProcessingConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.chunking.max_chunk_size, 500);
        assert_eq!(config.line.max_lines_per_chunk, 20);
        assert!(config.post_processing.advanced_merge);
        // Untouched sections keep their defaults
        assert_eq!(config.semantic.normal.max_lines, 50);
    }

    #[test]
    fn test_from_toml_str_rejects_invalid_values() {
        let raw = r#"
            [chunking]
            min_chunk_size = 900
            max_chunk_size = 100
        "#;
        assert!(matches!(
            ProcessingConfig::from_toml_str(raw),
            Err(SegmenterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_toml_str_rejects_malformed_documents() {
        assert!(matches!(
            ProcessingConfig::from_toml_str("chunking = ["),
            Err(SegmenterError::ConfigFormat(_))
        ));
    }
}
