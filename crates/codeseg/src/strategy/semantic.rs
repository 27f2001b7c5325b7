use super::{SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::config::{SemanticConfig, SemanticThresholds, StrategyConfig};
use crate::error::Result;
use crate::language::Language;
use crate::text::{self, SourceLines};
use crate::types::{ChunkType, CodeChunk};

/// Line scanner that accumulates a semantic score and cuts at logical
/// boundaries. Fine mode is the same scanner with tighter thresholds.
pub struct SemanticStrategy {
    name: StrategyName,
    profile: StrategyConfig,
    thresholds: SemanticThresholds,
    comment_damping: f32,
}

impl SemanticStrategy {
    pub fn normal(profile: StrategyConfig, config: &SemanticConfig) -> Self {
        Self::with_thresholds(StrategyName::Semantic, profile, config.normal.clone(), config)
    }

    pub fn fine(profile: StrategyConfig, config: &SemanticConfig) -> Self {
        Self::with_thresholds(StrategyName::SemanticFine, profile, config.fine.clone(), config)
    }

    fn with_thresholds(
        name: StrategyName,
        profile: StrategyConfig,
        mut thresholds: SemanticThresholds,
        config: &SemanticConfig,
    ) -> Self {
        if let Some(max) = profile.param_usize("maxChunkSize") {
            thresholds.max_chunk_size = max;
        }
        if let Some(lines) = profile.param_usize("maxLinesPerChunk") {
            thresholds.max_lines = lines;
        }
        if let Some(min) = profile.param_usize("minChunkSize") {
            thresholds.min_chunk_size = min;
        }
        Self {
            name,
            profile,
            thresholds,
            comment_damping: config.comment_damping,
        }
    }

    /// Score one line: keyword weights plus bracket weights, damped for
    /// comments, zero for blank lines.
    fn line_score(&self, line: &str, language: Language) -> f32 {
        if text::is_blank(line) {
            return 0.0;
        }

        let weights = language.keyword_weights();
        let keywords: f32 = line
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| !word.is_empty())
            .filter_map(|word| {
                weights
                    .iter()
                    .find(|(keyword, _)| *keyword == word)
                    .map(|(_, weight)| *weight)
            })
            .sum();

        let brackets: f32 = line
            .chars()
            .map(|c| match c {
                '{' | '}' => 1.0,
                '(' | ')' | '[' | ']' => 0.5,
                _ => 0.0,
            })
            .sum();

        let score = keywords + brackets;
        if text::is_comment_line(line) {
            score * self.comment_damping
        } else {
            score
        }
    }

    /// Whether a chunk may end after line `n`
    fn is_boundary_after(source: &SourceLines<'_>, n: usize, depth: i64) -> bool {
        let Some(line) = source.line(n) else {
            return true;
        };
        if text::is_closing_line(line) && depth <= 0 {
            return true;
        }
        if text::is_blank(line)
            && n > 1
            && source
                .line(n - 1)
                .is_some_and(|prev| text::is_list_item(prev) || prev.trim_end().ends_with(','))
        {
            return true;
        }
        match source.line(n + 1) {
            Some(next) => text::is_comment_line(next) && !text::is_comment_line(line),
            None => true,
        }
    }
}

impl SplitStrategy for SemanticStrategy {
    fn name(&self) -> StrategyName {
        self.name
    }

    fn priority(&self) -> u32 {
        self.profile.priority
    }

    fn supported_languages(&self) -> &[String] {
        &self.profile.supported_languages
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile,
            "thresholds": self.thresholds,
            "commentDamping": self.comment_damping,
        })
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        self.profile.supports(context.language)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        let total = source.len();
        let language = request.lang();
        let limits = &self.thresholds;
        let mut chunks = Vec::new();

        let mut start = 1;
        let mut score = 0.0f32;
        let mut depth = 0i64;
        let mut n = 1;
        while n <= total {
            let line = source.line(n).unwrap_or("");

            // Hard limit: cut before a line that would overflow the chunk.
            if n > start && source.slice_len(start, n) > limits.max_chunk_size {
                chunks.push(request.chunk(&source, start, n - 1, ChunkType::Block, self.name));
                start = n;
                score = 0.0;
                depth = 0;
            }

            score += self.line_score(line, language);
            depth = (depth + text::line_bracket_delta(line)).max(0);
            let size = source.slice_len(start, n);
            let lines = n - start + 1;

            let at_limit = lines >= limits.max_lines;
            let soft_cut = size >= limits.min_chunk_size
                && (score >= limits.score_threshold
                    || Self::is_boundary_after(&source, n, depth))
                && depth == 0;

            if n == total && !at_limit && !soft_cut && (start..=n).all(|i| {
                source.line(i).map_or(true, text::is_blank)
            }) {
                // Trailing blank lines join the previous chunk if it has room.
                if let Some(last) = chunks.pop() {
                    let fits = source.slice_len(last.start_line(), n) <= limits.max_chunk_size
                        && n - last.start_line() < limits.max_lines;
                    if fits {
                        chunks.push(last.with_range(&source, last.start_line(), n));
                    } else {
                        chunks.push(last);
                        chunks.push(request.chunk(&source, start, n, ChunkType::Block, self.name));
                    }
                    break;
                }
            }

            if at_limit || soft_cut || n == total {
                chunks.push(request.chunk(&source, start, n, ChunkType::Block, self.name));
                start = n + 1;
                score = 0.0;
                depth = 0;
            }
            n += 1;
        }

        Ok(chunks)
    }
}
