use super::{SizeLimits, SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::config::{ProcessingConfig, StrategyConfig};
use crate::error::Result;
use crate::language::Language;
use crate::text::{self, SourceLines};
use crate::types::{ChunkType, CodeChunk};

/// Extension flag on chunks cut by a size, line or depth limit
pub const FORCED_SPLIT: &str = "forcedSplit";

/// Splits where bracket (and tag) depth returns to zero
pub struct BracketBalancedStrategy {
    profile: StrategyConfig,
    limits: SizeLimits,
    tolerance: i64,
    track_tags: bool,
}

impl BracketBalancedStrategy {
    pub fn new(profile: StrategyConfig, config: &ProcessingConfig) -> Self {
        let limits = SizeLimits::resolve(&profile, &config.chunking);
        Self {
            profile,
            limits,
            tolerance: i64::from(config.bracket.imbalance_tolerance),
            track_tags: config.bracket.track_tags,
        }
    }

    /// Tags only count where `<` cannot be a comparison or a generic
    fn counts_tags(&self, language: Language) -> bool {
        self.track_tags && (language.is_markup() || language == Language::Unknown)
    }

    fn line_delta(&self, line: &str, tags: bool) -> i64 {
        let brackets = text::line_bracket_delta(line);
        if tags {
            brackets + text::tag_delta(line)
        } else {
            brackets
        }
    }
}

impl SplitStrategy for BracketBalancedStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::BracketBalanced
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
            "limits": self.limits,
            "tolerance": self.tolerance,
            "trackTags": self.track_tags,
        })
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        self.profile.supports(context.language)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        let total = source.len();
        let tags = self.counts_tags(request.lang());
        let mut chunks = Vec::new();

        let mut emit = |start: usize, end: usize, forced: bool| {
            let chunk = request.chunk(&source, start, end, ChunkType::Block, self.name());
            chunks.push(if forced {
                chunk.with_extension(FORCED_SPLIT, true)
            } else {
                chunk
            });
        };

        let mut start = 1;
        let mut depth = 0i64;
        for (idx, line) in source.lines().iter().enumerate() {
            let n = idx + 1;

            // Adding this line would overflow: cut before it.
            if n > start && source.slice_len(start, n) > self.limits.max_size {
                emit(start, n - 1, true);
                start = n;
                depth = 0;
            }

            depth += self.line_delta(line, tags);
            let size = source.slice_len(start, n);
            let lines = n - start + 1;

            if depth <= 0 && size >= self.limits.min_size {
                emit(start, n, false);
                start = n + 1;
                depth = 0;
            } else if lines >= self.limits.max_lines || depth.abs() > self.tolerance {
                log::debug!(
                    "bracket-balanced: forced split at line {n} (depth {depth}, {lines} lines)"
                );
                emit(start, n, true);
                start = n + 1;
                depth = 0;
            }
        }

        if start <= total {
            emit(start, total, false);
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(min: usize, max: usize, max_lines: usize) -> BracketBalancedStrategy {
        let mut config = ProcessingConfig::default();
        config.chunking.min_chunk_size = min;
        config.chunking.max_chunk_size = max;
        config.chunking.max_lines_per_chunk = max_lines;
        BracketBalancedStrategy::new(
            StrategyConfig::new(StrategyName::BracketBalanced, 4, &["*"]),
            &config,
        )
    }

    #[test]
    fn test_never_splits_inside_balanced_pairs() {
        let content = "a {\n  one\n}\nb {\n  two\n}\nc {\n  three\n}";
        let chunks = strategy(1, 1000, 100)
            .split(&SplitRequest::new(content, "text"))
            .unwrap();
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(text::bracket_delta(chunk.content()), 0, "{}", chunk.content());
            assert!(chunk.metadata().extensions.get(FORCED_SPLIT).is_none());
        }
    }

    #[test]
    fn test_waits_for_minimum_size() {
        let content = "{}\n{}\n{}";
        let chunks = strategy(100, 1000, 100)
            .split(&SplitRequest::new(content, "text"))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_line(), 3);
    }

    #[test]
    fn test_runaway_depth_forces_split() {
        let content = "{\n".repeat(40);
        let chunks = strategy(1, 100_000, 1000)
            .split(&SplitRequest::new(&content, "text"))
            .unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(
            chunks[0].metadata().extensions.get(FORCED_SPLIT),
            Some(&serde_json::json!(true))
        );
    }

    #[test]
    fn test_max_size_respected() {
        let content = (0..30)
            .map(|i| format!("let value_{i} = compute({i});"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = strategy(10_000, 200, 1000)
            .split(&SplitRequest::new(&content, "text"))
            .unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.size() <= 200));
    }

    #[test]
    fn test_tags_balance_markup() {
        let content = "<a>\n<b>x</b>\n</a>\n<c>\n</c>";
        let chunks = strategy(1, 1000, 100)
            .split(&SplitRequest::new(content, "xml"))
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].end_line(), 3);
    }
}
