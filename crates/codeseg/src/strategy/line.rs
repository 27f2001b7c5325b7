use super::{SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::config::{LineConfig, StrategyConfig};
use crate::error::Result;
use crate::text::SourceLines;
use crate::types::{ChunkType, CodeChunk};

/// Fixed-size sliding window over lines. Never fails.
pub struct LineBasedStrategy {
    profile: StrategyConfig,
    max_lines: usize,
    overlap_lines: usize,
}

impl LineBasedStrategy {
    pub fn new(profile: StrategyConfig, config: &LineConfig) -> Self {
        let max_lines = profile
            .param_usize("maxLinesPerChunk")
            .unwrap_or(config.max_lines_per_chunk)
            .max(1);
        let overlap_lines = profile
            .param_usize("overlapLines")
            .unwrap_or(config.overlap_lines)
            .min(max_lines - 1);
        Self {
            profile,
            max_lines,
            overlap_lines,
        }
    }
}

impl SplitStrategy for LineBasedStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::LineBased
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
            "maxLines": self.max_lines,
            "overlapLines": self.overlap_lines,
        })
    }

    fn can_handle(&self, _context: &SplitContext<'_>) -> bool {
        true
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        let total = source.len();
        let mut chunks = Vec::with_capacity(total.div_ceil(self.max_lines));

        let mut start = 1;
        while start <= total {
            let end = (start + self.max_lines - 1).min(total);
            chunks.push(request.chunk(&source, start, end, ChunkType::Generic, self.name()));
            if end == total {
                break;
            }
            start = end + 1 - self.overlap_lines;
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(lines: usize) -> String {
        (1..=lines)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn strategy(max_lines: usize, overlap_lines: usize) -> LineBasedStrategy {
        LineBasedStrategy::new(
            StrategyConfig::new(StrategyName::LineBased, 5, &["*"]),
            &LineConfig {
                max_lines_per_chunk: max_lines,
                overlap_lines,
            },
        )
    }

    #[test]
    fn test_chunk_count_is_ceiling() {
        let content = numbered(23);
        let chunks = strategy(5, 0)
            .split(&SplitRequest::new(&content, "text"))
            .unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[4].start_line(), 21);
        assert_eq!(chunks[4].end_line(), 23);
        for pair in chunks.windows(2) {
            assert!(pair[0].is_adjacent_to(&pair[1]));
        }
    }

    #[test]
    fn test_small_file_single_chunk() {
        let content = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}";
        let chunks = strategy(50, 0)
            .split(&SplitRequest::new(content, "rust"))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content(), content);
        assert_eq!(chunks[0].chunk_type(), ChunkType::Generic);
    }

    #[test]
    fn test_overlap_windows_share_lines() {
        let content = numbered(10);
        let chunks = strategy(4, 1)
            .split(&SplitRequest::new(&content, "text"))
            .unwrap();
        let ranges: Vec<_> = chunks
            .iter()
            .map(|c| (c.start_line(), c.end_line()))
            .collect();
        assert_eq!(ranges, vec![(1, 4), (4, 7), (7, 10)]);
    }

    #[test]
    fn test_parameter_override() {
        let mut profile = StrategyConfig::new(StrategyName::LineBased, 5, &["*"]);
        profile
            .parameters
            .insert("maxLinesPerChunk".to_string(), serde_json::json!(2));
        let strategy = LineBasedStrategy::new(profile, &LineConfig::default());
        let content = numbered(5);
        let chunks = strategy.split(&SplitRequest::new(&content, "text")).unwrap();
        assert_eq!(chunks.len(), 3);
    }
}
