use super::{guarded_shift, movable, ChunkProcessor, ProcessingContext};
use crate::error::Result;
use crate::text;
use crate::types::CodeChunk;
use once_cell::sync::Lazy;
use regex::Regex;

static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:pub(?:\([^)]*\))?|export|default|async|static|public|private|protected)\s+)*(?:fn|def|class|function|func|impl|struct|enum|trait|interface|type|const|let|var|module)\b",
    )
    .expect("declaration regex is valid")
});

/// Moves each boundary between non-structural neighbours to the best
/// scoring line within the search window, pass after pass until none moves
pub struct BoundaryOptimizationProcessor;

/// Nesting depth after each line, from the top of the file
struct Depths(Vec<i64>);

impl Depths {
    fn new(context: &ProcessingContext<'_>) -> Self {
        let mut depth = 0;
        let mut after = vec![0];
        for line in context.source.lines() {
            depth += text::line_bracket_delta(line);
            after.push(depth);
        }
        Self(after)
    }

    fn after(&self, line: usize) -> i64 {
        self.0.get(line).copied().unwrap_or(0)
    }
}

impl BoundaryOptimizationProcessor {
    /// Score of a boundary right after line `k`. Depends on `k` alone, so a
    /// move never changes the score of another boundary.
    fn score(k: usize, depths: &Depths, context: &ProcessingContext<'_>) -> i64 {
        let source = &context.source;
        let here = source.line(k).unwrap_or("");
        let next = source.line(k + 1).unwrap_or("");

        let mut score = 0;
        if text::is_closing_line(here) {
            score += 3;
        }
        if text::is_blank(here) {
            score += 2;
        }
        if DECLARATION_RE.is_match(next) {
            score += 3;
        }
        if text::is_comment_line(next) {
            score += 1;
        }
        score - 2 * depths.after(k).abs()
    }

    /// Better ends for `chunks[i]`, best first
    fn candidates(
        chunks: &[CodeChunk],
        i: usize,
        depths: &Depths,
        context: &ProcessingContext<'_>,
    ) -> Vec<usize> {
        let (a, b) = (&chunks[i], &chunks[i + 1]);
        let post = context.post();
        let source = &context.source;
        let current = a.end_line();
        let window = post.boundary_search_window;

        let low = current.saturating_sub(window).max(a.start_line());
        let high = (current + window).min(b.end_line() - 1);

        let acceptable = |k: usize| {
            let size_a = source.slice_len(a.start_line(), k);
            let size_b = source.slice_len(k + 1, b.end_line());
            size_a.max(size_b) <= context.size_limit()
                && size_a.min(size_b) >= post.min_chunk_size_threshold
        };

        let current_score = Self::score(current, depths, context);
        let mut scored: Vec<(i64, usize)> = (low..=high)
            .filter(|&k| k != current && acceptable(k))
            .map(|k| (Self::score(k, depths, context), k))
            .filter(|(score, _)| *score > current_score)
            .collect();
        // Highest score, then nearest to the current boundary, then earliest.
        scored.sort_by_key(|(score, k)| (-score, k.abs_diff(current), *k));
        scored.into_iter().map(|(_, k)| k).collect()
    }
}

impl ChunkProcessor for BoundaryOptimizationProcessor {
    fn name(&self) -> &str {
        "boundary-optimization"
    }

    fn should_apply(&self, chunks: &[CodeChunk], context: &ProcessingContext<'_>) -> bool {
        chunks.len() > 1 && context.post().boundary_search_window > 0
    }

    fn process(
        &self,
        chunks: &[CodeChunk],
        context: &ProcessingContext<'_>,
    ) -> Result<Vec<CodeChunk>> {
        let depths = Depths::new(context);
        let mut out = chunks.to_vec();
        // Each move raises the score of one boundary and leaves the others.
        loop {
            let mut moved = false;
            for i in 0..out.len().saturating_sub(1) {
                if !movable(&out[i], &out[i + 1]) {
                    continue;
                }
                let shifted = Self::candidates(&out, i, &depths, context)
                    .into_iter()
                    .find_map(|end| guarded_shift(self.name(), &out, i, end, context));
                if let Some((a, b)) = shifted {
                    out[i] = a;
                    out[i + 1] = b;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{chunks, ranges};
    use super::*;
    use crate::config::ProcessingConfig;
    use pretty_assertions::assert_eq;

    const CODE: &str = "function alpha() {\n    return computeTheAnswer();\n}\n\nfunction beta() {\n    return anotherValue();\n}";

    fn config() -> ProcessingConfig {
        let mut config = ProcessingConfig::default();
        config.post_processing.min_chunk_size_threshold = 5;
        config
    }

    #[test]
    fn test_moves_boundary_out_of_open_block() {
        let config = config();
        let context = ProcessingContext::new(CODE, &config);
        let input = chunks(&context.source, &[(1, 2), (3, 7)]);

        let out = BoundaryOptimizationProcessor.process(&input, &context).unwrap();
        assert_eq!(ranges(&out), vec![(1, 4), (5, 7)]);
    }

    #[test]
    fn test_good_boundary_stays() {
        let config = config();
        let context = ProcessingContext::new(CODE, &config);
        let input = chunks(&context.source, &[(1, 4), (5, 7)]);

        let out = BoundaryOptimizationProcessor.process(&input, &context).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_zero_window_disables() {
        let mut config = config();
        config.post_processing.boundary_search_window = 0;
        let context = ProcessingContext::new(CODE, &config);
        let input = chunks(&context.source, &[(1, 2), (3, 7)]);
        assert!(!BoundaryOptimizationProcessor.should_apply(&input, &context));
    }
}
