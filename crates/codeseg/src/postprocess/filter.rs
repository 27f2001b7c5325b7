use super::{movable, settle_balance_flag, ChunkProcessor, ProcessingContext};
use crate::error::Result;
use crate::text::{self, SourceLines};
use crate::types::CodeChunk;

/// Drops noise chunks, splits oversized ones and folds tiny ones into a
/// neighbour
pub struct IntelligentFilterProcessor;

impl IntelligentFilterProcessor {
    /// Whitespace- or punctuation-only chunks go, unless nothing would remain
    fn drop_noise(chunks: &[CodeChunk]) -> Vec<CodeChunk> {
        let kept: Vec<CodeChunk> = chunks
            .iter()
            .filter(|c| text::has_substance(c.content()))
            .cloned()
            .collect();
        if kept.is_empty() {
            chunks.to_vec()
        } else {
            kept
        }
    }

    /// Cut non-structural chunks above `max` at line boundaries. Declarations,
    /// chunks carrying overlap and single lines longer than `max` stay whole.
    fn split_oversized(chunk: CodeChunk, max: usize, source: &SourceLines<'_>) -> Vec<CodeChunk> {
        if chunk.size() <= max
            || chunk.line_count() < 2
            || chunk.chunk_type().is_structural()
            || chunk.has_overlap()
        {
            return vec![chunk];
        }
        let mut pieces = Vec::new();
        let mut start = chunk.start_line();
        for n in chunk.start_line()..=chunk.end_line() {
            if n > start && source.slice_len(start, n) > max {
                pieces.push(settle_balance_flag(chunk.with_range(source, start, n - 1)));
                start = n;
            }
        }
        pieces.push(settle_balance_flag(chunk.with_range(
            source,
            start,
            chunk.end_line(),
        )));
        pieces
    }

    /// One pass of small-chunk merging; true if anything merged
    fn merge_small_pass(
        chunks: Vec<CodeChunk>,
        min: usize,
        limit: usize,
        source: &SourceLines<'_>,
    ) -> (Vec<CodeChunk>, bool) {
        let fits = |a: &CodeChunk, b: &CodeChunk| {
            movable(a, b) && source.slice_len(a.start_line(), b.end_line()) <= limit
        };

        let mut merged_any = false;
        let mut out: Vec<CodeChunk> = Vec::with_capacity(chunks.len());
        let mut iter = chunks.into_iter().peekable();
        while let Some(chunk) = iter.next() {
            if chunk.size() < min {
                if let Some(prev) = out.last() {
                    if fits(prev, &chunk) {
                        let merged = settle_balance_flag(CodeChunk::merged(prev, &chunk, source));
                        out.pop();
                        out.push(merged);
                        merged_any = true;
                        continue;
                    }
                }
                if let Some(next) = iter.peek() {
                    if fits(&chunk, next) {
                        let merged = settle_balance_flag(CodeChunk::merged(&chunk, next, source));
                        iter.next();
                        out.push(merged);
                        merged_any = true;
                        continue;
                    }
                }
            }
            out.push(chunk);
        }
        (out, merged_any)
    }
}

impl ChunkProcessor for IntelligentFilterProcessor {
    fn name(&self) -> &str {
        "intelligent-filter"
    }

    fn process(
        &self,
        chunks: &[CodeChunk],
        context: &ProcessingContext<'_>,
    ) -> Result<Vec<CodeChunk>> {
        let post = context.post();
        let source = &context.source;

        let pieces: Vec<CodeChunk> = chunks
            .iter()
            .cloned()
            .flat_map(|chunk| Self::split_oversized(chunk, post.max_chunk_size_threshold, source))
            .collect();
        let mut out = Self::drop_noise(&pieces);

        loop {
            let (merged, changed) = Self::merge_small_pass(
                out,
                post.min_chunk_size_threshold,
                context.size_limit(),
                source,
            );
            out = merged;
            if !changed {
                break;
            }
        }
        Ok(out)
    }
}
