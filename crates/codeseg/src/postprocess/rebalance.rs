use super::{guarded_shift, movable, ChunkProcessor, ProcessingContext};
use crate::error::Result;
use crate::text;
use crate::types::CodeChunk;

/// Evens out lopsided neighbours by moving bracket-neutral lines across
/// their shared boundary, pass after pass until no pair moves
pub struct SmartRebalanceProcessor;

impl SmartRebalanceProcessor {
    /// New end line for `a`, or `None` when the pair stays as is
    fn rebalanced_end(a: &CodeChunk, b: &CodeChunk, context: &ProcessingContext<'_>) -> Option<usize> {
        let post = context.post();
        let source = &context.source;
        let (larger, smaller) = (a.size().max(b.size()), a.size().min(b.size()).max(1));
        #[allow(clippy::cast_precision_loss)]
        let ratio = larger as f64 / smaller as f64;
        if ratio <= post.rebalance_ratio {
            return None;
        }

        let cap = if post.conservative_rebalance {
            post.max_shift_lines
        } else {
            usize::MAX
        };
        let from_a = a.size() > b.size();

        let mut end = a.end_line();
        let mut shifted = 0;
        while shifted < cap {
            let (candidate, moved_line) = if from_a {
                if end <= a.start_line() {
                    break;
                }
                (end - 1, end)
            } else {
                if end + 1 >= b.end_line() {
                    break;
                }
                (end + 1, end + 1)
            };
            if text::line_bracket_delta(source.line(moved_line).unwrap_or("")) != 0 {
                break;
            }

            let old = source.slice_len(a.start_line(), end).abs_diff(source.slice_len(end + 1, b.end_line()));
            let size_a = source.slice_len(a.start_line(), candidate);
            let size_b = source.slice_len(candidate + 1, b.end_line());
            if size_a.abs_diff(size_b) >= old || size_a.max(size_b) > context.size_limit() {
                break;
            }
            end = candidate;
            shifted += 1;
        }

        (end != a.end_line()).then_some(end)
    }
}

impl ChunkProcessor for SmartRebalanceProcessor {
    fn name(&self) -> &str {
        "smart-rebalance"
    }

    fn should_apply(&self, chunks: &[CodeChunk], _context: &ProcessingContext<'_>) -> bool {
        chunks.len() > 1
    }

    fn process(
        &self,
        chunks: &[CodeChunk],
        context: &ProcessingContext<'_>,
    ) -> Result<Vec<CodeChunk>> {
        let mut out = chunks.to_vec();
        // Every move shrinks a size difference, so the passes run out.
        loop {
            let mut moved = false;
            for i in 0..out.len().saturating_sub(1) {
                if !movable(&out[i], &out[i + 1]) {
                    continue;
                }
                let Some(end) = Self::rebalanced_end(&out[i], &out[i + 1], context) else {
                    continue;
                };
                if let Some((a, b)) = guarded_shift(self.name(), &out, i, end, context) {
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
