use super::{movable, settle_balance_flag, shift_boundary, ChunkProcessor, ProcessingContext};
use crate::error::Result;
use crate::text;
use crate::types::{CodeChunk, UNBALANCED};

/// Closes brackets left open at a chunk end by borrowing lines from the next
/// chunk; flags the chunk when that is not possible.
///
/// A chunk already flagged keeps its lines, and a balanced chunk loses a
/// stale flag.
pub struct SymbolBalanceProcessor;

impl SymbolBalanceProcessor {
    /// Lines to borrow from `next` so `chunk` ends balanced
    fn borrow_count(
        chunk: &CodeChunk,
        next: &CodeChunk,
        depth: i64,
        context: &ProcessingContext<'_>,
    ) -> Option<usize> {
        if !movable(chunk, next) {
            return None;
        }
        let source = &context.source;
        // Leave at least one line behind.
        let max_borrow = context
            .post()
            .max_borrow_lines
            .min(next.line_count().saturating_sub(1));

        let mut open = depth;
        for k in 1..=max_borrow {
            let n = next.start_line() + k - 1;
            open += text::line_bracket_delta(source.line(n).unwrap_or(""));
            if source.slice_len(chunk.start_line(), n) > context.size_limit() {
                return None;
            }
            if open == 0 {
                return Some(k);
            }
            if open < 0 {
                return None;
            }
        }
        None
    }
}

impl ChunkProcessor for SymbolBalanceProcessor {
    fn name(&self) -> &str {
        "symbol-balance"
    }

    fn process(
        &self,
        chunks: &[CodeChunk],
        context: &ProcessingContext<'_>,
    ) -> Result<Vec<CodeChunk>> {
        let mut out = chunks.to_vec();
        for i in 0..out.len() {
            let depth = text::bracket_delta(out[i].content());
            let flagged = out[i].metadata().extensions.contains_key(UNBALANCED);

            if depth > 0 && !flagged {
                let borrowed = out
                    .get(i + 1)
                    .and_then(|next| Self::borrow_count(&out[i], next, depth, context));
                if let Some(k) = borrowed {
                    let end = out[i].end_line() + k;
                    let (a, b) = shift_boundary(&out[i], &out[i + 1], end, &context.source);
                    log::debug!("Balanced chunk at line {} by borrowing {k} line(s)", a.start_line());
                    out[i] = a;
                    out[i + 1] = b;
                    continue;
                }
            }

            out[i] = settle_balance_flag(out[i].clone());
        }
        Ok(out)
    }
}
