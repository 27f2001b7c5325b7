use super::{keeps_upstream_settled, movable, settle_balance_flag, ChunkProcessor, ProcessingContext};
use crate::error::Result;
use crate::text;
use crate::types::CodeChunk;

const IDENTIFIER_WEIGHT: f64 = 0.5;
const TYPE_WEIGHT: f64 = 0.3;
const COMPLEXITY_WEIGHT: f64 = 0.2;

/// Merges neighbours that look alike, until no pair qualifies
pub struct AdvancedMergeProcessor;

/// Weighted similarity in `[0, 1]`: shared identifiers, same chunk type and
/// comparable complexity
pub fn similarity(a: &CodeChunk, b: &CodeChunk) -> f64 {
    let left = text::identifiers(a.content());
    let right = text::identifiers(b.content());
    let union = left.union(&right).count();
    #[allow(clippy::cast_precision_loss)]
    let jaccard = if union == 0 {
        0.0
    } else {
        left.intersection(&right).count() as f64 / union as f64
    };

    let same_type = if a.chunk_type() == b.chunk_type() { 1.0 } else { 0.0 };

    let (ca, cb) = (a.metadata().complexity, b.metadata().complexity);
    let closeness = 1.0 - f64::from(ca.abs_diff(cb)) / f64::from(ca.max(cb).max(1));

    IDENTIFIER_WEIGHT * jaccard + TYPE_WEIGHT * same_type + COMPLEXITY_WEIGHT * closeness
}

impl ChunkProcessor for AdvancedMergeProcessor {
    fn name(&self) -> &str {
        "advanced-merge"
    }

    fn should_apply(&self, chunks: &[CodeChunk], _context: &ProcessingContext<'_>) -> bool {
        chunks.len() > 1
    }

    fn process(
        &self,
        chunks: &[CodeChunk],
        context: &ProcessingContext<'_>,
    ) -> Result<Vec<CodeChunk>> {
        let mut current = chunks.to_vec();

        loop {
            let mut merged_any = false;
            let mut out: Vec<CodeChunk> = Vec::with_capacity(current.len());
            for (j, chunk) in current.iter().enumerate() {
                if let Some(merged) = out
                    .last()
                    .and_then(|prev| self.merge_candidate(prev, chunk, context))
                {
                    // Neighbourhood before and after the merge.
                    let lead = out.len().checked_sub(2).map(|k| &out[k]);
                    let next = current.get(j + 1);
                    let before: Vec<CodeChunk> = lead
                        .into_iter()
                        .chain(out.last())
                        .chain(Some(chunk))
                        .chain(next)
                        .cloned()
                        .collect();
                    let after: Vec<CodeChunk> = lead
                        .into_iter()
                        .chain(Some(&merged))
                        .chain(next)
                        .cloned()
                        .collect();
                    if keeps_upstream_settled(self.name(), &before, &after, context) {
                        out.pop();
                        out.push(merged);
                        merged_any = true;
                        continue;
                    }
                }
                out.push(chunk.clone());
            }
            current = out;
            if !merged_any {
                return Ok(current);
            }
        }
    }
}

impl AdvancedMergeProcessor {
    /// `prev` and `chunk` as one chunk, when they are alike and fit
    fn merge_candidate(
        &self,
        prev: &CodeChunk,
        chunk: &CodeChunk,
        context: &ProcessingContext<'_>,
    ) -> Option<CodeChunk> {
        let source = &context.source;
        let qualifies = movable(prev, chunk)
            && source.slice_len(prev.start_line(), chunk.end_line()) <= context.size_limit()
            && similarity(prev, chunk) > context.post().merge_threshold;
        qualifies.then(|| settle_balance_flag(CodeChunk::merged(prev, chunk, source)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{chunks, ranges};
    use super::*;
    use crate::config::ProcessingConfig;
    use pretty_assertions::assert_eq;

    const CONTENT: &str =
        "total = total + price * rate\ntotal = total + price * tax\nprint(report_header)";

    #[test]
    fn test_similar_neighbours_merge() {
        let config = ProcessingConfig::quality();
        let context = ProcessingContext::new(CONTENT, &config);
        let input = chunks(&context.source, &[(1, 1), (2, 2), (3, 3)]);

        let out = AdvancedMergeProcessor.process(&input, &context).unwrap();
        assert_eq!(ranges(&out), vec![(1, 2), (3, 3)]);
    }

    #[test]
    fn test_similarity_components() {
        let source = crate::text::SourceLines::new(CONTENT);
        let input = chunks(&source, &[(1, 1), (2, 2), (3, 3)]);

        // {total, price, rate} vs {total, price, tax}: jaccard 1/2
        let close = similarity(&input[0], &input[1]);
        assert!((close - 0.75).abs() < 1e-9);

        let far = similarity(&input[1], &input[2]);
        assert!((far - 0.5).abs() < 1e-9);
    }
}
