use super::{ChunkProcessor, ProcessingContext};
use crate::error::Result;
use crate::overlap::apply_overlap;
use crate::types::CodeChunk;

/// Final-boundary context injection. Always the last processor.
pub struct OverlapProcessor;

impl OverlapProcessor {
    pub const NAME: &'static str = "overlap";
}

impl ChunkProcessor for OverlapProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn should_apply(&self, chunks: &[CodeChunk], context: &ProcessingContext<'_>) -> bool {
        chunks.len() > 1 && context.config.overlap.lines > 0
    }

    fn process(
        &self,
        chunks: &[CodeChunk],
        context: &ProcessingContext<'_>,
    ) -> Result<Vec<CodeChunk>> {
        Ok(apply_overlap(
            chunks,
            &context.source,
            &context.config.overlap,
            context.config.chunking.max_chunk_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::chunks;
    use super::*;
    use crate::config::ProcessingConfig;

    #[test]
    fn test_applies_configured_overlap_once() {
        let mut config = ProcessingConfig::default();
        config.overlap.max_overlap_ratio = 1.0;
        let content = "first line here\nsecond line here\nthird line here\nfourth line here";
        let context = ProcessingContext::new(content, &config);
        let input = chunks(&context.source, &[(1, 2), (3, 4)]);

        let once = OverlapProcessor.process(&input, &context).unwrap();
        assert_eq!(once[1].start_line(), 1);
        assert!(once[1].has_overlap());

        let twice = OverlapProcessor.process(&once, &context).unwrap();
        assert_eq!(once, twice);
    }
}
