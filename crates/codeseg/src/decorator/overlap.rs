use crate::config::OverlapConfig;
use crate::error::Result;
use crate::overlap::apply_overlap;
use crate::strategy::{SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::text::SourceLines;
use crate::types::CodeChunk;

/// Adds neighbour context to the chunks of a single strategy run
pub struct OverlapDecorator {
    inner: Box<dyn SplitStrategy>,
    config: OverlapConfig,
    max_chunk_size: usize,
}

impl OverlapDecorator {
    pub(crate) fn new(
        inner: Box<dyn SplitStrategy>,
        config: OverlapConfig,
        max_chunk_size: usize,
    ) -> Self {
        Self {
            inner,
            config,
            max_chunk_size,
        }
    }
}

impl SplitStrategy for OverlapDecorator {
    fn name(&self) -> StrategyName {
        self.inner.name()
    }

    fn priority(&self) -> u32 {
        self.inner.priority()
    }

    fn supported_languages(&self) -> &[String] {
        self.inner.supported_languages()
    }

    fn options(&self) -> serde_json::Value {
        self.inner.options()
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        self.inner.can_handle(context)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let chunks = self.inner.split(request)?;
        let source = SourceLines::new(request.content);
        Ok(apply_overlap(
            &chunks,
            &source,
            &self.config,
            self.max_chunk_size,
        ))
    }
}
