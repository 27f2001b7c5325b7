use super::{SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::config::StrategyConfig;
use crate::error::Result;
use crate::text::SourceLines;
use crate::types::{ChunkType, CodeChunk};

/// Whole content as one chunk. Last entry of every fallback chain.
pub struct EmergencyStrategy {
    profile: StrategyConfig,
}

impl EmergencyStrategy {
    pub fn new(profile: StrategyConfig) -> Self {
        Self { profile }
    }
}

impl SplitStrategy for EmergencyStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Emergency
    }

    fn priority(&self) -> u32 {
        self.profile.priority
    }

    fn supported_languages(&self) -> &[String] {
        &self.profile.supported_languages
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({ "profile": self.profile })
    }

    fn can_handle(&self, _context: &SplitContext<'_>) -> bool {
        true
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        if source.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![request.chunk(
            &source,
            1,
            source.len(),
            ChunkType::Generic,
            self.name(),
        )])
    }
}
