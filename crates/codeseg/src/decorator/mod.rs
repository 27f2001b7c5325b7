//! Cross-cutting wrappers around a strategy.
//!
//! [`DecoratorChain`] is the only way to stack them. Whatever order the
//! builder methods are called in, the result is always
//! cache -> overlap -> monitor -> strategy (outermost first), so a cache hit
//! skips both the overlap pass and the strategy itself.

mod cache;
mod monitor;
mod overlap;

pub use cache::{content_hash, CacheDecorator, CacheStats, ChunkCache};
pub use monitor::{
    timed, LogTelemetry, MemoryTelemetry, MonitorDecorator, TelemetryEvent, TelemetrySink,
};
pub use overlap::OverlapDecorator;

use crate::config::{ChunkingConfig, OverlapConfig};
use crate::strategy::SplitStrategy;
use std::sync::Arc;

/// Collects the decorators to apply to one strategy
pub struct DecoratorChain {
    strategy: Box<dyn SplitStrategy>,
    cache: Option<(Arc<ChunkCache>, ChunkingConfig)>,
    overlap: Option<(OverlapConfig, usize)>,
    monitor: Option<Arc<dyn TelemetrySink>>,
}

impl DecoratorChain {
    pub fn builder(strategy: Box<dyn SplitStrategy>) -> Self {
        Self {
            strategy,
            cache: None,
            overlap: None,
            monitor: None,
        }
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<ChunkCache>, chunking: ChunkingConfig) -> Self {
        self.cache = Some((cache, chunking));
        self
    }

    #[must_use]
    pub fn overlap(mut self, config: OverlapConfig, max_chunk_size: usize) -> Self {
        self.overlap = Some((config, max_chunk_size));
        self
    }

    #[must_use]
    pub fn monitor(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.monitor = Some(sink);
        self
    }

    pub fn build(self) -> Box<dyn SplitStrategy> {
        let mut strategy = self.strategy;
        if let Some(sink) = self.monitor {
            strategy = Box::new(MonitorDecorator::new(strategy, sink));
        }
        let overlap_key = self.overlap.as_ref().map(|(config, _)| config.clone());
        if let Some((config, max_chunk_size)) = self.overlap {
            strategy = Box::new(OverlapDecorator::new(strategy, config, max_chunk_size));
        }
        if let Some((cache, chunking)) = self.cache {
            strategy = Box::new(CacheDecorator::new(strategy, cache, overlap_key, chunking));
        }
        strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::strategy::{self, SplitRequest, StrategyName};

    fn request() -> SplitRequest<'static> {
        SplitRequest::new("one\ntwo\nthree\nfour", "text")
    }

    fn line_strategy() -> Box<dyn SplitStrategy> {
        let mut config = ProcessingConfig::default();
        config.line.max_lines_per_chunk = 2;
        strategy::build(StrategyName::LineBased, &config)
    }

    fn overlap() -> OverlapConfig {
        OverlapConfig {
            lines: 1,
            max_overlap_ratio: 1.0,
            trailing: false,
        }
    }

    #[test]
    fn test_order_is_independent_of_builder_calls() {
        let sink_a = Arc::new(MemoryTelemetry::new());
        let sink_b = Arc::new(MemoryTelemetry::new());
        let cache_a = Arc::new(ChunkCache::new(4));
        let cache_b = Arc::new(ChunkCache::new(4));

        let a = DecoratorChain::builder(line_strategy())
            .cache(cache_a, ChunkingConfig::default())
            .overlap(overlap(), 1000)
            .monitor(sink_a.clone())
            .build();
        let b = DecoratorChain::builder(line_strategy())
            .monitor(sink_b.clone())
            .overlap(overlap(), 1000)
            .cache(cache_b, ChunkingConfig::default())
            .build();

        assert_eq!(a.split(&request()).unwrap(), b.split(&request()).unwrap());
        assert_eq!(a.split(&request()).unwrap(), b.split(&request()).unwrap());
        // The monitor sits inside the cache: hits are not timed.
        assert_eq!(sink_a.events().len(), 1);
        assert_eq!(sink_b.events().len(), 1);
    }

    #[test]
    fn test_cache_stores_post_overlap_result() {
        let cache = Arc::new(ChunkCache::new(4));
        let chain = DecoratorChain::builder(line_strategy())
            .overlap(overlap(), 1000)
            .cache(cache, ChunkingConfig::default())
            .build();

        let first = chain.split(&request()).unwrap();
        let hit = chain.split(&request()).unwrap();
        assert!(first[1].has_overlap());
        assert_eq!(first, hit);
    }

    #[test]
    fn test_bare_chain_is_the_strategy() {
        let chain = DecoratorChain::builder(line_strategy()).build();
        assert_eq!(chain.name(), StrategyName::LineBased);
        assert_eq!(chain.split(&request()).unwrap().len(), 2);
    }
}
