use crate::ast::{ParseResult, SyntaxParser};
use crate::config::ProcessingConfig;
use crate::decorator::{
    timed, CacheStats, ChunkCache, DecoratorChain, LogTelemetry, TelemetrySink,
};
use crate::detection::DetectionResult;
use crate::error::Result;
use crate::executor::{ExecutionState, ExecutionTrace, FallbackExecutor};
use crate::language::Language;
use crate::postprocess::{ChunkProcessor, PostProcessingPipeline, ProcessingContext};
use crate::selector::{SelectionInput, StrategyPlan, StrategySelector};
use crate::strategy::{SplitRequest, StrategyName, StrategyRegistry};
use crate::types::{ChunkingStats, CodeChunk};
use std::sync::Arc;

/// One file to segment
#[derive(Debug, Clone)]
pub struct SegmentRequest<'a> {
    pub content: &'a str,
    pub file_path: Option<&'a str>,
    pub detection: DetectionResult,
    /// Parse supplied by the caller. When absent and auto-parsing is on, the
    /// segmenter parses grammar-backed languages itself.
    pub parse: Option<&'a ParseResult>,
}

impl<'a> SegmentRequest<'a> {
    pub fn new(content: &'a str, detection: DetectionResult) -> Self {
        Self {
            content,
            file_path: None,
            detection,
            parse: None,
        }
    }

    /// Request for content whose language is known for certain
    pub fn for_language(content: &'a str, language: &str) -> Self {
        Self::new(
            content,
            DetectionResult::new(language, 1.0).with_content_length(content.len()),
        )
    }

    #[must_use]
    pub const fn with_file_path(mut self, path: &'a str) -> Self {
        self.file_path = Some(path);
        self
    }

    #[must_use]
    pub const fn with_parse(mut self, parse: &'a ParseResult) -> Self {
        self.parse = Some(parse);
        self
    }
}

/// Chunks plus how they were produced
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub chunks: Vec<CodeChunk>,
    pub plan: StrategyPlan,
    pub trace: ExecutionTrace,
}

impl SegmentOutcome {
    pub fn stats(&self) -> ChunkingStats {
        ChunkingStats::from_chunks(&self.chunks)
    }
}

/// Entry point: selection, fallback execution and post-processing.
///
/// Immutable after construction and safe to share across threads; the only
/// shared mutable state is the optional [`ChunkCache`].
pub struct Segmenter {
    config: Arc<ProcessingConfig>,
    registry: StrategyRegistry,
    pipeline: PostProcessingPipeline,
    cache: Option<Arc<ChunkCache>>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Segmenter {
    /// Validate `config` and build every strategy with its decorators
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        config.validate()?;
        let cache = config
            .decorators
            .cache
            .then(|| Arc::new(ChunkCache::new(config.decorators.cache_capacity)));
        let pipeline = PostProcessingPipeline::from_config(&config.post_processing);

        let mut segmenter = Self {
            config: Arc::new(config),
            registry: StrategyRegistry::new(),
            pipeline,
            cache,
            telemetry: Arc::new(LogTelemetry),
        };
        segmenter.rebuild_registry();
        Ok(segmenter)
    }

    /// Share a cache with other segmenters
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ChunkCache>) -> Self {
        self.cache = Some(cache);
        self.rebuild_registry();
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self.rebuild_registry();
        self
    }

    /// Add a custom processor that runs before overlap
    #[must_use]
    pub fn with_processor(mut self, processor: Box<dyn ChunkProcessor>) -> Self {
        self.pipeline.insert_before_overlap(processor);
        self
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    fn rebuild_registry(&mut self) {
        let config = Arc::clone(&self.config);
        let cache = self.cache.clone();
        let telemetry = Arc::clone(&self.telemetry);
        self.registry = StrategyRegistry::from_config(&config, |strategy| {
            let decorators = &config.decorators;
            let mut chain = DecoratorChain::builder(strategy);
            if decorators.monitor {
                chain = chain.monitor(Arc::clone(&telemetry));
            }
            if decorators.overlap {
                chain = chain.overlap(config.overlap.clone(), config.chunking.max_chunk_size);
            }
            if let (true, Some(cache)) = (decorators.cache, cache.as_ref()) {
                chain = chain.cache(Arc::clone(cache), config.chunking.clone());
            }
            chain.build()
        });
    }

    /// Segment one file. Non-empty content always yields at least one chunk;
    /// empty content yields none.
    pub fn split(&self, request: &SegmentRequest<'_>) -> Vec<CodeChunk> {
        self.split_with_trace(request).chunks
    }

    pub fn split_with_trace(&self, request: &SegmentRequest<'_>) -> SegmentOutcome {
        let mut trace = ExecutionTrace::default();
        trace.enter(ExecutionState::Detecting);
        let detection = &request.detection;

        trace.enter(ExecutionState::Selecting);
        let input = SelectionInput::new(detection, request.content, request.file_path);
        let plan = StrategySelector::new(&self.config).select(&input);

        if request.content.is_empty() {
            trace.enter(ExecutionState::Done);
            return SegmentOutcome {
                chunks: Vec::new(),
                plan,
                trace,
            };
        }

        let owned_parse = self.auto_parse(request, &plan);
        let parse = request.parse.or(owned_parse.as_ref());
        let split_request = SplitRequest::new(request.content, &detection.language)
            .with_file_path(request.file_path)
            .with_parse(parse);

        let executor = FallbackExecutor::new(&self.registry);
        let raw = executor.run(&plan, &split_request, &mut trace);

        trace.enter(ExecutionState::PostProcessing);
        let context = ProcessingContext::new(request.content, &self.config);
        let report = self.pipeline.run(raw.clone(), &context);
        trace.processing_rounds = report.rounds;
        trace.processor_failures = report.failures;

        let chunks = if report.chunks.is_empty() {
            raw
        } else {
            report.chunks
        };
        trace.enter(ExecutionState::Done);

        log::debug!(
            "{}: {}",
            request.file_path.unwrap_or("<memory>"),
            ChunkingStats::from_chunks(&chunks)
        );
        SegmentOutcome {
            chunks,
            plan,
            trace,
        }
    }

    /// Segment and report the whole call to the telemetry sink
    pub fn split_timed(&self, request: &SegmentRequest<'_>) -> Vec<CodeChunk> {
        timed(self.telemetry.as_ref(), "segment", || Ok(self.split(request)))
            .unwrap_or_default()
    }

    /// Parse when the plan may reach the AST strategy and nobody supplied one
    fn auto_parse(&self, request: &SegmentRequest<'_>, plan: &StrategyPlan) -> Option<ParseResult> {
        if request.parse.is_some()
            || !self.config.ast.auto_parse
            || !plan.involves(StrategyName::AstStructural)
        {
            return None;
        }
        let language = Language::from_name(&request.detection.language);
        language
            .supports_ast()
            .then(|| SyntaxParser::parse(request.content, language))
    }
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter")
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
