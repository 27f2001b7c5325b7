//! Multi-round chunk post-processing.
//!
//! Processors run in a fixed order, overlap always last. A round is one pass
//! over every enabled processor; rounds repeat until a round leaves every
//! chunk range and the total length unchanged, or `max_processing_rounds` is
//! reached. A processor that fails, or returns an invalid list, is skipped
//! for the rest of that round and its input is kept.
//!
//! Each processor runs to its own fixed point, and a processor never hands
//! work back to one that ran before it in the round: a move or merge that
//! would wake an earlier processor up is not made. The round after a
//! productive one is therefore a no-op, and running the pipeline on its own
//! output changes nothing.

mod advanced_merge;
mod boundary;
mod filter;
mod overlap;
mod rebalance;
mod symbol_balance;

pub use advanced_merge::AdvancedMergeProcessor;
pub use boundary::BoundaryOptimizationProcessor;
pub use filter::IntelligentFilterProcessor;
pub use overlap::OverlapProcessor;
pub use rebalance::SmartRebalanceProcessor;
pub use symbol_balance::SymbolBalanceProcessor;

use crate::config::{PostProcessingConfig, ProcessingConfig};
use crate::error::{Result, SegmenterError};
use crate::text::{self, SourceLines};
use crate::types::{CodeChunk, UNBALANCED};

/// Canonical processor order
const ORDER: [&str; 6] = [
    "symbol-balance",
    "intelligent-filter",
    "smart-rebalance",
    "advanced-merge",
    "boundary-optimization",
    OverlapProcessor::NAME,
];

/// Read-only view shared by every processor of one run
#[derive(Debug, Clone)]
pub struct ProcessingContext<'a> {
    pub source: SourceLines<'a>,
    pub config: &'a ProcessingConfig,
}

impl<'a> ProcessingContext<'a> {
    pub fn new(content: &'a str, config: &'a ProcessingConfig) -> Self {
        Self {
            source: SourceLines::new(content),
            config,
        }
    }

    pub fn post(&self) -> &'a PostProcessingConfig {
        &self.config.post_processing
    }

    /// Largest chunk a processor may create by moving or merging lines
    pub fn size_limit(&self) -> usize {
        self.config
            .chunking
            .max_chunk_size
            .min(self.config.post_processing.max_chunk_size_threshold)
    }
}

/// One post-processing step
pub trait ChunkProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn should_apply(&self, chunks: &[CodeChunk], _context: &ProcessingContext<'_>) -> bool {
        !chunks.is_empty()
    }

    fn process(
        &self,
        chunks: &[CodeChunk],
        context: &ProcessingContext<'_>,
    ) -> Result<Vec<CodeChunk>>;
}

/// Result of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub chunks: Vec<CodeChunk>,
    pub rounds: usize,
    pub failures: Vec<String>,
}

/// Ordered processors plus the round limit
pub struct PostProcessingPipeline {
    processors: Vec<Box<dyn ChunkProcessor>>,
    max_rounds: usize,
}

impl PostProcessingPipeline {
    /// Canonical order, skipping disabled processors
    pub fn from_config(config: &PostProcessingConfig) -> Self {
        let mut processors: Vec<Box<dyn ChunkProcessor>> = Vec::new();
        if config.symbol_balance {
            processors.push(Box::new(SymbolBalanceProcessor));
        }
        if config.intelligent_filter {
            processors.push(Box::new(IntelligentFilterProcessor));
        }
        if config.smart_rebalance {
            processors.push(Box::new(SmartRebalanceProcessor));
        }
        if config.advanced_merge {
            processors.push(Box::new(AdvancedMergeProcessor));
        }
        if config.boundary_optimization {
            processors.push(Box::new(BoundaryOptimizationProcessor));
        }
        if config.overlap {
            processors.push(Box::new(OverlapProcessor));
        }
        Self {
            processors: if config.enabled { processors } else { Vec::new() },
            max_rounds: config.max_processing_rounds.max(1),
        }
    }

    /// Add a processor that runs before overlap (or last, if overlap is off)
    pub fn insert_before_overlap(&mut self, processor: Box<dyn ChunkProcessor>) {
        let at = self
            .processors
            .iter()
            .position(|p| p.name() == OverlapProcessor::NAME)
            .unwrap_or(self.processors.len());
        self.processors.insert(at, processor);
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn run(&self, chunks: Vec<CodeChunk>, context: &ProcessingContext<'_>) -> PipelineReport {
        let mut report = PipelineReport {
            chunks,
            ..PipelineReport::default()
        };
        if self.processors.is_empty() || report.chunks.is_empty() {
            return report;
        }

        let mut previous = signature(&report.chunks);
        for round in 1..=self.max_rounds {
            report.rounds = round;
            for processor in &self.processors {
                if !processor.should_apply(&report.chunks, context) {
                    continue;
                }
                match processor
                    .process(&report.chunks, context)
                    .and_then(|out| validate(processor.name(), out, context))
                {
                    Ok(out) => report.chunks = out,
                    Err(e) => {
                        log::warn!("Post-processing round {round}: {e}");
                        report.failures.push(processor.name().to_string());
                        break;
                    }
                }
            }

            let current = signature(&report.chunks);
            if current == previous {
                break;
            }
            previous = current;
        }

        log::debug!(
            "Post-processing finished after {} round(s), {} chunks",
            report.rounds,
            report.chunks.len()
        );
        report
    }
}

impl std::fmt::Debug for PostProcessingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostProcessingPipeline")
            .field("processors", &self.names())
            .field("max_rounds", &self.max_rounds)
            .finish()
    }
}

/// Chunk ranges and total content length. Equal ranges imply an equal
/// chunk count.
fn signature(chunks: &[CodeChunk]) -> (Vec<(usize, usize)>, usize) {
    (line_ranges(chunks), chunks.iter().map(CodeChunk::size).sum())
}

fn line_ranges(chunks: &[CodeChunk]) -> Vec<(usize, usize)> {
    chunks
        .iter()
        .map(|c| (c.start_line(), c.end_line()))
        .collect()
}

fn rank(name: &str) -> usize {
    ORDER.iter().position(|n| *n == name).unwrap_or(ORDER.len())
}

/// Enabled processors that run before `name` in a round, overlap excluded
fn upstream_of(name: &str, post: &PostProcessingConfig) -> Vec<Box<dyn ChunkProcessor>> {
    let limit = rank(name).min(rank(OverlapProcessor::NAME));
    PostProcessingPipeline::from_config(post)
        .processors
        .into_iter()
        .filter(|p| rank(p.name()) < limit)
        .collect()
}

/// No processor ahead of `name` would change a range inside `window`
fn upstream_settled(name: &str, window: &[CodeChunk], context: &ProcessingContext<'_>) -> bool {
    upstream_of(name, context.post()).iter().all(|p| {
        !p.should_apply(window, context)
            || p.process(window, context)
                .map_or(true, |out| line_ranges(&out) == line_ranges(window))
    })
}

/// Replacing `before` with `after` leaves the processors ahead of `name`
/// with nothing new to do
pub(crate) fn keeps_upstream_settled(
    name: &str,
    before: &[CodeChunk],
    after: &[CodeChunk],
    context: &ProcessingContext<'_>,
) -> bool {
    upstream_settled(name, after, context) || !upstream_settled(name, before, context)
}

/// Flag `chunk` as unbalanced exactly when its brackets do not close
pub(crate) fn settle_balance_flag(chunk: CodeChunk) -> CodeChunk {
    let open = text::bracket_delta(chunk.content()) != 0;
    if open == chunk.metadata().extensions.contains_key(UNBALANCED) {
        return chunk;
    }
    if open {
        return chunk.with_extension(UNBALANCED, true);
    }
    let (content, mut metadata) = chunk.into_parts();
    metadata.extensions.remove(UNBALANCED);
    CodeChunk::new(content, metadata)
}

/// Reject lists a processor must never produce
fn validate(
    name: &str,
    chunks: Vec<CodeChunk>,
    context: &ProcessingContext<'_>,
) -> Result<Vec<CodeChunk>> {
    if chunks.is_empty() {
        return Err(SegmenterError::processor(name, "dropped every chunk"));
    }
    let total = context.source.len();
    if let Some(bad) = chunks
        .iter()
        .find(|c| c.start_line() < 1 || c.start_line() > c.end_line() || c.end_line() > total)
    {
        return Err(SegmenterError::processor(
            name,
            format!(
                "invalid range {}-{} for {total} lines",
                bad.start_line(),
                bad.end_line()
            ),
        ));
    }
    Ok(chunks)
}

/// Lines may move between `a` and `b`: adjacent, both non-structural and
/// neither already carrying overlap
pub(crate) fn movable(a: &CodeChunk, b: &CodeChunk) -> bool {
    a.is_adjacent_to(b)
        && !a.chunk_type().is_structural()
        && !b.chunk_type().is_structural()
        && !a.has_overlap()
        && !b.has_overlap()
}

/// Move the boundary between adjacent `a` and `b` so `a` ends at `end`
pub(crate) fn shift_boundary(
    a: &CodeChunk,
    b: &CodeChunk,
    end: usize,
    source: &SourceLines<'_>,
) -> (CodeChunk, CodeChunk) {
    (
        a.with_range(source, a.start_line(), end),
        b.with_range(source, end + 1, b.end_line()),
    )
}

/// [`shift_boundary`] on `chunks[i]` and `chunks[i + 1]`, refused when it
/// would give a processor ahead of `name` new work in the neighbourhood
pub(crate) fn guarded_shift(
    name: &str,
    chunks: &[CodeChunk],
    i: usize,
    end: usize,
    context: &ProcessingContext<'_>,
) -> Option<(CodeChunk, CodeChunk)> {
    let (a, b) = shift_boundary(&chunks[i], &chunks[i + 1], end, &context.source);
    let (a, b) = (settle_balance_flag(a), settle_balance_flag(b));

    let lo = i.saturating_sub(1);
    let hi = (i + 2).min(chunks.len() - 1);
    let before = &chunks[lo..=hi];
    let mut after = before.to_vec();
    after[i - lo] = a.clone();
    after[i + 1 - lo] = b.clone();

    keeps_upstream_settled(name, before, &after, context).then_some((a, b))
}
