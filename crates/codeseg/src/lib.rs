//! # codeseg
//!
//! Strategy-driven code segmentation: turns raw file text (plus optional
//! detection metadata and a syntax tree) into an ordered list of bounded,
//! typed chunks for embedding and retrieval.
//!
//! ## Architecture
//!
//! ```text
//! SegmentRequest (content, DetectionResult, ParseResult?)
//!     │
//!     ├──> StrategySelector → StrategyPlan { primary, fallback_chain }
//!     │
//!     ├──> FallbackExecutor
//!     │    ├─> cache → overlap → monitor → strategy
//!     │    ├─> Err / empty result → next entry of the chain
//!     │    └─> chain exhausted → emergency single chunk
//!     │
//!     └──> PostProcessingPipeline (up to N rounds)
//!          symbol-balance → intelligent-filter → smart-rebalance
//!          → advanced-merge → boundary-optimization → overlap
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codeseg::{ProcessingConfig, SegmentRequest, Segmenter};
//!
//! let segmenter = Segmenter::new(ProcessingConfig::default()).unwrap();
//!
//! let code = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
//! let request = SegmentRequest::for_language(code, "rust").with_file_path("src/math.rs");
//!
//! for chunk in segmenter.split(&request) {
//!     println!(
//!         "{} lines {}-{} via {}",
//!         chunk.chunk_type(),
//!         chunk.start_line(),
//!         chunk.end_line(),
//!         chunk.strategy()
//!     );
//! }
//! ```

pub mod ast;
pub mod config;
pub mod decorator;
pub mod detection;
pub mod error;
pub mod executor;
pub mod language;
pub mod overlap;
pub mod postprocess;
pub mod selector;
mod segmenter;
pub mod strategy;
pub mod text;
pub mod tracker;
pub mod type_map;
mod types;

pub use ast::{AstNode, ParseResult, SyntaxParser};
pub use config::ProcessingConfig;
pub use decorator::{ChunkCache, DecoratorChain, LogTelemetry, MemoryTelemetry, TelemetryEvent, TelemetrySink};
pub use detection::{DetectionResult, FileFeatures};
pub use error::{Result, SegmenterError};
pub use executor::{AttemptOutcome, ExecutionState, ExecutionTrace, FallbackExecutor};
pub use language::Language;
pub use postprocess::{ChunkProcessor, PostProcessingPipeline, ProcessingContext};
pub use segmenter::{SegmentOutcome, SegmentRequest, Segmenter};
pub use selector::{SelectionReason, StrategyPlan, StrategySelector};
pub use strategy::{SplitRequest, SplitStrategy, StrategyName, StrategyRegistry};
pub use type_map::StructuralType;
pub use types::{
    ChunkMetadata, ChunkType, ChunkingStats, CodeChunk, OVERLAP_LEADING, OVERLAP_TRAILING,
    UNBALANCED,
};
