use crate::strategy::StrategyName;
use thiserror::Error;

/// Result type for segmentation operations
pub type Result<T> = std::result::Result<T, SegmenterError>;

/// Errors raised inside the segmentation core.
///
/// Only [`SegmenterError::InvalidConfig`], [`SegmenterError::Io`] and
/// [`SegmenterError::ConfigFormat`] ever reach a caller; everything else is
/// absorbed by the fallback chain or the post-processing pipeline.
#[derive(Error, Debug)]
pub enum SegmenterError {
    /// AST missing, or the parser reported errors
    #[error("Parse unavailable: {0}")]
    ParseUnavailable(String),

    /// The AST was fine but nothing passed the extraction thresholds
    #[error("No eligible nodes for strategy {strategy}")]
    NoEligibleNodes { strategy: StrategyName },

    /// A strategy gave up on this content
    #[error("Strategy {strategy} failed: {reason}")]
    StrategyFailed {
        strategy: StrategyName,
        reason: String,
    },

    /// Every entry of the fallback chain failed or returned nothing
    #[error("All strategies exhausted")]
    StrategyExhausted,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A post-processing step failed
    #[error("Processor {processor} failed: {reason}")]
    ProcessorFailure { processor: String, reason: String },

    /// IO error while loading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("Config format error: {0}")]
    ConfigFormat(#[from] toml::de::Error),
}

impl SegmenterError {
    /// Create a parse-unavailable error
    pub fn parse_unavailable(msg: impl Into<String>) -> Self {
        Self::ParseUnavailable(msg.into())
    }

    /// Create a strategy failure
    pub fn strategy_failed(strategy: StrategyName, reason: impl Into<String>) -> Self {
        Self::StrategyFailed {
            strategy,
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a processor failure
    pub fn processor(processor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessorFailure {
            processor: processor.into(),
            reason: reason.into(),
        }
    }
}
