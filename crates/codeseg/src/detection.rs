//! Input from the external language-detection collaborator.

use crate::strategy::StrategyName;
use serde::{Deserialize, Serialize};

/// What the detector found out about a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileFeatures {
    pub is_code_file: bool,
    pub is_structured_file: bool,
    pub has_functions: bool,
    pub has_classes: bool,
    pub has_imports: bool,
    pub is_test_file: bool,
}

/// Detection outcome for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub language: String,
    /// In `[0, 1]`
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_strategy_hint: Option<StrategyName>,
    #[serde(default)]
    pub content_length: usize,
    #[serde(default)]
    pub features: FileFeatures,
}

impl DetectionResult {
    pub fn new(language: impl Into<String>, confidence: f64) -> Self {
        Self {
            language: language.into(),
            confidence: confidence.clamp(0.0, 1.0),
            processing_strategy_hint: None,
            content_length: 0,
            features: FileFeatures::default(),
        }
    }

    #[must_use]
    pub const fn with_hint(mut self, hint: StrategyName) -> Self {
        self.processing_strategy_hint = Some(hint);
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: FileFeatures) -> Self {
        self.features = features;
        self
    }

    #[must_use]
    pub const fn with_content_length(mut self, length: usize) -> Self {
        self.content_length = length;
        self
    }
}
